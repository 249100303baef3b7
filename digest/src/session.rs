use std::path::Path;

use crate::{
    auth::get_access_token,
    digest_config::{DigestConfig, TOKEN_FILE},
    email::client::{EmailClient, Mailbox},
    error::{AppError, AppResult},
    pipeline::{run_digest, DigestReport},
    prompt::AnthropicClient,
    HttpClient,
};

/// Everything one digest run needs, built once at startup and passed down
pub struct Session {
    pub config: DigestConfig,
    pub email_address: String,
    email_client: EmailClient,
    llm: AnthropicClient,
}

impl Session {
    /// Load (and refresh if needed) the cached token, build both clients and
    /// verify the token against the Gmail profile endpoint.
    pub async fn connect(
        config: DigestConfig,
        http_client: HttpClient,
        root: &Path,
    ) -> AppResult<Session> {
        let access_token = get_access_token(&http_client, root, &root.join(TOKEN_FILE)).await?;

        let email_client = EmailClient::new(
            http_client.clone(),
            access_token,
            &config.gmail,
            config.retry.clone(),
        );

        let profile = email_client.profile().await.map_err(|e| match e {
            AppError::Auth(msg) => AppError::Auth(format!("Gmail rejected the access token: {msg}")),
            other => other,
        })?;
        let email_address = profile.email_address.unwrap_or_default();
        tracing::info!("Connected to: {}", email_address);

        let llm = AnthropicClient::new(
            http_client,
            &config.api,
            &config.model,
            config.retry.clone(),
        );

        Ok(Session {
            config,
            email_address,
            email_client,
            llm,
        })
    }

    pub async fn run(&self) -> AppResult<DigestReport> {
        run_digest(&self.email_client, &self.llm, &self.config).await
    }
}
