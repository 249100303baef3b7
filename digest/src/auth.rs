//! OAuth2 access for Gmail.
//!
//! The consent flow happens out of band; this module only reads the cached
//! user token, refreshes it when it is about to expire and writes it back.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::{
    digest_config::{GmailConfig, CREDENTIALS_FILE},
    error::{AppError, AppResult},
    HttpClient,
};

const EXPIRY_MARGIN_SECS: i64 = 30;

/// Cached user token, compatible with the `token.json` written by Google's
/// installed-app helpers. Unknown keys are preserved on write-back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenCache {
    pub fn load(path: &Path) -> AppResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            AppError::Auth(format!(
                "Could not read token cache at {}: {e}. Authorize the app first.",
                path.display()
            ))
        })?;

        serde_json::from_str(&json)
            .map_err(|e| AppError::Auth(format!("Token cache is not valid JSON: {e}")))
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// A token without a known expiry is treated as expired
    pub fn needs_refresh(&self) -> bool {
        match (&self.token, self.expiry) {
            (Some(token), Some(expiry)) if !token.is_empty() => check_expired(expiry),
            _ => true,
        }
    }

    fn apply_refresh(&mut self, resp: &RefreshTokenResponse) {
        self.token = Some(resp.access_token.clone());
        self.expiry = Some(Utc::now() + Duration::seconds(resp.expires_in as i64));
    }

    /// Client credentials embedded in the cache, when all three are present
    fn embedded_client(&self) -> Option<GmailConfig> {
        Some(GmailConfig {
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            token_uri: self.token_uri.clone()?,
            project_id: None,
            auth_uri: None,
            redirect_uris: vec![],
        })
    }
}

pub fn check_expired(expires_at: DateTime<Utc>) -> bool {
    let now_with_margin = Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS);
    now_with_margin > expires_at
}

pub async fn exchange_refresh_token(
    http_client: &HttpClient,
    gmail_config: &GmailConfig,
    refresh_token: &str,
) -> AppResult<RefreshTokenResponse> {
    let GmailConfig {
        token_uri,
        client_id,
        client_secret,
        ..
    } = gmail_config;

    let resp = http_client
        .post(token_uri)
        .form(&[
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Error refreshing token: {:?}", e);
            AppError::from(e)
        })?;

    let status = resp.status();
    let resp = resp.json::<serde_json::Value>().await.map_err(|e| {
        tracing::error!("Unexpected token response ({status}): {:?}", e);
        AppError::Transient(e.to_string())
    })?;

    if resp.get("error").is_some() {
        return match resp.get("error_description").and_then(|d| d.as_str()) {
            Some("Token has been expired or revoked.") => Err(AppError::Auth(
                "Refresh token has been expired or revoked, authorize the app again".to_string(),
            )),
            Some(desc) => {
                tracing::error!("Unexpected error refreshing token: {:?}", desc);
                Err(AppError::Auth(desc.to_string()))
            }
            None => {
                tracing::error!("Unknown error refreshing token: {:?}", resp);
                Err(AppError::Auth(resp.to_string()))
            }
        };
    }

    if status.is_server_error() {
        return Err(AppError::Transient(format!("Token endpoint returned {status}")));
    }

    serde_json::from_value::<RefreshTokenResponse>(resp.clone()).map_err(|_| {
        tracing::error!("Unexpected gmail oauth2 response: {:?}", resp);
        AppError::Auth("Malformed token refresh response".to_string())
    })
}

/// Return a valid access token, refreshing and persisting the cache if needed
pub async fn get_access_token(
    http_client: &HttpClient,
    root: &Path,
    token_path: &Path,
) -> AppResult<String> {
    let mut cache = TokenCache::load(token_path)?;

    if !cache.needs_refresh() {
        if let Some(token) = cache.token {
            tracing::debug!("Using cached access token");
            return Ok(token);
        }
    }

    let refresh_token = cache
        .refresh_token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Auth("Access token expired and no refresh token is cached".to_string())
        })?;

    let gmail_config = match cache.embedded_client() {
        Some(client) => client,
        None => GmailConfig::from_file(&root.join(CREDENTIALS_FILE))?,
    };

    tracing::info!("Refreshing Gmail access token");
    let resp = exchange_refresh_token(http_client, &gmail_config, &refresh_token).await?;
    cache.apply_refresh(&resp);

    if let Err(e) = cache.save(token_path) {
        // The run can continue with the in-memory token
        tracing::warn!("Could not persist refreshed token: {}", e);
    }

    Ok(resp.access_token)
}
