use async_trait::async_trait;
use google_gmail1::api::{ListMessagesResponse, Message, Profile};
use indexmap::IndexSet;
use leaky_bucket::RateLimiter;
use lib_email_clients::gmail::api_quota::{
    BATCH_MODIFY_MAX_IDS, GMAIL_API_QUOTA, GMAIL_QUOTA_PER_SECOND,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::{sync::Arc, time::Duration};

use crate::{
    digest_config::{GmailApiConfig, RetryConfig},
    error::{AppError, AppResult},
    util::with_retry,
    HttpClient,
};

/// Gmail API error response structure
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GmailApiError {
    pub error: GmailApiErrorDetail,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GmailApiErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Outcome of a best-effort mark-read. Ids in `failed` stay unread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkReadReport {
    pub marked: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl MarkReadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Operations the digest needs from a mail provider
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Account the session is authenticated as
    async fn profile(&self) -> AppResult<Profile>;

    /// Up to `max_count` unread message ids, most recent first
    async fn list_unread(&self, max_count: u32) -> AppResult<Vec<String>>;

    /// Full record (headers and MIME body parts) of one message
    async fn fetch_message(&self, id: &str) -> AppResult<Message>;

    /// Clear the unread flag. Partial failure is reported, never raised.
    async fn mark_read(&self, ids: &[String]) -> MarkReadReport;
}

macro_rules! gmail_url {
    ($base:expr, $($params:expr),*) => {
        {
            let list_params: Vec<&str> = vec![$($params),*];
            let path = list_params.join("/");
            format!("{}/{}", $base.trim_end_matches('/'), path)
        }
    };
}

#[derive(Debug, Clone)]
pub struct EmailClient {
    http_client: HttpClient,
    access_token: String,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryConfig,
}

impl EmailClient {
    pub fn new(
        http_client: HttpClient,
        access_token: String,
        gmail: &GmailApiConfig,
        retry: RetryConfig,
    ) -> EmailClient {
        let rate_limiter = Arc::new(
            RateLimiter::builder()
                .initial(GMAIL_QUOTA_PER_SECOND)
                .interval(Duration::from_secs(1))
                .refill(GMAIL_QUOTA_PER_SECOND)
                .max(GMAIL_QUOTA_PER_SECOND)
                .build(),
        );

        EmailClient {
            http_client,
            access_token,
            base_url: gmail.base_url.clone(),
            rate_limiter,
            retry,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        quota: usize,
    ) -> AppResult<T> {
        self.rate_limiter.acquire(quota).await;
        let resp = self
            .http_client
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn batch_modify_unread(&self, ids: &[&str]) -> AppResult<()> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_batch_modify)
            .await;
        let resp = self
            .http_client
            .post(gmail_url!(self.base_url, "messages", "batchModify"))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "ids": ids,
                "removeLabelIds": ["UNREAD"],
                "addLabelIds": []
            }))
            .send()
            .await?;

        check_status(resp).await?;
        Ok(())
    }
}

/// Turn a non-success response into the matching `AppError`
async fn check_status(resp: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<GmailApiError>(&body) {
        Ok(GmailApiError { error }) => {
            tracing::debug!(
                "Gmail API returned {} ({} {}): {}",
                status,
                error.code,
                error.status.as_deref().unwrap_or("UNKNOWN"),
                error.message
            );
            error.message
        }
        Err(_) => {
            tracing::debug!("Gmail API returned {}: {}", status, body);
            body
        }
    };

    Err(AppError::from_status(status, message))
}

#[async_trait]
impl Mailbox for EmailClient {
    async fn profile(&self) -> AppResult<Profile> {
        let url = gmail_url!(self.base_url, "profile");
        let url = url.as_str();
        with_retry(&self.retry, "users.getProfile", || {
            self.get_json(url, &[], GMAIL_API_QUOTA.get_profile)
        })
        .await
    }

    async fn list_unread(&self, max_count: u32) -> AppResult<Vec<String>> {
        let url = gmail_url!(self.base_url, "messages");
        let url = url.as_str();
        let query = [
            ("q", "is:unread".to_string()),
            ("maxResults", max_count.to_string()),
        ];
        let query = &query;

        let resp: ListMessagesResponse = with_retry(&self.retry, "messages.list", || {
            self.get_json(url, query, GMAIL_API_QUOTA.messages_list)
        })
        .await?;

        let ids: Vec<String> = resp
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .take(max_count as usize)
            .collect();

        tracing::info!(
            "Listed {} unread messages (estimate {})",
            ids.len(),
            resp.result_size_estimate.unwrap_or_default()
        );

        Ok(ids)
    }

    async fn fetch_message(&self, id: &str) -> AppResult<Message> {
        let url = gmail_url!(self.base_url, "messages", id);
        let url = url.as_str();
        let query = [("format", "full".to_string())];
        let query = &query;

        with_retry(&self.retry, "messages.get", || {
            self.get_json(url, query, GMAIL_API_QUOTA.messages_get)
        })
        .await
    }

    async fn mark_read(&self, ids: &[String]) -> MarkReadReport {
        let ids: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        let mut report = MarkReadReport::default();

        for chunk in ids.chunks(BATCH_MODIFY_MAX_IDS) {
            let result = with_retry(&self.retry, "messages.batchModify", || {
                self.batch_modify_unread(chunk)
            })
            .await;

            match result {
                Ok(()) => report
                    .marked
                    .extend(chunk.iter().map(|id| id.to_string())),
                Err(e) => {
                    tracing::warn!("Could not mark {} messages as read: {}", chunk.len(), e);
                    report
                        .failed
                        .extend(chunk.iter().map(|id| (id.to_string(), e.to_string())));
                }
            }
        }

        report
    }
}
