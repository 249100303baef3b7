//! Test doubles shared by the module tests: an in-memory mailbox, a scripted
//! completion provider, gmail record builders and a throwaway HTTP server.

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::Mutex,
};

use async_trait::async_trait;
use axum::Router;
use google_gmail1::api::{Message, MessagePart, MessagePartBody, MessagePartHeader, Profile};
use tokio::net::TcpListener;

use crate::{
    digest_config::DigestConfig,
    email::client::{Mailbox, MarkReadReport},
    error::{AppError, AppResult},
    prompt::{CompletionProvider, CompletionRequest},
};

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Serve `router` on a random local port until `shutdown` is called
pub async fn spawn_router(router: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    TestServer { addr, shutdown_tx }
}

/// Built-in defaults with a dummy key and instant retries
pub fn test_config() -> DigestConfig {
    let mut cfg = DigestConfig::build(
        std::path::Path::new("/nonexistent-digest-root"),
        Some("sk-test".to_string()),
    )
    .unwrap();
    cfg.retry.base_delay_ms = 1;
    cfg
}

pub fn header(name: &str, value: &str) -> MessagePartHeader {
    MessagePartHeader {
        name: Some(name.to_string()),
        value: Some(value.to_string()),
    }
}

pub fn leaf(mime_type: &str, content: &str) -> MessagePart {
    MessagePart {
        mime_type: Some(mime_type.to_string()),
        body: Some(MessagePartBody {
            data: Some(content.as_bytes().to_vec()),
            size: Some(content.len() as i32),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn multipart(mime_type: &str, parts: Vec<MessagePart>) -> MessagePart {
    MessagePart {
        mime_type: Some(mime_type.to_string()),
        parts: Some(parts),
        ..Default::default()
    }
}

/// A format=full gmail record with From/Subject/Date headers on the root part
pub fn gmail_message(id: &str, from: &str, subject: &str, mut payload: MessagePart) -> Message {
    payload.headers = Some(vec![
        header("From", from),
        header("Subject", subject),
        header("Date", "Tue, 1 Oct 2024 09:00:00 +0000"),
    ]);
    Message {
        id: Some(id.to_string()),
        thread_id: Some(format!("thread-{id}")),
        label_ids: Some(vec!["INBOX".to_string(), "UNREAD".to_string()]),
        payload: Some(payload),
        ..Default::default()
    }
}

pub fn plain_message(id: &str, from: &str, subject: &str, body: &str) -> Message {
    gmail_message(id, from, subject, leaf("text/plain", body))
}

/// In-memory mailbox. Ids listed in `missing` are listed but cannot be fetched.
/// Fetching `auth_fail_on` fails as if the token was revoked mid-run.
#[derive(Default)]
pub struct FakeMailbox {
    pub messages: Vec<Message>,
    pub missing: HashSet<String>,
    pub auth_fail_on: Option<String>,
    pub fail_listing: bool,
    pub fail_mark_read: bool,
    pub unread: Mutex<HashSet<String>>,
    pub mark_read_calls: Mutex<Vec<Vec<String>>>,
}

impl FakeMailbox {
    pub fn new(messages: Vec<Message>) -> Self {
        let unread = messages.iter().filter_map(|m| m.id.clone()).collect();
        Self {
            messages,
            unread: Mutex::new(unread),
            ..Default::default()
        }
    }

    pub fn mark_read_calls(&self) -> Vec<Vec<String>> {
        self.mark_read_calls.lock().unwrap().clone()
    }

    pub fn is_unread(&self, id: &str) -> bool {
        self.unread.lock().unwrap().contains(id)
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn profile(&self) -> AppResult<Profile> {
        Ok(Profile {
            email_address: Some("me@example.com".to_string()),
            ..Default::default()
        })
    }

    async fn list_unread(&self, max_count: u32) -> AppResult<Vec<String>> {
        if self.fail_listing {
            return Err(AppError::Transient("mailbox unavailable".to_string()));
        }
        let unread = self.unread.lock().unwrap();
        Ok(self
            .messages
            .iter()
            .filter_map(|m| m.id.clone())
            .filter(|id| unread.contains(id) || self.missing.contains(id))
            .take(max_count as usize)
            .collect())
    }

    async fn fetch_message(&self, id: &str) -> AppResult<Message> {
        if self.auth_fail_on.as_deref() == Some(id) {
            return Err(AppError::Auth("Token has been expired or revoked.".to_string()));
        }
        if self.missing.contains(id) {
            return Err(AppError::NotFound(id.to_string()));
        }
        self.messages
            .iter()
            .find(|m| m.id.as_deref() == Some(id))
            .cloned()
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    async fn mark_read(&self, ids: &[String]) -> MarkReadReport {
        self.mark_read_calls.lock().unwrap().push(ids.to_vec());
        if self.fail_mark_read {
            return MarkReadReport {
                marked: vec![],
                failed: ids.iter().map(|id| (id.clone(), "boom".to_string())).collect(),
            };
        }
        let mut unread = self.unread.lock().unwrap();
        for id in ids {
            unread.remove(id);
        }
        MarkReadReport {
            marked: ids.to_vec(),
            failed: vec![],
        }
    }
}

#[derive(Clone)]
enum Scripted {
    Answer(String),
    Fail,
    Reject,
}

/// Completion provider answering from a script. Requests whose prompt
/// contains a scripted key get that answer, everything else gets `default`.
pub struct ScriptedLlm {
    by_needle: HashMap<String, Scripted>,
    default: String,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(default: &str) -> Self {
        Self {
            by_needle: HashMap::new(),
            default: default.to_string(),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn answer_when(mut self, needle: &str, answer: &str) -> Self {
        self.by_needle
            .insert(needle.to_string(), Scripted::Answer(answer.to_string()));
        self
    }

    /// Transient provider error for matching prompts
    pub fn fail_when(mut self, needle: &str) -> Self {
        self.by_needle.insert(needle.to_string(), Scripted::Fail);
        self
    }

    /// Rejected credentials for matching prompts; `""` matches every prompt
    pub fn reject_when(mut self, needle: &str) -> Self {
        self.by_needle.insert(needle.to_string(), Scripted::Reject);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = self
            .by_needle
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, scripted)| scripted.clone());

        match scripted {
            Some(Scripted::Answer(answer)) => Ok(answer),
            Some(Scripted::Fail) => Err(AppError::Transient("model overloaded".to_string())),
            Some(Scripted::Reject) => Err(AppError::Auth("invalid x-api-key".to_string())),
            None => Ok(self.default.clone()),
        }
    }
}
