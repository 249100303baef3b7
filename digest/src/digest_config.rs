use config::{Config, FileFormat};
use serde::Deserialize;
use std::{
    env, fmt,
    path::{Path, PathBuf},
};
use url::Url;

use crate::error::{AppError, AppResult};

const DEFAULT_CONFIG: &str = include_str!("../../config/config.toml");
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub const CREDENTIALS_FILE: &str = "credentials.json";
pub const TOKEN_FILE: &str = "token.json";
pub const CONFIG_FILE: &str = "config.toml";

/// Google OAuth client secrets, as downloaded from the cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct GmailConfig {
    pub client_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub auth_uri: Option<String>,
    pub token_uri: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    #[serde(alias = "web")]
    installed: GmailConfig,
}

impl GmailConfig {
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let file: ClientSecretFile = Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| {
                AppError::Auth(format!(
                    "Could not read client secrets at {}: {e}",
                    path.display()
                ))
            })?
            .try_deserialize()?;

        Ok(file.installed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub max_messages: u32,
    pub mark_read: bool,
    pub classify_excerpt_chars: usize,
    pub summary_excerpt_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailApiConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptLimits {
    pub rate_limit_per_sec: usize,
    pub refill_interval_ms: usize,
    pub refill_amount: usize,
}

#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: String,
    #[serde(default)]
    pub key: String,
    pub prompt_limits: PromptLimits,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .field("key", &"<redacted>")
            .field("prompt_limits", &self.prompt_limits)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub temperature: f64,
    pub classify_max_tokens: u32,
    pub summary_max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    pub settings: Settings,
    pub gmail: GmailApiConfig,
    pub api: ApiConfig,
    pub model: ModelConfig,
    pub retry: RetryConfig,
}

impl DigestConfig {
    /// Layered load: built-in defaults, then `<root>/config.toml`, then
    /// `DIGEST__SECTION__KEY` environment variables.
    /// The model API key comes from `ANTHROPIC_API_KEY` unless the config sets `api.key`.
    pub fn load(root: &Path) -> AppResult<Self> {
        Self::build(root, env::var(API_KEY_ENV).ok())
    }

    pub fn build(root: &Path, api_key: Option<String>) -> AppResult<Self> {
        let mut cfg: DigestConfig = Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(config::File::from(root.join(CONFIG_FILE)).required(false))
            .add_source(
                config::Environment::with_prefix("DIGEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if cfg.api.key.is_empty() {
            cfg.api.key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{API_KEY_ENV} is required")))?;
        }

        if cfg.settings.max_messages == 0 {
            return Err(AppError::Config(
                "settings.max_messages must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("gmail.base_url", &cfg.gmail.base_url),
            ("api.base_url", &cfg.api.base_url),
        ] {
            Url::parse(value)
                .map_err(|e| AppError::Config(format!("{name} is not a valid URL: {e}")))?;
        }

        Ok(cfg)
    }
}

impl fmt::Display for DigestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Digest Config:\n{:?}\n\nGmail: {:?}\n\nAPI: {:?}\n\nModel: {:?}\n\nRetry: {:?}",
            self.settings, self.gmail, self.api, self.model, self.retry,
        )
    }
}

/// Directory holding credentials.json, token.json and config.toml
pub fn app_dir() -> PathBuf {
    env::var("APP_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
