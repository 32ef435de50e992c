use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_WEBHOOK_BASE_URL: &str = "https://techbh.app.n8n.cloud/webhook";

/// Connection-establishment and data-transfer timeouts for one webhook call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPair {
    pub connect: Duration,
    pub transfer: Duration,
}

impl TimeoutPair {
    pub const fn from_secs(connect: u64, transfer: u64) -> Self {
        Self {
            connect: Duration::from_secs(connect),
            transfer: Duration::from_secs(transfer),
        }
    }
}

/// Everything the webhook client needs to reach the remote analysis service.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub base_url: String,
    pub upload_timeouts: TimeoutPair,
    pub json_timeouts: TimeoutPair,
    /// Total attempts for the upload call, first attempt included.
    pub upload_max_attempts: u32,
    pub upload_retry_backoff: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEBHOOK_BASE_URL.to_string(),
            upload_timeouts: TimeoutPair::from_secs(30, 180),
            json_timeouts: TimeoutPair::from_secs(30, 120),
            upload_max_attempts: 3,
            upload_retry_backoff: Duration::from_secs(2),
        }
    }
}

/// Rules applied to the upload form before any webhook call is made.
#[derive(Debug, Clone)]
pub struct FormRules {
    pub min_age: u32,
    pub max_age: u32,
    pub supported_file_types: Vec<String>,
}

impl Default for FormRules {
    fn default() -> Self {
        Self {
            min_age: 5,
            max_age: 18,
            supported_file_types: vec!["jpg".into(), "jpeg".into(), "png".into()],
        }
    }
}

/// How long an untouched session is kept, and how often the store is swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub idle_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable is optional; defaults match the hosted workflow.
#[derive(Debug, Clone)]
pub struct Config {
    pub webhook: WebhookConfig,
    pub form: FormRules,
    pub sessions: SessionConfig,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let webhook_defaults = WebhookConfig::default();
        let form_defaults = FormRules::default();

        let webhook = WebhookConfig {
            base_url: std::env::var("WEBHOOK_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(webhook_defaults.base_url),
            upload_timeouts: TimeoutPair::from_secs(
                env_or("UPLOAD_CONNECT_TIMEOUT_SECS", 30)?,
                env_or("UPLOAD_TRANSFER_TIMEOUT_SECS", 180)?,
            ),
            json_timeouts: TimeoutPair::from_secs(
                env_or("JSON_CONNECT_TIMEOUT_SECS", 30)?,
                env_or("JSON_TRANSFER_TIMEOUT_SECS", 120)?,
            ),
            upload_max_attempts: env_or("UPLOAD_MAX_ATTEMPTS", webhook_defaults.upload_max_attempts)?
                .max(1),
            upload_retry_backoff: Duration::from_secs(env_or("UPLOAD_RETRY_BACKOFF_SECS", 2)?),
        };

        let form = FormRules {
            min_age: env_or("MIN_AGE", form_defaults.min_age)?,
            max_age: env_or("MAX_AGE", form_defaults.max_age)?,
            supported_file_types: match std::env::var("SUPPORTED_FILE_TYPES") {
                Ok(raw) => parse_extensions(&raw),
                Err(_) => form_defaults.supported_file_types,
            },
        };

        if form.min_age > form.max_age {
            anyhow::bail!(
                "MIN_AGE ({}) must not exceed MAX_AGE ({})",
                form.min_age,
                form.max_age
            );
        }

        let session_defaults = SessionConfig::default();
        let sessions = SessionConfig {
            idle_ttl: Duration::from_secs(env_or(
                "SESSION_IDLE_TTL_SECS",
                session_defaults.idle_ttl.as_secs(),
            )?),
            sweep_interval: Duration::from_secs(env_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                session_defaults.sweep_interval.as_secs(),
            )?),
        };
        if sessions.idle_ttl.is_zero() || sessions.sweep_interval.is_zero() {
            anyhow::bail!("SESSION_IDLE_TTL_SECS and SESSION_SWEEP_INTERVAL_SECS must be positive");
        }

        Ok(Config {
            webhook,
            form,
            sessions,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
