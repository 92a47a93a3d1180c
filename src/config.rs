//! # Configuration Module
//!
//! Environment-driven configuration for the bot, plus the recovery settings
//! used when Telegram asks us to slow down.

use std::env;
use std::path::PathBuf;

use reqwest::Url;
use secrecy::SecretString;
use tracing::info;

use crate::errors::ConfigError;

// Constants for runtime configuration
pub const DEFAULT_PORT: u16 = 10000;
pub const BOT_TOKEN_VARS: [&str; 2] = ["BOT_TOKEN", "TELEGRAM_BOT_TOKEN"];
pub const SHEET_ID_VAR: &str = "SHEET_ID";
pub const CREDS_FILE_VAR: &str = "CREDS_FILE";
pub const WEBHOOK_URL_VAR: &str = "WEBHOOK_URL";
pub const WEBHOOK_SECRET_VAR: &str = "WEBHOOK_SECRET";
pub const PORT_VAR: &str = "PORT";
pub const HEALTH_CHECK_VAR: &str = "HEALTH_CHECK";
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

/// Recovery configuration for flood-control handling
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts after a `RetryAfter` response
    pub max_retries: u32,
    /// Upper bound of the random jitter added to each wait, in milliseconds
    pub jitter_ms: u64,
    /// Waits longer than this are not honoured; the error is returned instead
    pub max_wait_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            jitter_ms: 250,
            max_wait_secs: 30,
        }
    }
}

/// How updates reach the bot. Exactly one is active per deployment.
#[derive(Debug)]
pub enum Transport {
    Polling {
        /// Port for the liveness endpoint, if enabled
        health_port: Option<u16>,
    },
    Webhook {
        url: Url,
        port: u16,
        secret: Option<SecretString>,
    },
}

/// Runtime configuration assembled from the environment
#[derive(Debug)]
pub struct Config {
    pub bot_token: SecretString,
    pub sheet_id: String,
    pub creds_file: PathBuf,
    pub transport: Transport,
    pub recovery: RecoveryConfig,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values count as missing. The credentials file must exist on disk.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bot_token = BOT_TOKEN_VARS
            .iter()
            .find_map(|key| get(*key))
            .ok_or_else(|| ConfigError::MissingEnvVar(BOT_TOKEN_VARS[0].to_string()))?;
        let sheet_id =
            get(SHEET_ID_VAR).ok_or_else(|| ConfigError::MissingEnvVar(SHEET_ID_VAR.to_string()))?;
        let creds_file = get(CREDS_FILE_VAR)
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(CREDS_FILE_VAR.to_string()))?;

        if !creds_file.is_file() {
            return Err(ConfigError::CredentialsFileMissing(creds_file));
        }

        let port = match get(PORT_VAR) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: PORT_VAR.to_string(),
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let transport = match get(WEBHOOK_URL_VAR) {
            Some(raw) => {
                let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                    key: WEBHOOK_URL_VAR.to_string(),
                    message: e.to_string(),
                })?;
                Transport::Webhook {
                    url,
                    port,
                    secret: get(WEBHOOK_SECRET_VAR).map(SecretString::from),
                }
            }
            None => {
                let health_enabled = get(HEALTH_CHECK_VAR)
                    .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false);
                Transport::Polling {
                    health_port: health_enabled.then_some(port),
                }
            }
        };

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            sheet_id,
            creds_file,
            transport,
            recovery: RecoveryConfig::default(),
        })
    }
}

/// Log which variables are present without revealing secret values
pub fn log_environment_summary() {
    let present = |key: &str| env::var(key).map(|v| !v.is_empty()).unwrap_or(false);
    let token_set = BOT_TOKEN_VARS.iter().any(|key| present(*key));
    let creds_exists = env::var(CREDS_FILE_VAR)
        .map(|path| PathBuf::from(path).is_file())
        .unwrap_or(false);

    info!(
        token = if token_set { "set" } else { "missing" },
        sheet_id = %env::var(SHEET_ID_VAR).unwrap_or_else(|_| "missing".to_string()),
        creds_file = if creds_exists { "exists" } else { "missing" },
        webhook_url = %env::var(WEBHOOK_URL_VAR).unwrap_or_else(|_| "unset (polling)".to_string()),
        "Environment check"
    );
}
