//! Messenger configuration structures.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::scheduler::SchedulerSettings;
use crate::core::MessengerError;
use crate::infra::sender::messagebird::MESSAGEBIRD_API_BASE;
use crate::infra::sender::twilio::TWILIO_API_BASE;

const fn default_tick_period_ms() -> u64 {
    1_000
}

const fn default_shutdown_grace_ms() -> u64 {
    5_000
}

const fn default_error_sink_capacity() -> usize {
    256
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_twilio_api_base() -> String {
    TWILIO_API_BASE.to_string()
}

fn default_messagebird_api_base() -> String {
    MESSAGEBIRD_API_BASE.to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Buffer backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BufferBackendConfig {
    /// In-memory buffer for development/testing.
    #[default]
    InMemory,
    /// SQLite database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Wait for a competing writer before failing, in milliseconds.
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

/// Delivery provider selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SenderConfig {
    /// Log deliveries without contacting a provider.
    #[default]
    Log,
    /// Twilio Messages API.
    Twilio {
        /// Account SID.
        account_sid: String,
        /// Auth token.
        auth_token: String,
        /// API host.
        #[serde(default = "default_twilio_api_base")]
        api_base: String,
    },
    /// MessageBird Messages API.
    MessageBird {
        /// Access key.
        access_key: String,
        /// API host.
        #[serde(default = "default_messagebird_api_base")]
        api_base: String,
    },
}

/// Root messenger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessengerConfig {
    /// Delay between scheduler ticks in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    /// Maximum wait for the scheduler to stop, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Error events buffered before the oldest is dropped.
    #[serde(default = "default_error_sink_capacity")]
    pub error_sink_capacity: usize,
    /// Buffer backend.
    #[serde(default)]
    pub buffer: BufferBackendConfig,
    /// Delivery provider.
    #[serde(default)]
    pub sender: SenderConfig,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            error_sink_capacity: default_error_sink_capacity(),
            buffer: BufferBackendConfig::default(),
            sender: SenderConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), MessengerError> {
    if value.trim().is_empty() {
        return Err(MessengerError::Config(format!("{field} must not be empty")));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, MessengerError> {
    raw.trim()
        .parse()
        .map_err(|_| MessengerError::Config(format!("{key} must be a number, got `{raw}`")))
}

impl MessengerConfig {
    /// Validate timing, capacity, and backend values.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), MessengerError> {
        if self.tick_period_ms == 0 {
            return Err(MessengerError::Config(
                "tick_period_ms must be greater than 0".into(),
            ));
        }
        if self.shutdown_grace_ms == 0 {
            return Err(MessengerError::Config(
                "shutdown_grace_ms must be greater than 0".into(),
            ));
        }
        if self.error_sink_capacity == 0 {
            return Err(MessengerError::Config(
                "error_sink_capacity must be greater than 0".into(),
            ));
        }

        if let BufferBackendConfig::Sqlite { path, .. } = &self.buffer {
            if path.as_os_str().is_empty() {
                return Err(MessengerError::Config("sqlite path must not be empty".into()));
            }
        }

        match &self.sender {
            SenderConfig::Log => {}
            SenderConfig::Twilio {
                account_sid,
                auth_token,
                api_base,
            } => {
                require("twilio account_sid", account_sid)?;
                require("twilio auth_token", auth_token)?;
                require("twilio api_base", api_base)?;
            }
            SenderConfig::MessageBird {
                access_key,
                api_base,
            } => {
                require("messagebird access_key", access_key)?;
                require("messagebird api_base", api_base)?;
            }
        }
        Ok(())
    }

    /// Parse messenger configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Config`] on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, MessengerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| MessengerError::Config(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `MESSENGER_*` environment variables, reading a
    /// `.env` file first if one exists. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Config`] on unparsable or invalid values.
    pub fn from_env() -> Result<Self, MessengerError> {
        // A missing .env file is the normal case in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup using the
    /// `MESSENGER_*` variable names.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Config`] on unparsable or invalid values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MessengerError> {
        let mut cfg = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = var("MESSENGER_TICK_PERIOD_MS") {
            cfg.tick_period_ms = parse_number("MESSENGER_TICK_PERIOD_MS", &raw)?;
        }
        if let Some(raw) = var("MESSENGER_SHUTDOWN_GRACE_MS") {
            cfg.shutdown_grace_ms = parse_number("MESSENGER_SHUTDOWN_GRACE_MS", &raw)?;
        }
        if let Some(raw) = var("MESSENGER_ERROR_SINK_CAPACITY") {
            cfg.error_sink_capacity = parse_number("MESSENGER_ERROR_SINK_CAPACITY", &raw)?;
        }
        if let Some(raw) = var("MESSENGER_LOG_FORMAT") {
            cfg.log_format = match raw.trim().to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(MessengerError::Config(format!(
                        "MESSENGER_LOG_FORMAT must be `text` or `json`, got `{other}`"
                    )))
                }
            };
        }

        cfg.buffer = match var("MESSENGER_BUFFER").as_deref().map(str::trim) {
            None | Some("in_memory") => BufferBackendConfig::InMemory,
            Some("sqlite") => BufferBackendConfig::Sqlite {
                path: PathBuf::from(var("MESSENGER_SQLITE_PATH").unwrap_or_default()),
                busy_timeout_ms: match var("MESSENGER_SQLITE_BUSY_TIMEOUT_MS") {
                    Some(raw) => parse_number("MESSENGER_SQLITE_BUSY_TIMEOUT_MS", &raw)?,
                    None => default_busy_timeout_ms(),
                },
            },
            Some(other) => {
                return Err(MessengerError::Config(format!(
                    "MESSENGER_BUFFER must be `in_memory` or `sqlite`, got `{other}`"
                )))
            }
        };

        cfg.sender = match var("MESSENGER_SENDER").as_deref().map(str::trim) {
            None | Some("log") => SenderConfig::Log,
            Some("twilio") => SenderConfig::Twilio {
                account_sid: var("MESSENGER_TWILIO_ACCOUNT_SID").unwrap_or_default(),
                auth_token: var("MESSENGER_TWILIO_AUTH_TOKEN").unwrap_or_default(),
                api_base: var("MESSENGER_TWILIO_API_BASE")
                    .unwrap_or_else(default_twilio_api_base),
            },
            Some("message_bird") => SenderConfig::MessageBird {
                access_key: var("MESSENGER_MESSAGEBIRD_ACCESS_KEY").unwrap_or_default(),
                api_base: var("MESSENGER_MESSAGEBIRD_API_BASE")
                    .unwrap_or_else(default_messagebird_api_base),
            },
            Some(other) => {
                return Err(MessengerError::Config(format!(
                    "MESSENGER_SENDER must be `log`, `twilio` or `message_bird`, got `{other}`"
                )))
            }
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Scheduler timing derived from this configuration.
    pub const fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            tick_period: Duration::from_millis(self.tick_period_ms),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        }
    }
}
