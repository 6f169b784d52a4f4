use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use keyward_core::{EligibilityConfig, KeyStoreConfig, SpamConfig};

/// Longest key we are willing to generate.
pub const MAX_KEY_LENGTH: usize = 256;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "keyward",
    version,
    about = "Chat bot that hands a rotating key to engaged community members"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the slash command registration payload as JSON
    Commands,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Bot credential
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Application identifier
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// HTTP port
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Static credential for the HTTP key endpoint
    #[arg(long, env = "KEYWARD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "KEYWARD_KEY_LENGTH", default_value_t = keyward_core::DEFAULT_KEY_LENGTH)]
    pub key_length: usize,

    #[arg(long, env = "KEYWARD_KEY_TTL", default_value = "12h", value_parser = humantime::parse_duration)]
    pub key_ttl: Duration,

    /// Messages a user must send before /get-key works
    #[arg(long, env = "KEYWARD_MIN_MESSAGES", default_value_t = 0)]
    pub min_messages: u64,

    /// Require /verify-me before /get-key works
    #[arg(long, env = "KEYWARD_REQUIRE_VERIFICATION")]
    pub require_verification: bool,

    #[arg(long, env = "KEYWARD_SPAM_WINDOW", default_value = "5s", value_parser = humantime::parse_duration)]
    pub spam_window: Duration,

    /// Messages per window that trigger a timeout (0 disables)
    #[arg(long, env = "KEYWARD_SPAM_THRESHOLD", default_value_t = 0)]
    pub spam_threshold: usize,

    #[arg(long, env = "KEYWARD_SPAM_TIMEOUT", default_value = "5m", value_parser = humantime::parse_duration)]
    pub spam_timeout: Duration,

    /// Directory for state documents
    #[arg(long, env = "KEYWARD_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    #[arg(long, env = "KEYWARD_STORE", value_enum, default_value_t = StoreKind::Json)]
    pub store: StoreKind,

    /// YAML file with auto-responses
    #[arg(long, env = "KEYWARD_RESPONDERS")]
    pub responders: Option<PathBuf>,

    #[arg(long, env = "KEYWARD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// One JSON file per document
    Json,
    /// Single SQLite database
    Sqlite,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Configuration errors. All are fatal at startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} environment variable is not set")]
    Missing { var: &'static str },

    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Validated bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub client_id: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub keys: KeyStoreConfig,
    pub eligibility: EligibilityConfig,
    pub spam: SpamConfig,
    pub data_dir: PathBuf,
    pub store: StoreKind,
    pub responders: Option<PathBuf>,
}

impl BotConfig {
    pub fn from_args(args: RunArgs) -> Result<Self, ConfigError> {
        let token = required(args.token, "DISCORD_BOT_TOKEN")?;
        let client_id = required(args.client_id, "CLIENT_ID")?;

        if args.key_length == 0 || args.key_length > MAX_KEY_LENGTH {
            return Err(ConfigError::Invalid {
                field: "key length",
                message: format!("must be between 1 and {MAX_KEY_LENGTH}, got {}", args.key_length),
            });
        }
        if args.key_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                field: "key ttl",
                message: "must be greater than zero".to_string(),
            });
        }
        if args.spam_threshold > 0 && args.spam_window.is_zero() {
            return Err(ConfigError::Invalid {
                field: "spam window",
                message: "must be greater than zero when the spam threshold is set".to_string(),
            });
        }

        Ok(Self {
            token,
            client_id,
            port: args.port,
            api_key: args.api_key.filter(|k| !k.is_empty()),
            keys: KeyStoreConfig {
                key_length: args.key_length,
                ttl: args.key_ttl,
            },
            eligibility: EligibilityConfig {
                require_verification: args.require_verification,
                minimum_qualifying_events: args.min_messages,
            },
            spam: SpamConfig {
                window: args.spam_window,
                threshold: args.spam_threshold,
                timeout: args.spam_timeout,
            },
            data_dir: args.data_dir,
            store: args.store,
            responders: args.responders,
        })
    }
}

fn required(value: Option<String>, var: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing { var })
}
