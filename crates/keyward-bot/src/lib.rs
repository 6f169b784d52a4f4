//! Chat bot and HTTP surface for Keyward.
//!
//! The chat platform itself (gateway connection, moderation calls, message
//! rendering) sits behind the traits in [`platform`]. This crate turns
//! platform events into calls on `keyward-core` and formats the replies.
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `DISCORD_BOT_TOKEN` | Bot credential (required) |
//! | `CLIENT_ID` | Application identifier (required) |
//! | `PORT` | HTTP port (default: 3000) |
//! | `KEYWARD_API_KEY` | Static credential for `GET /api/key` |
//! | `KEYWARD_KEY_LENGTH` | Key length (default: 27) |
//! | `KEYWARD_KEY_TTL` | Key lifetime (default: `12h`) |
//! | `KEYWARD_MIN_MESSAGES` | Messages needed before `/get-key` works (default: 0) |
//! | `KEYWARD_REQUIRE_VERIFICATION` | Require `/verify-me` before `/get-key` |
//! | `KEYWARD_SPAM_WINDOW` | Anti-spam window (default: `5s`) |
//! | `KEYWARD_SPAM_THRESHOLD` | Messages per window that trigger a timeout (0 = off) |
//! | `KEYWARD_SPAM_TIMEOUT` | Timeout applied to spammers (default: `5m`) |
//! | `KEYWARD_DATA_DIR` | State directory (default: `.`) |
//! | `KEYWARD_STORE` | `json` or `sqlite` (default: `json`) |
//! | `KEYWARD_RESPONDERS` | YAML file with auto-responses |
//! | `KEYWARD_LOG_FORMAT` | `text` or `json` (default: `text`) |

pub mod app;
pub mod commands;
pub mod config;
pub mod embed;
pub mod gateway;
pub mod http;
pub mod logging;
pub mod platform;
pub mod responder;

pub use app::Services;
pub use commands::{CommandRouter, MessageOutcome};
pub use config::{BotConfig, Cli, ConfigError};
pub use platform::{ActionError, CommandInvocation, Messenger, MessageEvent, Moderator, Reply};
