//! Contracts with the chat platform.
//!
//! The gateway delivers [`MessageEvent`]s and [`CommandInvocation`]s; the bot
//! answers with [`Reply`]s and drives side effects through [`Moderator`] and
//! [`Messenger`]. Nothing in here talks to a network.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embed::Embed;

/// Permission names carried in [`CommandInvocation::permissions`].
pub mod permissions {
    pub const BAN_MEMBERS: &str = "ban_members";
    pub const KICK_MEMBERS: &str = "kick_members";
    pub const MODERATE_MEMBERS: &str = "moderate_members";
    pub const MANAGE_MESSAGES: &str = "manage_messages";
}

/// Failure of a platform-side action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("missing permissions: {0}")]
    Forbidden(String),

    #[error("target not found: {0}")]
    NotFound(String),

    #[error("platform error: {0}")]
    Platform(String),
}

/// A chat message seen by the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub community_id: Option<String>,
    pub channel_id: String,
    pub content: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Options passed with a command, by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandOptions(BTreeMap<String, serde_json::Value>);

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Whether the option was supplied with any non-null value.
    pub fn is_present(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|v| !v.is_null())
    }

    /// String option; empty strings count as absent.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Integer option, also accepting numeric strings.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A slash command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandInvocation {
    pub command: String,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub community_id: Option<String>,
    /// Owner of the community the command was issued in, if any.
    #[serde(default)]
    pub community_owner_id: Option<String>,
    pub channel_id: String,
    #[serde(default)]
    pub options: CommandOptions,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl CommandInvocation {
    pub fn is_owner(&self) -> bool {
        self.community_owner_id.as_deref() == Some(self.user_id.as_str())
    }

    /// Owner, or holder of `permission`.
    pub fn may(&self, permission: &str) -> bool {
        self.is_owner() || self.permissions.contains(permission)
    }
}

/// Response to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    /// Only visible to the invoking user.
    pub ephemeral: bool,
}

impl Reply {
    pub fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }
}

/// Moderation actions on community members.
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn ban(&self, community_id: &str, user_id: &str, reason: &str)
        -> Result<(), ActionError>;

    async fn kick(&self, community_id: &str, user_id: &str, reason: &str)
        -> Result<(), ActionError>;

    async fn timeout(
        &self,
        community_id: &str,
        user_id: &str,
        duration: Duration,
        reason: &str,
    ) -> Result<(), ActionError>;
}

/// Outbound messages not tied to a command reply.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), ActionError>;

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<(), ActionError>;
}
