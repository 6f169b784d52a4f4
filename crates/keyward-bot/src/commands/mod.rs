//! Command and message handling.
//!
//! [`CommandRouter`] is the single entry point for platform events. Every
//! command invocation is counted in the usage tracker before dispatch; every
//! non-bot message passes the spam guard, then counts toward engagement and
//! may trigger an auto-response.

mod catalog;
mod key;
mod moderation;
mod post;
mod stats;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use keyward_core::{Disclosure, EngagementTracker, SpamGuard, SpamVerdict, UsageTracker};
use serde::Serialize;

use crate::app::Services;
use crate::platform::{CommandInvocation, MessageEvent, Messenger, Moderator, Reply};
use crate::responder::AutoResponder;

pub use catalog::{registration_payload, CommandSpec, OptionKind, OptionSpec, COMMANDS};

pub const GET_KEY: &str = "get-key";
pub const RESET_KEY: &str = "reset-key";
pub const USAGE_STATS: &str = "usage-stats";
pub const VERIFY_ME: &str = "verify-me";
pub const MY_STATS: &str = "my-stats";
pub const BAN: &str = "ban";
pub const KICK: &str = "kick";
pub const TIMEOUT: &str = "timeout";
pub const EMBED: &str = "embed";

/// Reason given to the moderator when the spam guard fires.
pub const SPAM_TIMEOUT_REASON: &str = "Automatic timeout: sending messages too quickly";

/// What happened to an incoming chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// Sent by a bot; not counted.
    Ignored,
    /// Tripped the spam guard; not counted.
    Throttled,
    /// Counted toward engagement.
    Counted { total: u64, responded: bool },
}

pub struct CommandRouter {
    disclosure: Arc<Disclosure>,
    engagement: Arc<EngagementTracker>,
    usage: Arc<UsageTracker>,
    spam: Arc<SpamGuard>,
    responder: AutoResponder,
    moderator: Arc<dyn Moderator>,
    messenger: Arc<dyn Messenger>,
}

impl CommandRouter {
    pub fn new(
        services: &Services,
        responder: AutoResponder,
        moderator: Arc<dyn Moderator>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            disclosure: services.disclosure.clone(),
            engagement: services.engagement.clone(),
            usage: services.usage.clone(),
            spam: services.spam.clone(),
            responder,
            moderator,
            messenger,
        }
    }

    /// Track and dispatch one command invocation.
    pub async fn handle_command(&self, inv: &CommandInvocation, now: DateTime<Utc>) -> Reply {
        self.usage
            .track(&inv.user_id, &inv.username, &inv.command, now);
        tracing::debug!(command = %inv.command, user_id = %inv.user_id, "command received");

        match inv.command.as_str() {
            GET_KEY => key::get_key(self, inv, now),
            RESET_KEY => key::reset_key(self, inv, now),
            USAGE_STATS => stats::usage_stats(self, inv),
            VERIFY_ME => stats::verify_me(self, inv, now),
            MY_STATS => stats::my_stats(self, inv),
            BAN => moderation::run(self, inv, moderation::Action::Ban).await,
            KICK => moderation::run(self, inv, moderation::Action::Kick).await,
            TIMEOUT => moderation::run(self, inv, moderation::Action::Timeout).await,
            EMBED => post::embed(self, inv).await,
            other => {
                tracing::debug!(command = other, "unknown command");
                Reply::private("Unknown command.")
            }
        }
    }

    /// Count a chat message, applying the spam guard and auto-responses.
    pub async fn handle_message(&self, event: &MessageEvent) -> MessageOutcome {
        if event.is_bot {
            return MessageOutcome::Ignored;
        }

        if let SpamVerdict::Flagged { timeout, .. } = self.spam.check(&event.user_id, event.timestamp)
        {
            match event.community_id.as_deref() {
                Some(community) => {
                    if let Err(e) = self
                        .moderator
                        .timeout(community, &event.user_id, timeout, SPAM_TIMEOUT_REASON)
                        .await
                    {
                        tracing::warn!(user_id = %event.user_id, error = %e, "spam timeout failed");
                    }
                }
                None => tracing::debug!(user_id = %event.user_id, "spam outside a community, not timed out"),
            }
            return MessageOutcome::Throttled;
        }

        let engagement = self.engagement.record_qualifying_event(
            &event.user_id,
            &event.display_name,
            event.timestamp,
        );

        let mut responded = false;
        if let Some(response) = self.responder.respond(&event.content) {
            match self.messenger.send_message(&event.channel_id, response).await {
                Ok(()) => responded = true,
                Err(e) => {
                    tracing::warn!(channel_id = %event.channel_id, error = %e, "auto-response failed")
                }
            }
        }

        MessageOutcome::Counted {
            total: engagement.qualifying_event_count,
            responded,
        }
    }
}
