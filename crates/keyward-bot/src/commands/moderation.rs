use std::time::Duration;

use super::CommandRouter;
use crate::platform::{permissions, CommandInvocation, Reply};

pub const DEFAULT_REASON: &str = "No reason provided";
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 10;
/// Platform maximum of 28 days.
pub const MAX_TIMEOUT_MINUTES: i64 = 28 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Action {
    Ban,
    Kick,
    Timeout,
}

impl Action {
    fn permission(self) -> (&'static str, &'static str) {
        match self {
            Self::Ban => (permissions::BAN_MEMBERS, "Ban Members"),
            Self::Kick => (permissions::KICK_MEMBERS, "Kick Members"),
            Self::Timeout => (permissions::MODERATE_MEMBERS, "Moderate Members"),
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Kick => "kick",
            Self::Timeout => "time out",
        }
    }
}

pub(super) async fn run(router: &CommandRouter, inv: &CommandInvocation, action: Action) -> Reply {
    let (permission, label) = action.permission();
    if !inv.may(permission) {
        return Reply::private(format!(
            "You need the {label} permission to use this command."
        ));
    }
    let Some(community) = inv.community_id.as_deref() else {
        return Reply::private("This command can only be used in a server.");
    };
    let Some(target) = inv.options.str("user") else {
        return Reply::private("Please specify a user.");
    };
    if target == inv.user_id {
        return Reply::private(format!("You cannot {} yourself.", action.verb()));
    }
    if inv.community_owner_id.as_deref() == Some(target) {
        return Reply::private(format!("You cannot {} the server owner.", action.verb()));
    }
    let reason = inv.options.str("reason").unwrap_or(DEFAULT_REASON);

    let (result, summary) = match action {
        Action::Ban => (
            router.moderator.ban(community, target, reason).await,
            format!("Banned <@{target}>"),
        ),
        Action::Kick => (
            router.moderator.kick(community, target, reason).await,
            format!("Kicked <@{target}>"),
        ),
        Action::Timeout => {
            // A supplied value that does not parse is rejected, not defaulted.
            let minutes = if inv.options.is_present("minutes") {
                inv.options.int("minutes")
            } else {
                Some(DEFAULT_TIMEOUT_MINUTES)
            };
            let Some(minutes) = minutes.filter(|m| (1..=MAX_TIMEOUT_MINUTES).contains(m)) else {
                return Reply::private(format!(
                    "Timeout must be between 1 and {MAX_TIMEOUT_MINUTES} minutes."
                ));
            };
            let duration = Duration::from_secs(minutes.unsigned_abs() * 60);
            (
                router.moderator.timeout(community, target, duration, reason).await,
                format!(
                    "Timed out <@{target}> for {minutes} minute{}",
                    if minutes == 1 { "" } else { "s" }
                ),
            )
        }
    };

    match result {
        Ok(()) => {
            tracing::info!(moderator = %inv.user_id, target, action = action.verb(), "moderation action applied");
            Reply::private(format!("{summary}. Reason: {reason}"))
        }
        Err(e) => {
            tracing::warn!(moderator = %inv.user_id, target, action = action.verb(), error = %e, "moderation action failed");
            Reply::private(format!("Failed to {} <@{target}>: {e}", action.verb()))
        }
    }
}
