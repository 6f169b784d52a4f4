use chrono::{DateTime, Utc};
use keyward_core::{Denial, InteractiveDisclosure, ResetOutcome};

use super::CommandRouter;
use crate::platform::{CommandInvocation, Reply};

pub(super) fn get_key(router: &CommandRouter, inv: &CommandInvocation, now: DateTime<Utc>) -> Reply {
    match router.disclosure.request_interactive(&inv.user_id, now) {
        InteractiveDisclosure::Granted { key, remaining } => Reply::private(format!(
            "Current key: `{key}`\nExpires in: {}h {}m",
            remaining.hours, remaining.minutes
        )),
        InteractiveDisclosure::Denied {
            reason: Denial::NotVerified,
            ..
        } => Reply::private("You need to verify first. Run /verify-me, then try again."),
        InteractiveDisclosure::Denied {
            reason: Denial::InsufficientEngagement { deficit },
            progress,
        } => Reply::private(format!(
            "You need {deficit} more message{} to get the key ({}/{}).",
            if deficit == 1 { "" } else { "s" },
            progress.qualifying_events,
            progress.required_events
        )),
    }
}

pub(super) fn reset_key(router: &CommandRouter, inv: &CommandInvocation, now: DateTime<Utc>) -> Reply {
    match router
        .disclosure
        .reset(&inv.user_id, inv.community_owner_id.as_deref(), now)
    {
        ResetOutcome::NotOwner => Reply::private("Only the server owner can reset the key."),
        ResetOutcome::Reset(record) => {
            tracing::info!(user_id = %inv.user_id, expires_at = %record.expires_at(), "key reset by owner");
            Reply::private(format!("Key has been reset. New key: `{}`", record.value()))
        }
    }
}
