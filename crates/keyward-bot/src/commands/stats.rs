use chrono::{DateTime, Utc};
use keyward_core::{Denial, Eligibility, UserUsage};

use super::CommandRouter;
use crate::platform::{CommandInvocation, Reply};

/// Platform cap on message length.
pub const MAX_REPLY_LEN: usize = 2000;

const USAGE_HEADER: &str = "# Command Usage Statistics\n```\n";
const USAGE_FOOTER: &str = "```";
const TRUNCATED: &str = "...\n";

pub(super) fn usage_stats(router: &CommandRouter, inv: &CommandInvocation) -> Reply {
    if !inv.is_owner() {
        return Reply::private("Only the server owner can view usage statistics.");
    }
    let users = router.usage.snapshot();
    if users.is_empty() {
        return Reply::private("No usage statistics available yet.");
    }
    Reply::private(format_usage_table(&users))
}

/// Render the usage table, dropping trailing rows once the reply would
/// exceed [`MAX_REPLY_LEN`].
pub fn format_usage_table(users: &[(String, UserUsage)]) -> String {
    let mut table = String::from("USER | COMMAND | COUNT | LAST USED\n---- | ------- | ----- | ---------\n");
    let budget = MAX_REPLY_LEN - USAGE_HEADER.len() - USAGE_FOOTER.len() - TRUNCATED.len();

    'rows: for (_, user) in users {
        for (command, usage) in &user.commands {
            let row = format!(
                "{} | /{} | {} | {}\n",
                user.username,
                command,
                usage.count,
                usage.last_used_at.format("%Y-%m-%d %H:%M UTC")
            );
            if table.len() + row.len() > budget {
                table.push_str(TRUNCATED);
                break 'rows;
            }
            table.push_str(&row);
        }
    }

    format!("{USAGE_HEADER}{table}{USAGE_FOOTER}")
}

pub(super) fn verify_me(router: &CommandRouter, inv: &CommandInvocation, now: DateTime<Utc>) -> Reply {
    let newly = router
        .engagement
        .mark_verified(&inv.user_id, &inv.username, now);
    let lead = if newly {
        "You are now verified."
    } else {
        "You are already verified."
    };

    match router.disclosure.eligibility(&inv.user_id) {
        Eligibility::Eligible { .. } => Reply::private(format!("{lead} You can use /get-key.")),
        Eligibility::Denied { progress, .. } => Reply::private(format!(
            "{lead} Send {} more message{} to unlock /get-key.",
            progress.remaining_events(),
            if progress.remaining_events() == 1 { "" } else { "s" }
        )),
    }
}

pub(super) fn my_stats(router: &CommandRouter, inv: &CommandInvocation) -> Reply {
    let eligibility = router.disclosure.eligibility(&inv.user_id);
    let progress = eligibility.progress();

    let mut lines = vec![format!("Messages: {}", progress.qualifying_events)];
    if progress.required_events > 0 {
        lines[0].push_str(&format!(" / {} required", progress.required_events));
    }
    lines.push(format!(
        "Verified: {}",
        if progress.verified { "yes" } else { "no" }
    ));
    lines.push(match eligibility.denial() {
        None => "Key access: yes".to_string(),
        Some(Denial::NotVerified) => "Key access: no (run /verify-me)".to_string(),
        Some(Denial::InsufficientEngagement { deficit }) => {
            format!(
                "Key access: no ({deficit} more message{} needed)",
                if deficit == 1 { "" } else { "s" }
            )
        }
    });

    Reply::private(lines.join("\n"))
}
