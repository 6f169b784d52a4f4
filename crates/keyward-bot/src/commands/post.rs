use super::CommandRouter;
use crate::embed::Embed;
use crate::platform::{permissions, CommandInvocation, Reply};

pub(super) async fn embed(router: &CommandRouter, inv: &CommandInvocation) -> Reply {
    if !inv.may(permissions::MANAGE_MESSAGES) {
        return Reply::private("You need the Manage Messages permission to use this command.");
    }

    let opts = &inv.options;
    let embed = match Embed::build(
        opts.str("title").unwrap_or_default(),
        opts.str("description").unwrap_or_default(),
        opts.str("color"),
        opts.str("template"),
    ) {
        Ok(embed) => embed,
        Err(e) => return Reply::private(format!("Invalid embed: {e}")),
    };
    let channel = opts.str("channel").unwrap_or(&inv.channel_id);

    match router.messenger.send_embed(channel, &embed).await {
        Ok(()) => {
            tracing::info!(user_id = %inv.user_id, channel, title = %embed.title, "embed posted");
            Reply::private("Embed posted.")
        }
        Err(e) => {
            tracing::warn!(user_id = %inv.user_id, channel, error = %e, "embed post failed");
            Reply::private(format!("Failed to post embed: {e}"))
        }
    }
}
