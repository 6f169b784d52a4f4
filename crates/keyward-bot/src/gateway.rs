//! Line-delimited JSON gateway.
//!
//! Drives the bot without a chat SDK. Each stdin line is one event:
//!
//! ```text
//! {"type":"message","user_id":"1","display_name":"ana","channel_id":"c","content":"hi"}
//! {"type":"command","command":"get-key","user_id":"1","username":"ana","channel_id":"c"}
//! ```
//!
//! Every event produces exactly one output line (`message` or `reply`);
//! platform side effects requested by the bot are written as `moderation`,
//! `send_message` and `send_embed` lines. Malformed input is logged and
//! skipped.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::{CommandRouter, MessageOutcome};
use crate::embed::Embed;
use crate::platform::{ActionError, CommandInvocation, MessageEvent, Messenger, Moderator, Reply};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GatewayEvent {
    Message(MessageEvent),
    Command(CommandInvocation),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputLine<'a> {
    Message {
        user_id: &'a str,
        #[serde(flatten)]
        outcome: MessageOutcome,
    },
    Reply {
        command: &'a str,
        user_id: &'a str,
        #[serde(flatten)]
        reply: &'a Reply,
    },
    Moderation {
        action: &'a str,
        community_id: &'a str,
        user_id: &'a str,
        reason: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u64>,
    },
    SendMessage {
        channel_id: &'a str,
        content: &'a str,
    },
    SendEmbed {
        channel_id: &'a str,
        embed: &'a Embed,
    },
}

/// Serialized JSON-line sink shared by the gateway and its actions.
pub struct ConsoleOutput {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleOutput {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn emit(&self, line: &OutputLine<'_>) -> io::Result<()> {
        let json = serde_json::to_string(line).map_err(io::Error::other)?;
        let mut out = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{json}")?;
        out.flush()
    }

    fn emit_logged(&self, line: &OutputLine<'_>) {
        if let Err(e) = self.emit(line) {
            tracing::warn!(error = %e, "failed to write gateway output");
        }
    }
}

/// Platform actions for console mode: logged and echoed as output lines.
pub struct ConsoleActions {
    output: Arc<ConsoleOutput>,
}

impl ConsoleActions {
    pub fn new(output: Arc<ConsoleOutput>) -> Self {
        Self { output }
    }

    fn moderation(
        &self,
        action: &str,
        community_id: &str,
        user_id: &str,
        reason: &str,
        duration: Option<Duration>,
    ) -> Result<(), ActionError> {
        tracing::info!(action, community_id, user_id, reason, "moderation action");
        self.output
            .emit(&OutputLine::Moderation {
                action,
                community_id,
                user_id,
                reason,
                duration_secs: duration.map(|d| d.as_secs()),
            })
            .map_err(|e| ActionError::Platform(e.to_string()))
    }
}

#[async_trait]
impl Moderator for ConsoleActions {
    async fn ban(&self, community_id: &str, user_id: &str, reason: &str) -> Result<(), ActionError> {
        self.moderation("ban", community_id, user_id, reason, None)
    }

    async fn kick(&self, community_id: &str, user_id: &str, reason: &str) -> Result<(), ActionError> {
        self.moderation("kick", community_id, user_id, reason, None)
    }

    async fn timeout(
        &self,
        community_id: &str,
        user_id: &str,
        duration: Duration,
        reason: &str,
    ) -> Result<(), ActionError> {
        self.moderation("timeout", community_id, user_id, reason, Some(duration))
    }
}

#[async_trait]
impl Messenger for ConsoleActions {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), ActionError> {
        self.output
            .emit(&OutputLine::SendMessage {
                channel_id,
                content,
            })
            .map_err(|e| ActionError::Platform(e.to_string()))
    }

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<(), ActionError> {
        self.output
            .emit(&OutputLine::SendEmbed { channel_id, embed })
            .map_err(|e| ActionError::Platform(e.to_string()))
    }
}

/// Consume events from `input` until EOF.
pub async fn run<R>(router: Arc<CommandRouter>, input: R, output: Arc<ConsoleOutput>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0u64;

    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read gateway input")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<GatewayEvent>(line) {
            Ok(GatewayEvent::Message(event)) => {
                let outcome = router.handle_message(&event).await;
                output.emit_logged(&OutputLine::Message {
                    user_id: &event.user_id,
                    outcome,
                });
            }
            Ok(GatewayEvent::Command(inv)) => {
                let reply = router.handle_command(&inv, Utc::now()).await;
                output.emit_logged(&OutputLine::Reply {
                    command: &inv.command,
                    user_id: &inv.user_id,
                    reply: &reply,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed gateway line");
                continue;
            }
        }
        handled += 1;
    }

    tracing::info!(events = handled, "gateway input closed");
    Ok(())
}
