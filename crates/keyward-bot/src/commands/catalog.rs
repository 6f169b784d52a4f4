//! Slash command definitions, in the shape the platform expects at
//! registration time.

use serde_json::{json, Value};

use super::{BAN, EMBED, GET_KEY, KICK, MY_STATS, RESET_KEY, TIMEOUT, USAGE_STATS, VERIFY_ME};

/// Option value types, numbered as the platform numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String = 3,
    Integer = 4,
    User = 6,
    Channel = 7,
}

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub options: &'static [OptionSpec],
}

const fn opt(
    name: &'static str,
    description: &'static str,
    kind: OptionKind,
    required: bool,
) -> OptionSpec {
    OptionSpec {
        name,
        description,
        kind,
        required,
    }
}

const TARGET: OptionSpec = opt("user", "Member to act on", OptionKind::User, true);
const REASON: OptionSpec = opt("reason", "Reason for the audit log", OptionKind::String, false);

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: GET_KEY,
        description: "Get the current key",
        options: &[],
    },
    CommandSpec {
        name: RESET_KEY,
        description: "Generate a new key (server owner only)",
        options: &[],
    },
    CommandSpec {
        name: USAGE_STATS,
        description: "Show command usage statistics (server owner only)",
        options: &[],
    },
    CommandSpec {
        name: VERIFY_ME,
        description: "Verify yourself to unlock the key",
        options: &[],
    },
    CommandSpec {
        name: MY_STATS,
        description: "Show your message count and key access",
        options: &[],
    },
    CommandSpec {
        name: BAN,
        description: "Ban a member",
        options: &[TARGET, REASON],
    },
    CommandSpec {
        name: KICK,
        description: "Kick a member",
        options: &[TARGET, REASON],
    },
    CommandSpec {
        name: TIMEOUT,
        description: "Time out a member",
        options: &[
            TARGET,
            opt("minutes", "Duration in minutes (default 10)", OptionKind::Integer, false),
            REASON,
        ],
    },
    CommandSpec {
        name: EMBED,
        description: "Post an embed",
        options: &[
            opt("title", "Embed title", OptionKind::String, true),
            opt("description", "Embed body; \\n starts a new line", OptionKind::String, true),
            opt("color", "Hex color such as #ff8800", OptionKind::String, false),
            opt("template", "announcement, rules or info", OptionKind::String, false),
            opt("channel", "Channel to post in", OptionKind::Channel, false),
        ],
    },
];

/// JSON array suitable for bulk command registration.
pub fn registration_payload() -> Value {
    Value::Array(
        COMMANDS
            .iter()
            .map(|cmd| {
                let options: Vec<Value> = cmd
                    .options
                    .iter()
                    .map(|o| {
                        json!({
                            "name": o.name,
                            "description": o.description,
                            "type": o.kind as u8,
                            "required": o.required,
                        })
                    })
                    .collect();
                json!({
                    "name": cmd.name,
                    "description": cmd.description,
                    "type": 1,
                    "options": options,
                })
            })
            .collect(),
    )
}
