//! Embeds posted through the `/embed` command.

use serde::{Deserialize, Serialize};

/// Platform limits on embed text.
pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 4096;

const DEFAULT_COLOR: u32 = 0x5865F2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

/// Preset styles for embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedTemplate {
    Announcement,
    Rules,
    Info,
}

impl EmbedTemplate {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "announcement" => Some(Self::Announcement),
            "rules" => Some(Self::Rules),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    pub fn color(&self) -> u32 {
        match self {
            Self::Announcement => 0xF1C40F,
            Self::Rules => 0xE74C3C,
            Self::Info => 0x3498DB,
        }
    }

    pub fn footer(&self) -> &'static str {
        match self {
            Self::Announcement => "Announcement",
            Self::Rules => "Please follow the rules",
            Self::Info => "Info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmbedError {
    #[error("title must be 1-256 characters")]
    Title,
    #[error("description must be 1-4096 characters")]
    Description,
    #[error("invalid color {0:?}, expected hex like #ff8800")]
    Color(String),
    #[error("unknown template {0:?}, expected announcement, rules or info")]
    Template(String),
}

/// Accepts `#rrggbb`, `0xrrggbb` or `rrggbb`.
pub fn parse_color(input: &str) -> Result<u32, EmbedError> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .unwrap_or(trimmed);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EmbedError::Color(input.to_string()));
    }
    u32::from_str_radix(hex, 16).map_err(|_| EmbedError::Color(input.to_string()))
}

impl Embed {
    /// Build an embed; an explicit color wins over the template's.
    pub fn build(
        title: &str,
        description: &str,
        color: Option<&str>,
        template: Option<&str>,
    ) -> Result<Self, EmbedError> {
        let title_len = title.chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(EmbedError::Title);
        }
        let desc_len = description.chars().count();
        if desc_len == 0 || desc_len > MAX_DESCRIPTION_LEN {
            return Err(EmbedError::Description);
        }

        let template = template
            .map(|name| {
                EmbedTemplate::parse(name).ok_or_else(|| EmbedError::Template(name.to_string()))
            })
            .transpose()?;
        let color = match color {
            Some(c) => parse_color(c)?,
            None => template.map(|t| t.color()).unwrap_or(DEFAULT_COLOR),
        };

        Ok(Self {
            title: title.to_string(),
            // Chat clients send "\n" literally through slash command options.
            description: description.replace("\\n", "\n"),
            color,
            footer: template.map(|t| t.footer().to_string()),
        })
    }
}
