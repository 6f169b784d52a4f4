//! Substring-triggered auto-responses.
//!
//! ```yaml
//! responders:
//!   - trigger: "how do i get the key"
//!     response: "Use /get-key once you have sent enough messages."
//! ```

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Responder {
    pub trigger: String,
    pub response: String,
}

#[derive(Debug, Deserialize)]
struct ResponderFile {
    #[serde(default)]
    responders: Vec<Responder>,
}

/// Ordered trigger list; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct AutoResponder {
    rules: Vec<(String, String)>,
}

impl AutoResponder {
    pub fn new(responders: impl IntoIterator<Item = Responder>) -> Self {
        let rules = responders
            .into_iter()
            .filter(|r| !r.trigger.trim().is_empty())
            .map(|r| (r.trigger.to_lowercase(), r.response))
            .collect();
        Self { rules }
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let file: ResponderFile =
            serde_yaml::from_str(text).context("failed to parse auto-responder YAML")?;
        Ok(Self::new(file.responders))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read auto-responders from {}", path.display()))?;
        let responder = Self::from_yaml(&text)?;
        tracing::info!(rules = responder.len(), path = %path.display(), "loaded auto-responders");
        Ok(responder)
    }

    /// Response for the first trigger contained in `content`, ignoring case.
    pub fn respond(&self, content: &str) -> Option<&str> {
        let haystack = content.to_lowercase();
        self.rules
            .iter()
            .find(|(trigger, _)| haystack.contains(trigger.as_str()))
            .map(|(_, response)| response.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
