//! Whole-document persistence.
//!
//! Every piece of durable state (current key, usage counters, engagement)
//! is one named document that is read in full and rewritten in full. The
//! backends differ only in where those bytes live:
//!
//! | Backend | Layout |
//! |---------|--------|
//! | [`JsonDirStore`] | `<dir>/<name>.json`, atomic rename on write |
//! | [`SqliteStore`] | `documents(name, body, updated_at)` table |
//! | [`MemoryStore`] | process memory, for tests |
//!
//! Callers that must not fail on persistence problems go through
//! [`load_document`] and [`save_document`], which log and swallow.

mod json_dir;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document name outside `[a-z0-9_-]`.
    #[error("invalid document name: {name:?}")]
    InvalidName { name: String },

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// Document could not be encoded.
    #[error("encode error for {name}: {message}")]
    Encode { name: String, message: String },
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A named-document store with whole-document read/rewrite semantics.
pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` when it does not exist.
    fn read(&self, name: &str) -> StoreResult<Option<String>>;

    /// Replace a document with `body`.
    fn write(&self, name: &str, body: &str) -> StoreResult<()>;

    /// Short human-readable location, used in logs.
    fn describe(&self) -> String;
}

pub(crate) fn validate_name(name: &str) -> StoreResult<()> {
    let ok = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Load and decode a document, treating every failure as "absent".
///
/// Missing, empty, unreadable and malformed documents all yield `None`; the
/// last three are logged.
pub fn load_document<T: DeserializeOwned>(store: &dyn DocumentStore, name: &str) -> Option<T> {
    let body = match store.read(name) {
        Ok(Some(body)) => body,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(document = name, store = %store.describe(), error = %e, "failed to read document");
            return None;
        }
    };

    if body.trim().is_empty() {
        tracing::warn!(document = name, "document is empty, treating as absent");
        return None;
    }

    match serde_json::from_str(&body) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(document = name, error = %e, "malformed document, treating as absent");
            None
        }
    }
}

/// Encode and write a document. Returns whether the write succeeded.
pub fn save_document<T: Serialize>(store: &dyn DocumentStore, name: &str, value: &T) -> bool {
    let result = serde_json::to_string_pretty(value)
        .map_err(|e| StoreError::Encode {
            name: name.to_string(),
            message: e.to_string(),
        })
        .and_then(|body| store.write(name, &body));

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(document = name, store = %store.describe(), error = %e, "failed to persist document");
            false
        }
    }
}
