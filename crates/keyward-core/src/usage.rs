//! Command usage counters.
//!
//! Observability only: nothing here feeds the eligibility decision.
//!
//! Layout of the `usage-stats` document:
//!
//! ```text
//! {"users": {"<user id>": {"username": "...",
//!                          "commands": {"get-key": {"count": 3, "lastUsed": "<rfc3339>"}}}}}
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{load_document, save_document, DocumentStore};

/// Document holding all usage counters.
pub const USAGE_DOCUMENT: &str = "usage-stats";

/// Counter for one (user, command) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandUsage {
    pub count: u64,
    #[serde(rename = "lastUsed")]
    pub last_used_at: DateTime<Utc>,
}

/// All counters for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsage {
    pub username: String,
    #[serde(default)]
    pub commands: BTreeMap<String, CommandUsage>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsageDocument {
    #[serde(default)]
    users: BTreeMap<String, UserUsage>,
}

/// Per-user, per-command invocation counters.
pub struct UsageTracker {
    store: Arc<dyn DocumentStore>,
    users: Mutex<BTreeMap<String, UserUsage>>,
}

impl UsageTracker {
    pub fn open(store: Arc<dyn DocumentStore>) -> Self {
        let users = load_document::<UsageDocument>(store.as_ref(), USAGE_DOCUMENT)
            .unwrap_or_default()
            .users;
        Self {
            store,
            users: Mutex::new(users),
        }
    }

    /// Count one invocation of `command` by `user_id`.
    pub fn track(
        &self,
        user_id: &str,
        username: &str,
        command: &str,
        now: DateTime<Utc>,
    ) -> CommandUsage {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let user = users
            .entry(user_id.to_string())
            .or_insert_with(|| UserUsage {
                username: username.to_string(),
                commands: BTreeMap::new(),
            });
        user.username = username.to_string();

        let usage = user
            .commands
            .entry(command.to_string())
            .or_insert(CommandUsage {
                count: 0,
                last_used_at: now,
            });
        usage.count = usage.count.saturating_add(1);
        usage.last_used_at = now;
        let snapshot = usage.clone();

        self.persist(&users);
        snapshot
    }

    pub fn get(&self, user_id: &str) -> Option<UserUsage> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    /// All users with their counters, ordered by user id.
    pub fn snapshot(&self) -> Vec<(String, UserUsage)> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, usage)| (id.clone(), usage.clone()))
            .collect()
    }

    pub fn close(&self) -> bool {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        self.persist(&users)
    }

    fn persist(&self, users: &BTreeMap<String, UserUsage>) -> bool {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            users: &'a BTreeMap<String, UserUsage>,
        }
        save_document(self.store.as_ref(), USAGE_DOCUMENT, &Borrowed { users })
    }
}
