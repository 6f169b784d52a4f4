//! Per-user engagement tracking.
//!
//! Counts qualifying events (chat messages) and holds the sticky
//! self-verification flag. Records are never deleted and counts never go
//! down. The whole map is rewritten to the `engagement` document on every
//! change.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{load_document, save_document, DocumentStore};

/// Document holding all engagement records.
pub const ENGAGEMENT_DOCUMENT: &str = "engagement";

/// Engagement state of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEngagement {
    /// Last observed display name. Not an identity key.
    pub display_name: String,

    pub qualifying_event_count: u64,

    /// Once true, stays true.
    #[serde(default)]
    pub verified: bool,

    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl UserEngagement {
    fn new(display_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            display_name: display_name.to_string(),
            qualifying_event_count: 0,
            verified: false,
            first_seen_at: now,
            last_seen_at: now,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EngagementDocument {
    #[serde(default)]
    users: BTreeMap<String, UserEngagement>,
}

/// Owner of all [`UserEngagement`] records.
pub struct EngagementTracker {
    store: Arc<dyn DocumentStore>,
    users: Mutex<BTreeMap<String, UserEngagement>>,
}

impl EngagementTracker {
    /// Open the tracker, starting empty if the document is missing or bad.
    pub fn open(store: Arc<dyn DocumentStore>) -> Self {
        let users = load_document::<EngagementDocument>(store.as_ref(), ENGAGEMENT_DOCUMENT)
            .unwrap_or_default()
            .users;
        tracing::debug!(users = users.len(), "loaded engagement records");
        Self {
            store,
            users: Mutex::new(users),
        }
    }

    /// Count one qualifying event for `user_id`.
    pub fn record_qualifying_event(
        &self,
        user_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> UserEngagement {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = users
            .entry(user_id.to_string())
            .or_insert_with(|| UserEngagement::new(display_name, now));
        entry.qualifying_event_count = entry.qualifying_event_count.saturating_add(1);
        entry.display_name = display_name.to_string();
        entry.last_seen_at = now;
        let snapshot = entry.clone();

        self.persist(&users);
        snapshot
    }

    /// Set the verified flag. Returns `true` if it was not already set.
    pub fn mark_verified(&self, user_id: &str, display_name: &str, now: DateTime<Utc>) -> bool {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = users
            .entry(user_id.to_string())
            .or_insert_with(|| UserEngagement::new(display_name, now));
        if entry.verified {
            return false;
        }
        entry.verified = true;
        entry.display_name = display_name.to_string();

        self.persist(&users);
        tracing::info!(user_id, "user verified");
        true
    }

    pub fn get(&self, user_id: &str) -> Option<UserEngagement> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    /// Number of tracked users.
    pub fn len(&self) -> usize {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush all records. Returns whether the write succeeded.
    pub fn close(&self) -> bool {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        self.persist(&users)
    }

    fn persist(&self, users: &BTreeMap<String, UserEngagement>) -> bool {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            users: &'a BTreeMap<String, UserEngagement>,
        }
        save_document(self.store.as_ref(), ENGAGEMENT_DOCUMENT, &Borrowed { users })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_first_event_creates_record() {
        let tracker = EngagementTracker::open(Arc::new(MemoryStore::new()));
        let rec = tracker.record_qualifying_event("42", "alice", t0());

        assert_eq!(rec.qualifying_event_count, 1);
        assert!(!rec.verified);
        assert_eq!(rec.first_seen_at, t0());
        assert_eq!(rec.last_seen_at, t0());
    }

    #[test]
    fn test_every_event_counts() {
        let tracker = EngagementTracker::open(Arc::new(MemoryStore::new()));
        for i in 0..25 {
            tracker.record_qualifying_event("42", "alice", t0() + TimeDelta::seconds(i));
        }
        let rec = tracker.get("42").unwrap();
        assert_eq!(rec.qualifying_event_count, 25);
        assert_eq!(rec.first_seen_at, t0());
        assert_eq!(rec.last_seen_at, t0() + TimeDelta::seconds(24));
    }

    #[test]
    fn test_display_name_follows_latest_event() {
        let tracker = EngagementTracker::open(Arc::new(MemoryStore::new()));
        tracker.record_qualifying_event("42", "alice", t0());
        tracker.record_qualifying_event("42", "alice_renamed", t0());
        assert_eq!(tracker.get("42").unwrap().display_name, "alice_renamed");
    }

    #[test]
    fn test_mark_verified_is_sticky_and_idempotent() {
        let tracker = EngagementTracker::open(Arc::new(MemoryStore::new()));
        assert!(tracker.mark_verified("7", "bob", t0()));
        assert!(!tracker.mark_verified("7", "bob", t0()));

        tracker.record_qualifying_event("7", "bob", t0());
        let rec = tracker.get("7").unwrap();
        assert!(rec.verified);
        assert_eq!(rec.qualifying_event_count, 1);
    }

    #[test]
    fn test_mark_verified_keeps_count() {
        let tracker = EngagementTracker::open(Arc::new(MemoryStore::new()));
        for _ in 0..3 {
            tracker.record_qualifying_event("7", "bob", t0());
        }
        tracker.mark_verified("7", "bob", t0());
        assert_eq!(tracker.get("7").unwrap().qualifying_event_count, 3);
    }

    #[test]
    fn test_unknown_user_is_absent() {
        let tracker = EngagementTracker::open(Arc::new(MemoryStore::new()));
        assert!(tracker.get("nobody").is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_reopen_restores_records() {
        let docs = Arc::new(MemoryStore::new());
        {
            let tracker = EngagementTracker::open(docs.clone());
            tracker.record_qualifying_event("1", "a", t0());
            tracker.record_qualifying_event("1", "a", t0());
            tracker.mark_verified("2", "b", t0());
        }

        let tracker = EngagementTracker::open(docs);
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.get("1").unwrap().qualifying_event_count, 2);
        assert!(tracker.get("2").unwrap().verified);
    }

    #[test]
    fn test_corrupt_document_starts_empty() {
        let docs = Arc::new(MemoryStore::new());
        docs.write(ENGAGEMENT_DOCUMENT, "not json").unwrap();
        let tracker = EngagementTracker::open(docs);
        assert!(tracker.is_empty());
    }
}
