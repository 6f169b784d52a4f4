//! The current key and its rotation.
//!
//! The store is a two-state machine: no record loaded, or one current
//! record. Reads go through [`KeyStore::current_or_rotate`], which replaces
//! an expired record before returning it. There is no background timer, so
//! a key nobody asks for stays on disk past its nominal expiry; the next
//! read rotates it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::secret::{SecretGenerator, DEFAULT_KEY_LENGTH};
use crate::storage::{load_document, save_document, DocumentStore};

/// Default key lifetime (12 hours).
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Document holding the current key.
pub const KEY_DOCUMENT: &str = "global-key";

/// Prefix of documents archiving replaced keys.
pub const KEY_ARCHIVE_PREFIX: &str = "key-log-";

/// Key store settings.
#[derive(Debug, Clone, Copy)]
pub struct KeyStoreConfig {
    pub key_length: usize,
    pub ttl: Duration,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            key_length: DEFAULT_KEY_LENGTH,
            ttl: DEFAULT_KEY_TTL,
        }
    }
}

/// One issued key. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    value: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SecretRecord {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before expiry, floored at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.expires_at - now).max(TimeDelta::zero())
    }
}

/// On-disk layout: `{"key": "...", "issuedAt": ms, "expiresAt": ms}`.
///
/// `issuedAt` is optional so snapshots written without it still load.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredKey {
    key: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    issued_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expires_at: DateTime<Utc>,
}

impl From<&SecretRecord> for StoredKey {
    fn from(record: &SecretRecord) -> Self {
        Self {
            key: record.value.clone(),
            issued_at: Some(record.issued_at),
            expires_at: record.expires_at,
        }
    }
}

/// Owner of the current key.
pub struct KeyStore {
    store: Arc<dyn DocumentStore>,
    generator: SecretGenerator,
    ttl: TimeDelta,
    current: Mutex<Option<SecretRecord>>,
}

impl KeyStore {
    /// Open the key store, loading the last snapshot if it is usable.
    ///
    /// A missing, unreadable or structurally invalid snapshot leaves the
    /// store empty; the first read then generates a key.
    pub fn open(store: Arc<dyn DocumentStore>, config: KeyStoreConfig) -> Self {
        let ttl = TimeDelta::from_std(config.ttl).unwrap_or(TimeDelta::MAX);
        let current = load_document::<StoredKey>(store.as_ref(), KEY_DOCUMENT)
            .and_then(|stored| Self::validate(stored, ttl));

        match &current {
            Some(record) => tracing::info!(
                expires_at = %record.expires_at,
                store = %store.describe(),
                "loaded key snapshot"
            ),
            None => tracing::info!(store = %store.describe(), "no usable key snapshot"),
        }

        Self {
            store,
            generator: SecretGenerator::new(config.key_length),
            ttl,
            current: Mutex::new(current),
        }
    }

    fn validate(stored: StoredKey, ttl: TimeDelta) -> Option<SecretRecord> {
        if stored.key.is_empty() {
            tracing::warn!("key snapshot has an empty key, discarding");
            return None;
        }
        let issued_at = stored.issued_at.unwrap_or_else(|| {
            stored
                .expires_at
                .checked_sub_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        });
        if stored.expires_at < issued_at {
            tracing::warn!("key snapshot expires before it was issued, discarding");
            return None;
        }
        Some(SecretRecord {
            value: stored.key,
            issued_at,
            expires_at: stored.expires_at,
        })
    }

    /// Return the current key, rotating first if there is none or it expired.
    ///
    /// The expiry check and the replacement happen under one lock, so
    /// concurrent callers see at most one rotation per expiry.
    pub fn current_or_rotate(&self, now: DateTime<Utc>) -> SecretRecord {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = current.as_ref() {
            if !record.is_expired(now) {
                return record.clone();
            }
            tracing::info!(expired_at = %record.expires_at, "key expired, rotating");
        }

        let record = self.issue(now);
        *current = Some(record.clone());
        self.persist(&record);
        record
    }

    /// Replace the key unconditionally, archiving the previous one.
    pub fn force_reset(&self, now: DateTime<Utc>) -> SecretRecord {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.as_ref() {
            self.archive(previous, now);
        }

        let record = self.issue(now);
        *current = Some(record.clone());
        self.persist(&record);
        tracing::info!(expires_at = %record.expires_at, "key reset");
        record
    }

    /// The loaded record, without rotating. May be expired.
    pub fn peek(&self) -> Option<SecretRecord> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Flush the in-memory record. Returns whether the write succeeded.
    pub fn close(&self) -> bool {
        match self.peek() {
            Some(record) => save_document(
                self.store.as_ref(),
                KEY_DOCUMENT,
                &StoredKey::from(&record),
            ),
            None => true,
        }
    }

    fn issue(&self, now: DateTime<Utc>) -> SecretRecord {
        SecretRecord {
            value: self.generator.generate(),
            issued_at: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    fn persist(&self, record: &SecretRecord) {
        if !save_document(self.store.as_ref(), KEY_DOCUMENT, &StoredKey::from(record)) {
            tracing::warn!("key kept in memory only; snapshot write failed");
        }
    }

    fn archive(&self, previous: &SecretRecord, now: DateTime<Utc>) {
        let name = format!("{KEY_ARCHIVE_PREFIX}{}", now.timestamp_millis());
        if save_document(self.store.as_ref(), &name, &StoredKey::from(previous)) {
            tracing::debug!(document = %name, "archived previous key");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StoreError, StoreResult};

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn open_memory() -> (Arc<MemoryStore>, KeyStore) {
        let docs = Arc::new(MemoryStore::new());
        let store = KeyStore::open(docs.clone(), KeyStoreConfig::default());
        (docs, store)
    }

    struct ReadOnlyStore;

    impl DocumentStore for ReadOnlyStore {
        fn read(&self, _name: &str) -> StoreResult<Option<String>> {
            Ok(None)
        }

        fn write(&self, name: &str, _body: &str) -> StoreResult<()> {
            Err(StoreError::Database(format!("read-only: {name}")))
        }

        fn describe(&self) -> String {
            "read-only".to_string()
        }
    }

    #[test]
    fn test_empty_store_rotates_on_first_read() {
        let (docs, store) = open_memory();
        assert!(store.peek().is_none());

        let record = store.current_or_rotate(t0());
        assert_eq!(record.value().len(), DEFAULT_KEY_LENGTH);
        assert_eq!(record.issued_at(), t0());
        assert_eq!(record.expires_at(), t0() + TimeDelta::hours(12));
        assert!(docs.read(KEY_DOCUMENT).unwrap().is_some());
    }

    #[test]
    fn test_same_key_within_ttl() {
        let (_docs, store) = open_memory();
        let first = store.current_or_rotate(t0());
        let second = store.current_or_rotate(t0() + TimeDelta::hours(11));
        assert_eq!(first, second);
    }

    #[test]
    fn test_rotates_exactly_at_expiry() {
        let (_docs, store) = open_memory();
        let first = store.current_or_rotate(t0());
        let just_before = store.current_or_rotate(first.expires_at() - TimeDelta::milliseconds(1));
        let at_expiry = store.current_or_rotate(first.expires_at());

        assert_eq!(first, just_before);
        assert_ne!(first.value(), at_expiry.value());
        assert_eq!(at_expiry.issued_at(), first.expires_at());
    }

    #[test]
    fn test_force_reset_replaces_and_archives() {
        let (docs, store) = open_memory();
        let first = store.current_or_rotate(t0());
        let later = t0() + TimeDelta::hours(3);

        let reset = store.force_reset(later);
        assert_ne!(first.value(), reset.value());
        assert_eq!(reset.expires_at(), later + TimeDelta::hours(12));
        assert_eq!(store.current_or_rotate(later), reset);

        let archive = format!("{KEY_ARCHIVE_PREFIX}{}", later.timestamp_millis());
        let archived = docs.read(&archive).unwrap().unwrap();
        assert!(archived.contains(first.value()));
    }

    #[test]
    fn test_force_reset_on_empty_store_skips_archive() {
        let (docs, store) = open_memory();
        store.force_reset(t0());
        assert_eq!(docs.names(), vec![KEY_DOCUMENT.to_string()]);
    }

    #[test]
    fn test_write_failure_keeps_memory_authoritative() {
        let store = KeyStore::open(Arc::new(ReadOnlyStore), KeyStoreConfig::default());
        let first = store.current_or_rotate(t0());
        let again = store.current_or_rotate(t0() + TimeDelta::minutes(5));
        assert_eq!(first, again);

        let reset = store.force_reset(t0() + TimeDelta::minutes(6));
        assert_ne!(first.value(), reset.value());
        assert!(!store.close());
    }

    #[test]
    fn test_snapshot_without_issued_at_loads() {
        let docs = Arc::new(MemoryStore::new());
        let expires = t0() + TimeDelta::hours(2);
        docs.write(
            KEY_DOCUMENT,
            &format!(
                "{{\"key\": \"legacy-key\", \"expiresAt\": {}}}",
                expires.timestamp_millis()
            ),
        )
        .unwrap();

        let store = KeyStore::open(docs, KeyStoreConfig::default());
        let record = store.current_or_rotate(t0());
        assert_eq!(record.value(), "legacy-key");
        assert_eq!(record.issued_at(), expires - TimeDelta::hours(12));
    }

    #[test]
    fn test_snapshot_with_empty_key_is_discarded() {
        let docs = Arc::new(MemoryStore::new());
        docs.write(
            KEY_DOCUMENT,
            "{\"key\": \"\", \"issuedAt\": 0, \"expiresAt\": 99999999999999}",
        )
        .unwrap();

        let store = KeyStore::open(docs, KeyStoreConfig::default());
        assert!(store.peek().is_none());
        assert!(!store.current_or_rotate(t0()).value().is_empty());
    }

    #[test]
    fn test_snapshot_expiring_before_issue_is_discarded() {
        let docs = Arc::new(MemoryStore::new());
        docs.write(
            KEY_DOCUMENT,
            "{\"key\": \"abc\", \"issuedAt\": 2000, \"expiresAt\": 1000}",
        )
        .unwrap();

        let store = KeyStore::open(docs, KeyStoreConfig::default());
        assert!(store.peek().is_none());
    }

    #[test]
    fn test_remaining_is_floored_at_zero() {
        let (_docs, store) = open_memory();
        let record = store.current_or_rotate(t0());
        assert_eq!(
            record.remaining(t0() + TimeDelta::minutes(90)),
            TimeDelta::minutes(630)
        );
        assert_eq!(
            record.remaining(t0() + TimeDelta::hours(30)),
            TimeDelta::zero()
        );
    }

    #[test]
    fn test_custom_length_and_ttl() {
        let docs = Arc::new(MemoryStore::new());
        let store = KeyStore::open(
            docs,
            KeyStoreConfig {
                key_length: 10,
                ttl: Duration::from_secs(60),
            },
        );
        let record = store.current_or_rotate(t0());
        assert_eq!(record.value().len(), 10);
        assert_eq!(record.expires_at(), t0() + TimeDelta::seconds(60));
    }
}
