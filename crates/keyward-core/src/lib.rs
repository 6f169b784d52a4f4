//! Key lifecycle and eligibility gating engine.
//!
//! This crate owns everything stateful about Keyward:
//!
//! - Secret generation from a fixed alphabet using the OS RNG
//! - A key store with lazy rotation on read and privileged reset
//! - Per-user engagement tracking (message counts, verification flag)
//! - A pure eligibility policy over engagement state
//! - Command usage counters for the owner-only report
//! - A sliding-window spam guard
//! - The disclosure service that ties the above together
//!
//! # Architecture
//!
//! ```text
//!  platform events ──▶ EngagementTracker ──▶ EligibilityPolicy ──▶ Disclosure
//!                                                                    │
//!                                    KeyStore (lazy rotate / reset) ◀┘
//!                                        │
//!                                  DocumentStore (json dir / sqlite / memory)
//! ```
//!
//! All persistence goes through [`storage::DocumentStore`], which reads and
//! rewrites whole documents. Persistence failures are logged and never
//! surface to callers: the in-memory state stays authoritative.

pub mod disclosure;
pub mod eligibility;
pub mod engagement;
pub mod key_store;
pub mod secret;
pub mod spam;
pub mod storage;
pub mod usage;

pub use disclosure::{Disclosure, InteractiveDisclosure, RemainingTtl, ResetOutcome, Unauthorized};
pub use eligibility::{evaluate, Denial, Eligibility, EligibilityConfig, Progress};
pub use engagement::{EngagementTracker, UserEngagement, ENGAGEMENT_DOCUMENT};
pub use key_store::{
    KeyStore, KeyStoreConfig, SecretRecord, DEFAULT_KEY_TTL, KEY_ARCHIVE_PREFIX, KEY_DOCUMENT,
};
pub use secret::{SecretGenerator, DEFAULT_KEY_LENGTH, KEY_ALPHABET};
pub use spam::{SpamConfig, SpamGuard, SpamVerdict};
pub use storage::{
    load_document, save_document, DocumentStore, JsonDirStore, MemoryStore, StoreError, StoreResult,
};
pub use usage::{CommandUsage, UsageTracker, UserUsage, USAGE_DOCUMENT};

#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;
