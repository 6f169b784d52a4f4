//! Read paths for the current key.
//!
//! ```text
//! interactive (chat command) ──▶ eligibility policy ──┐
//!                                                     ├──▶ KeyStore::current_or_rotate
//! programmatic (HTTP)        ──▶ static credential ───┘
//! privileged reset           ──▶ community owner ─────▶ KeyStore::force_reset
//! ```
//!
//! The programmatic path is for a trusted integration holding the API key and
//! skips the per-user eligibility policy on purpose.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use subtle::ConstantTimeEq;

use crate::eligibility::{evaluate, Denial, Eligibility, EligibilityConfig, Progress};
use crate::engagement::EngagementTracker;
use crate::key_store::{KeyStore, SecretRecord};

/// Remaining key lifetime split for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingTtl {
    pub hours: i64,
    pub minutes: i64,
}

impl From<TimeDelta> for RemainingTtl {
    fn from(delta: TimeDelta) -> Self {
        let total_minutes = delta.num_minutes().max(0);
        Self {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
        }
    }
}

/// Result of an interactive key request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveDisclosure {
    Granted { key: String, remaining: RemainingTtl },
    Denied { reason: Denial, progress: Progress },
}

/// Result of a privileged reset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Reset(SecretRecord),
    NotOwner,
}

/// The caller did not present the static API credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unauthorized")]
pub struct Unauthorized;

/// Gatekeeper in front of the [`KeyStore`].
pub struct Disclosure {
    keys: Arc<KeyStore>,
    engagement: Arc<EngagementTracker>,
    policy: EligibilityConfig,
    api_key: Option<String>,
}

impl Disclosure {
    /// `api_key` of `None` (or empty) closes the programmatic path.
    pub fn new(
        keys: Arc<KeyStore>,
        engagement: Arc<EngagementTracker>,
        policy: EligibilityConfig,
        api_key: Option<String>,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("no API key configured; HTTP key endpoint will refuse every request");
        }
        Self {
            keys,
            engagement,
            policy,
            api_key,
        }
    }

    pub fn policy(&self) -> &EligibilityConfig {
        &self.policy
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// Current eligibility of `user_id`.
    pub fn eligibility(&self, user_id: &str) -> Eligibility {
        evaluate(self.engagement.get(user_id).as_ref(), &self.policy)
    }

    /// Interactive path: policy check, then the key with its remaining lifetime.
    pub fn request_interactive(&self, user_id: &str, now: DateTime<Utc>) -> InteractiveDisclosure {
        match self.eligibility(user_id) {
            Eligibility::Denied { reason, progress } => {
                tracing::debug!(user_id, reason = reason.code(), "key request denied");
                InteractiveDisclosure::Denied { reason, progress }
            }
            Eligibility::Eligible { .. } => {
                let record = self.keys.current_or_rotate(now);
                InteractiveDisclosure::Granted {
                    key: record.value().to_string(),
                    remaining: record.remaining(now).into(),
                }
            }
        }
    }

    /// Programmatic path: static credential check, then the raw key.
    pub fn fetch_programmatic(
        &self,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, Unauthorized> {
        let (Some(expected), Some(provided)) = (self.api_key.as_deref(), credential) else {
            return Err(Unauthorized);
        };
        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(Unauthorized);
        }
        Ok(self.keys.current_or_rotate(now).value().to_string())
    }

    /// Privileged reset, allowed only for the community owner.
    pub fn reset(
        &self,
        requester_id: &str,
        owner_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResetOutcome {
        if owner_id != Some(requester_id) {
            tracing::debug!(user_id = requester_id, "key reset refused: not the owner");
            return ResetOutcome::NotOwner;
        }
        ResetOutcome::Reset(self.keys.force_reset(now))
    }
}
