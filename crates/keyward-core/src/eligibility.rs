//! Eligibility policy for interactive key disclosure.
//!
//! A pure function over a user's engagement and the configured thresholds.
//! Checks run in a fixed order and the first failure is the reported reason:
//!
//! 1. verification (when required)
//! 2. qualifying event count

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engagement::UserEngagement;

/// Policy thresholds. The default requires nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    pub require_verification: bool,
    pub minimum_qualifying_events: u64,
}

/// Where a user stands against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub qualifying_events: u64,
    pub required_events: u64,
    pub verified: bool,
    pub verification_required: bool,
}

impl Progress {
    /// Events still missing before the threshold is met.
    pub fn remaining_events(&self) -> u64 {
        self.required_events.saturating_sub(self.qualifying_events)
    }
}

/// Why a user was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NotVerified,
    InsufficientEngagement { deficit: u64 },
}

impl Denial {
    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotVerified => "not verified",
            Self::InsufficientEngagement { .. } => "insufficient engagement",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotVerified => f.write_str("not verified"),
            Self::InsufficientEngagement { deficit } => {
                write!(f, "insufficient engagement: {deficit} more needed")
            }
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible { progress: Progress },
    Denied { reason: Denial, progress: Progress },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }

    pub fn progress(&self) -> Progress {
        match self {
            Self::Eligible { progress } | Self::Denied { progress, .. } => *progress,
        }
    }

    pub fn denial(&self) -> Option<Denial> {
        match self {
            Self::Eligible { .. } => None,
            Self::Denied { reason, .. } => Some(*reason),
        }
    }
}

/// Decide whether `engagement` may receive the key.
///
/// A user with no record is evaluated as zero events, unverified.
pub fn evaluate(engagement: Option<&UserEngagement>, config: &EligibilityConfig) -> Eligibility {
    let (count, verified) = engagement
        .map(|e| (e.qualifying_event_count, e.verified))
        .unwrap_or((0, false));

    let progress = Progress {
        qualifying_events: count,
        required_events: config.minimum_qualifying_events,
        verified,
        verification_required: config.require_verification,
    };

    if config.require_verification && !verified {
        return Eligibility::Denied {
            reason: Denial::NotVerified,
            progress,
        };
    }

    if count < config.minimum_qualifying_events {
        return Eligibility::Denied {
            reason: Denial::InsufficientEngagement {
                deficit: progress.remaining_events(),
            },
            progress,
        };
    }

    Eligibility::Eligible { progress }
}
