//! Sliding-window spam guard.
//!
//! Keeps the recent message timestamps of each user in memory only. A user
//! who sends `threshold` messages within `window` is flagged; the caller
//! times them out and does not count the message toward engagement.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Spam guard settings. A zero threshold disables the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpamConfig {
    pub window: Duration,
    pub threshold: usize,
    pub timeout: Duration,
}

impl SpamConfig {
    pub fn disabled() -> Self {
        Self {
            window: Duration::from_secs(5),
            threshold: 0,
            timeout: Duration::from_secs(5 * 60),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold > 0 && !self.window.is_zero()
    }
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    Allowed,
    Flagged { messages: usize, timeout: Duration },
}

impl SpamVerdict {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged { .. })
    }
}

pub struct SpamGuard {
    config: SpamConfig,
    window: TimeDelta,
    recent: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl SpamGuard {
    pub fn new(config: SpamConfig) -> Self {
        Self {
            config,
            window: TimeDelta::from_std(config.window).unwrap_or(TimeDelta::MAX),
            recent: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SpamConfig {
        &self.config
    }

    /// Record a message from `user_id` at `now` and judge it.
    ///
    /// A flagged user's window is cleared so the timeout is applied once.
    pub fn check(&self, user_id: &str, now: DateTime<Utc>) -> SpamVerdict {
        if !self.config.is_enabled() {
            return SpamVerdict::Allowed;
        }

        let cutoff = now.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        let stamps = recent.entry(user_id.to_string()).or_default();
        while stamps.front().is_some_and(|t| *t <= cutoff) {
            stamps.pop_front();
        }
        stamps.push_back(now);

        if stamps.len() < self.config.threshold {
            return SpamVerdict::Allowed;
        }

        let messages = stamps.len();
        recent.remove(user_id);
        tracing::info!(user_id, messages, "spam threshold reached");
        SpamVerdict::Flagged {
            messages,
            timeout: self.config.timeout,
        }
    }

    /// Drop users with no message inside the window.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let cutoff = now.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, stamps| stamps.back().is_some_and(|t| *t > cutoff));
    }

    /// Users currently holding a window.
    pub fn tracked_users(&self) -> usize {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
