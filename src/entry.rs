use std::cmp::Ordering;

use chrono::Utc;
use rand::Rng;

/// Seconds since the Unix epoch.
pub type Timestamp = f64;

/// Proficiency given to entries that have never been reviewed.
pub const INITIAL_PROFICIENCY: f64 = 60.0;
/// Lower bound for the proficiency after a failed review.
pub const MIN_PROFICIENCY: f64 = 60.0;
/// New entries become due somewhere within this many seconds.
pub const INITIAL_DUE_JITTER: f64 = 300.0;

pub fn now() -> Timestamp {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// One side of a card: the text shown to the learner and its own review state.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub text: String,
    /// Current review interval in seconds.
    pub proficiency: f64,
    pub due: Timestamp,
}

impl Entry {
    /// A fresh entry, due within [`INITIAL_DUE_JITTER`] seconds of `now`.
    pub fn new<R: Rng>(text: impl Into<String>, now: Timestamp, rng: &mut R) -> Self {
        Self {
            text: text.into(),
            proficiency: INITIAL_PROFICIENCY,
            due: now + rng.random_range(0.0..INITIAL_DUE_JITTER),
        }
    }

    pub fn with_state(text: impl Into<String>, proficiency: f64, due: Timestamp) -> Self {
        Self {
            text: text.into(),
            proficiency,
            due,
        }
    }

    pub fn is_due_at(&self, now: Timestamp) -> bool {
        now >= self.due
    }

    /// Seconds this entry has been waiting past its due time.
    pub fn overdue_at(&self, now: Timestamp) -> f64 {
        (now - self.due).max(0.0)
    }

    /// Orders entries by due time, soonest first.
    pub fn cmp_due(&self, other: &Self) -> Ordering {
        self.due.total_cmp(&other.due)
    }
}
