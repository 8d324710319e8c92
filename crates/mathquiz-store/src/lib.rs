//! mathquiz-store — Storage backends for questions, tests, and history.
//!
//! Both backends implement [`QuizStore`](mathquiz_core::traits::QuizStore):
//! [`MemoryStore`] keeps per-session state in process memory, and
//! [`JsonFileStore`] persists `questions.json` and `tests.json`.

use std::time::Duration;

use chrono::{DateTime, Utc};

use mathquiz_core::model::{Question, TestResult};

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

/// How much per-session state a store keeps.
///
/// Applied whenever a test is started, so a client that never sends its
/// session cookie back cannot grow the store without bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Sessions (or, for the file store, tests in progress) untouched for
    /// longer than this are dropped.
    pub idle_timeout: Duration,
    /// Sessions kept at most; the least recently active are dropped first.
    pub max_sessions: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(24 * 60 * 60),
            max_sessions: 10_000,
        }
    }
}

impl Retention {
    pub(crate) fn is_expired(&self, last_active: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - last_active)
            .to_std()
            .is_ok_and(|idle| idle > self.idle_timeout)
    }

    /// Owners to drop so that `keep` plus the rest fit under `max_sessions`.
    ///
    /// `activity` holds the last activity of every owner other than `keep`.
    pub(crate) fn over_capacity(&self, mut activity: Vec<(DateTime<Utc>, String)>) -> Vec<String> {
        let room = self.max_sessions.saturating_sub(1);
        if activity.len() <= room {
            return Vec::new();
        }
        activity.sort();
        let excess = activity.len() - room;
        activity.into_iter().take(excess).map(|(_, owner)| owner).collect()
    }
}

/// Bump usage counters for every pool question that appeared in `result`.
pub(crate) fn record_usage(pool: &mut [Question], result: &TestResult) {
    for feedback in &result.feedback {
        if let Some(q) = pool.iter_mut().find(|q| q.id == feedback.question_id) {
            q.times_used += 1;
            if feedback.is_correct {
                q.times_correct += 1;
            }
        }
    }
}
