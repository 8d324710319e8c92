//! Bounded recent-test history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::model::TestResult;

/// Maximum number of results kept per owner.
pub const HISTORY_LIMIT: usize = 5;

/// The most recent test results, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    limit: usize,
    entries: VecDeque<TestResult>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl History {
    /// Create an empty history. `limit` is clamped to `1..=HISTORY_LIMIT`.
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, HISTORY_LIMIT);
        Self {
            limit,
            entries: VecDeque::with_capacity(limit),
        }
    }

    /// Build a history from results in any order; only the newest are kept.
    pub fn from_results(limit: usize, results: impl IntoIterator<Item = TestResult>) -> Self {
        let mut sorted: Vec<TestResult> = results.into_iter().collect();
        sorted.sort_by_key(|r| r.date);
        let mut history = Self::new(limit);
        for result in sorted {
            history.push(result);
        }
        history
    }

    /// Record a new result at the front, dropping the oldest beyond the limit.
    pub fn push(&mut self, result: TestResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.limit);
    }

    /// Result at `index`, where 0 is the newest.
    pub fn get(&self, index: usize) -> Result<&TestResult, QuizError> {
        self.entries
            .get(index)
            .ok_or(QuizError::HistoryIndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    pub fn latest(&self) -> Option<&TestResult> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestResult> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<TestResult> {
        self.entries.iter().cloned().collect()
    }
}
