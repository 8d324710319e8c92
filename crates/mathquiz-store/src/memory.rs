//! In-memory session storage.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use mathquiz_core::bank::fallback_questions;
use mathquiz_core::history::History;
use mathquiz_core::model::{Question, SubmittedAnswer, Test, TestResult};
use mathquiz_core::traits::QuizStore;
use mathquiz_core::QuizError;

use crate::{record_usage, Retention};

#[derive(Debug)]
struct Session {
    current: Option<Test>,
    history: History,
    last_question_ids: HashSet<u32>,
    selected: Option<usize>,
    last_active: DateTime<Utc>,
}

impl Session {
    fn new(history_limit: usize, now: DateTime<Utc>) -> Self {
        Self {
            current: None,
            history: History::new(history_limit),
            last_question_ids: HashSet::new(),
            selected: None,
            last_active: now,
        }
    }
}

#[derive(Debug)]
struct Inner {
    questions: Vec<Question>,
    sessions: HashMap<String, Session>,
}

/// Keeps everything in process memory, keyed by session.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    history_limit: usize,
    retention: Retention,
}

impl MemoryStore {
    /// A store seeded with the fallback question bank.
    pub fn new(history_limit: usize) -> Self {
        Self::with_questions(fallback_questions(), history_limit)
    }

    pub fn with_questions(questions: Vec<Question>, history_limit: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                questions,
                sessions: HashMap::new(),
            }),
            history_limit,
            retention: Retention::default(),
        }
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Number of sessions currently held.
    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }
}

/// Drop idle sessions, then the least recently active ones over the cap.
fn evict_sessions(sessions: &mut HashMap<String, Session>, retention: &Retention, keep: &str) {
    let now = Utc::now();
    let before = sessions.len();
    sessions.retain(|owner, s| owner == keep || !retention.is_expired(s.last_active, now));

    let activity = sessions
        .iter()
        .filter(|(owner, _)| *owner != keep)
        .map(|(owner, s)| (s.last_active, owner.clone()))
        .collect();
    for owner in retention.over_capacity(activity) {
        sessions.remove(&owner);
    }

    let evicted = before - sessions.len();
    if evicted > 0 {
        tracing::debug!(evicted, remaining = sessions.len(), "evicted idle sessions");
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn questions(&self) -> Result<Vec<Question>> {
        Ok(self.inner.lock().await.questions.clone())
    }

    async fn replace_questions(&self, questions: Vec<Question>) -> Result<()> {
        self.inner.lock().await.questions = questions;
        Ok(())
    }

    async fn begin_test(&self, test: Test) -> Result<()> {
        let mut inner = self.inner.lock().await;
        evict_sessions(&mut inner.sessions, &self.retention, &test.owner);

        let session = inner
            .sessions
            .entry(test.owner.clone())
            .or_insert_with(|| Session::new(self.history_limit, test.started_at));
        session.last_active = test.started_at;
        session.current = Some(test);
        Ok(())
    }

    async fn current_test(&self, owner: &str) -> Result<Option<Test>> {
        let inner = self.inner.lock().await;
        Ok(inner.sessions.get(owner).and_then(|s| s.current.clone()))
    }

    async fn complete_test(
        &self,
        owner: &str,
        answers: BTreeMap<String, SubmittedAnswer>,
    ) -> Result<TestResult> {
        let mut inner = self.inner.lock().await;
        let Inner {
            questions,
            sessions,
        } = &mut *inner;

        let session = sessions.get_mut(owner).ok_or(QuizError::NoTestInProgress)?;
        let mut test = session.current.take().ok_or(QuizError::NoTestInProgress)?;

        let result = match test.complete(answers).cloned() {
            Ok(result) => result,
            Err(e) => {
                session.current = Some(test);
                return Err(e.into());
            }
        };

        record_usage(questions, &result);
        session.last_question_ids = test.question_ids().into_iter().collect();
        session.history.push(result.clone());
        session.selected = Some(0);
        session.last_active = result.date;

        tracing::info!(
            owner,
            score = result.score,
            total = result.total,
            "test completed"
        );
        Ok(result)
    }

    async fn history(&self, owner: &str) -> Result<Vec<TestResult>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .get(owner)
            .map(|s| s.history.to_vec())
            .unwrap_or_default())
    }

    async fn previous_question_ids(&self, owner: &str) -> Result<HashSet<u32>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .get(owner)
            .map(|s| match &s.current {
                Some(test) => test.question_ids().into_iter().collect(),
                None => s.last_question_ids.clone(),
            })
            .unwrap_or_default())
    }

    async fn select_result(&self, owner: &str, index: usize) -> Result<TestResult> {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.sessions.get_mut(owner) else {
            return Err(QuizError::HistoryIndexOutOfRange { index, len: 0 }.into());
        };
        let result = session.history.get(index)?.clone();
        session.selected = Some(index);
        Ok(result)
    }

    async fn selected_result(&self, owner: &str) -> Result<Option<TestResult>> {
        let inner = self.inner.lock().await;
        Ok(inner.sessions.get(owner).and_then(|s| {
            s.selected
                .and_then(|i| s.history.get(i).ok())
                .or_else(|| s.history.latest())
                .cloned()
        }))
    }
}
