//! Flat-file JSON storage.
//!
//! Two files live in the data directory:
//! - `questions.json`: the question pool, seeded from the fallback bank
//! - `tests.json`: every stored test, in progress or completed
//!
//! Each read-modify-write cycle runs under one async mutex, and files are
//! replaced atomically through a temp file in the same directory. Starting a
//! test drops other owners' tests in progress once they pass the idle
//! timeout, and every test of the least recently active owners beyond the
//! session cap.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use mathquiz_core::bank::fallback_questions;
use mathquiz_core::history::History;
use mathquiz_core::model::{Question, SubmittedAnswer, Test, TestResult};
use mathquiz_core::parser::parse_question_file_str;
use mathquiz_core::traits::QuizStore;
use mathquiz_core::QuizError;

use crate::{record_usage, Retention};

pub const QUESTIONS_FILE: &str = "questions.json";
pub const TESTS_FILE: &str = "tests.json";

/// Persists the question pool and tests as JSON files.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    history_limit: usize,
    retention: Retention,
    /// Selected history index per owner. Guards file access as well.
    selected: Mutex<HashMap<String, usize>>,
}

impl JsonFileStore {
    /// Open (and if needed initialize) a store in `data_dir`.
    pub async fn open(data_dir: impl Into<PathBuf>, history_limit: usize) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

        let store = Self {
            data_dir,
            history_limit,
            retention: Retention::default(),
            selected: Mutex::new(HashMap::new()),
        };

        if !store.questions_path().exists() {
            tracing::info!(
                path = %store.questions_path().display(),
                "seeding question file from fallback bank"
            );
            write_json(&store.questions_path(), &fallback_questions()).await?;
        }
        if !store.tests_path().exists() {
            write_json(&store.tests_path(), &Vec::<Test>::new()).await?;
        }

        Ok(store)
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn questions_path(&self) -> PathBuf {
        self.data_dir.join(QUESTIONS_FILE)
    }

    pub fn tests_path(&self) -> PathBuf {
        self.data_dir.join(TESTS_FILE)
    }

    /// Every stored test, in file order.
    pub async fn all_tests(&self) -> Result<Vec<Test>> {
        let _guard = self.selected.lock().await;
        self.load_tests().await
    }

    /// Owners that have at least one completed test.
    pub async fn owners(&self) -> Result<Vec<String>> {
        let mut owners: Vec<String> = self
            .all_tests()
            .await?
            .into_iter()
            .filter(|t| t.completed)
            .map(|t| t.owner)
            .collect();
        owners.sort();
        owners.dedup();
        Ok(owners)
    }

    async fn load_questions(&self) -> Result<Vec<Question>> {
        let path = self.questions_path();
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_question_file_str(&content, &path)
    }

    async fn load_tests(&self) -> Result<Vec<Test>> {
        read_json(&self.tests_path()).await
    }

    fn history_of(&self, tests: &[Test], owner: &str) -> History {
        History::from_results(
            self.history_limit,
            tests
                .iter()
                .filter(|t| t.owner == owner && t.completed)
                .filter_map(|t| t.result.clone()),
        )
    }
}

#[async_trait]
impl QuizStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn questions(&self) -> Result<Vec<Question>> {
        let _guard = self.selected.lock().await;
        self.load_questions().await
    }

    async fn replace_questions(&self, questions: Vec<Question>) -> Result<()> {
        let _guard = self.selected.lock().await;
        write_json(&self.questions_path(), &questions).await
    }

    async fn begin_test(&self, test: Test) -> Result<()> {
        let mut selected = self.selected.lock().await;
        let mut tests = self.load_tests().await?;
        let before = tests.len();
        let now = Utc::now();

        tests.retain(|t| {
            t.completed || (t.owner != test.owner && !self.retention.is_expired(t.started_at, now))
        });

        let mut activity: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for t in tests.iter().filter(|t| t.owner != test.owner) {
            let at = t.completed_at.unwrap_or(t.started_at);
            let latest = activity.entry(t.owner.as_str()).or_insert(at);
            *latest = (*latest).max(at);
        }
        let dropped: HashSet<String> = self
            .retention
            .over_capacity(
                activity
                    .into_iter()
                    .map(|(owner, at)| (at, owner.to_string()))
                    .collect(),
            )
            .into_iter()
            .collect();
        if !dropped.is_empty() {
            tests.retain(|t| !dropped.contains(&t.owner));
            selected.retain(|owner, _| !dropped.contains(owner));
        }

        if tests.len() < before {
            tracing::debug!(
                pruned = before - tests.len(),
                owners_dropped = dropped.len(),
                "pruned stored tests"
            );
        }

        tests.push(test);
        write_json(&self.tests_path(), &tests).await
    }

    async fn current_test(&self, owner: &str) -> Result<Option<Test>> {
        let _guard = self.selected.lock().await;
        let tests = self.load_tests().await?;
        Ok(tests
            .into_iter()
            .rev()
            .find(|t| t.owner == owner && !t.completed))
    }

    async fn complete_test(
        &self,
        owner: &str,
        answers: BTreeMap<String, SubmittedAnswer>,
    ) -> Result<TestResult> {
        let mut selected = self.selected.lock().await;
        let mut tests = self.load_tests().await?;

        let index = tests
            .iter()
            .rposition(|t| t.owner == owner && !t.completed)
            .ok_or(QuizError::NoTestInProgress)?;
        let result = tests[index].complete(answers)?.clone();

        // Keep only the newest completed tests for this owner
        let keep: HashSet<_> = self
            .history_of(&tests, owner)
            .iter()
            .map(|r| r.test_id)
            .collect();
        tests.retain(|t| t.owner != owner || !t.completed || keep.contains(&t.id));

        let mut questions = self.load_questions().await?;
        record_usage(&mut questions, &result);

        write_json(&self.tests_path(), &tests).await?;
        write_json(&self.questions_path(), &questions).await?;
        selected.insert(owner.to_string(), 0);

        tracing::info!(
            owner,
            score = result.score,
            total = result.total,
            "test completed"
        );
        Ok(result)
    }

    async fn history(&self, owner: &str) -> Result<Vec<TestResult>> {
        let _guard = self.selected.lock().await;
        let tests = self.load_tests().await?;
        Ok(self.history_of(&tests, owner).to_vec())
    }

    async fn previous_question_ids(&self, owner: &str) -> Result<HashSet<u32>> {
        let _guard = self.selected.lock().await;
        let tests = self.load_tests().await?;
        let latest = tests
            .iter()
            .filter(|t| t.owner == owner)
            .max_by_key(|t| t.completed_at.unwrap_or(t.started_at));
        Ok(latest
            .map(|t| t.question_ids().into_iter().collect())
            .unwrap_or_default())
    }

    async fn select_result(&self, owner: &str, index: usize) -> Result<TestResult> {
        let mut selected = self.selected.lock().await;
        let tests = self.load_tests().await?;
        let result = self.history_of(&tests, owner).get(index)?.clone();
        selected.insert(owner.to_string(), index);
        Ok(result)
    }

    async fn selected_result(&self, owner: &str) -> Result<Option<TestResult>> {
        let selected = self.selected.lock().await;
        let tests = self.load_tests().await?;
        let history = self.history_of(&tests, owner);
        Ok(selected
            .get(owner)
            .and_then(|i| history.get(*i).ok())
            .or_else(|| history.latest())
            .cloned())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Atomically replace `path` with the pretty-printed JSON of `value`.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::answers;
    use chrono::TimeDelta;
    use std::sync::Arc;
    use std::time::Duration;

    async fn start(store: &JsonFileStore, owner: &str, ids: &[u32]) {
        let pool = store.questions().await.unwrap();
        let questions = pool.into_iter().filter(|q| ids.contains(&q.id)).collect();
        store.begin_test(Test::new(owner, questions)).await.unwrap();
    }

    #[tokio::test]
    async fn open_seeds_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data"), 5).await.unwrap();
        assert!(store.questions_path().exists());
        assert!(store.tests_path().exists());
        assert_eq!(store.questions().await.unwrap(), fallback_questions());
        assert!(store.all_tests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_keeps_existing_questions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(QUESTIONS_FILE),
            r#"[{"id": 1, "question": "Only one", "options": ["a","b","c","d"], "correct_answer": "A", "explanation": "a"}]"#,
        )
        .unwrap();
        let store = JsonFileStore::open(dir.path(), 5).await.unwrap();
        let questions = store.questions().await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, 0);
    }

    #[tokio::test]
    async fn full_cycle_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::open(dir.path(), 5).await.unwrap();
            start(&store, "s1", &[1, 5]).await;
            assert!(store.current_test("s1").await.unwrap().is_some());
            let result = store
                .complete_test("s1", answers(&[(1, "5"), (5, "$20")]))
                .await
                .unwrap();
            assert_eq!(result.score, 2);
            assert!((result.percentage - 100.0).abs() < f64::EPSILON);
        }

        let store = JsonFileStore::open(dir.path(), 5).await.unwrap();
        let history = store.history("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(store.current_test("s1").await.unwrap().is_none());
        assert_eq!(
            store.previous_question_ids("s1").await.unwrap(),
            HashSet::from([1, 5])
        );

        let pool = store.questions().await.unwrap();
        let q5 = pool.iter().find(|q| q.id == 5).unwrap();
        assert_eq!((q5.times_used, q5.times_correct), (1, 1));
        assert_eq!(store.owners().await.unwrap(), vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn starting_again_replaces_test_in_progress() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), 5).await.unwrap();
        start(&store, "s", &[1]).await;
        start(&store, "s", &[2]).await;
        let tests = store.all_tests().await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].question_ids(), vec![2]);
    }

    #[tokio::test]
    async fn stored_history_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), 5).await.unwrap();
        for _ in 0..7 {
            start(&store, "s", &[1, 2]).await;
            store.complete_test("s", BTreeMap::new()).await.unwrap();
        }
        assert_eq!(store.history("s").await.unwrap().len(), 5);
        assert_eq!(store.all_tests().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn complete_without_test_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), 5).await.unwrap();
        let err = store.complete_test("s", BTreeMap::new()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<QuizError>(),
            Some(&QuizError::NoTestInProgress)
        );
    }

    #[tokio::test]
    async fn concurrent_submissions_do_not_lose_usage() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path(), 5).await.unwrap());
        for owner in ["a", "b", "c", "d"] {
            start(&store, owner, &[3]).await;
        }

        let handles: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|owner| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.complete_test(owner, answers(&[(3, "4")])).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pool = store.questions().await.unwrap();
        let q3 = pool.iter().find(|q| q.id == 3).unwrap();
        assert_eq!((q3.times_used, q3.times_correct), (4, 4));
    }

    #[tokio::test]
    async fn select_result_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), 5).await.unwrap();
        start(&store, "s", &[1]).await;
        store.complete_test("s", answers(&[(1, "5")])).await.unwrap();
        start(&store, "s", &[1]).await;
        store.complete_test("s", BTreeMap::new()).await.unwrap();

        assert_eq!(store.selected_result("s").await.unwrap().unwrap().score, 0);
        assert_eq!(store.select_result("s", 1).await.unwrap().score, 1);
        assert_eq!(store.selected_result("s").await.unwrap().unwrap().score, 1);
        assert!(store.select_result("s", 2).await.is_err());
    }

    #[tokio::test]
    async fn stale_tests_in_progress_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), 5)
            .await
            .unwrap()
            .with_retention(Retention {
                idle_timeout: Duration::from_secs(60 * 60),
                ..Retention::default()
            });
        let pool = store.questions().await.unwrap();

        let mut stale = Test::new("stale", pool[..1].to_vec());
        stale.started_at = Utc::now() - TimeDelta::hours(3);
        store.begin_test(stale).await.unwrap();
        start(&store, "fresh", &[2]).await;

        let tests = store.all_tests().await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].owner, "fresh");
    }

    #[tokio::test]
    async fn stored_owners_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path(), 5)
            .await
            .unwrap()
            .with_retention(Retention {
                max_sessions: 4,
                ..Retention::default()
            });

        start(&store, "first", &[1]).await;
        store.complete_test("first", answers(&[(1, "5")])).await.unwrap();
        for i in 0..20 {
            start(&store, &format!("s{i}"), &[1]).await;
        }

        let tests = store.all_tests().await.unwrap();
        assert_eq!(tests.len(), 4);
        assert!(store.current_test("s19").await.unwrap().is_some());
        assert!(store.history("first").await.unwrap().is_empty());
    }
}
