//! Core trait definitions for LLM providers and quiz storage.
//!
//! These async traits are implemented by the `mathquiz-providers` and
//! `mathquiz-store` crates respectively.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Question, SubmittedAnswer, Test, TestResult};

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for LLM backends that generate question sets from prompts.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Send a prompt and return the raw completion.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List available models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request for a single completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gpt-4.1-mini").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
}

/// Default system prompt for question generation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a mathematics teacher writing multiple-choice quiz questions. Respond ONLY with a JSON array. Do not include explanations or prose outside the JSON.";

// ---------------------------------------------------------------------------
// Quiz store trait
// ---------------------------------------------------------------------------

/// Storage for the question pool, in-progress tests, and per-session history.
///
/// `owner` is an opaque session identifier.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Human-readable backend name (e.g. "json").
    fn name(&self) -> &str;

    /// The current question pool.
    async fn questions(&self) -> anyhow::Result<Vec<Question>>;

    /// Replace the question pool.
    async fn replace_questions(&self, questions: Vec<Question>) -> anyhow::Result<()>;

    /// Store `test` as the owner's test in progress, replacing any earlier one.
    async fn begin_test(&self, test: Test) -> anyhow::Result<()>;

    /// The owner's test in progress, if any.
    async fn current_test(&self, owner: &str) -> anyhow::Result<Option<Test>>;

    /// Grade the owner's test in progress and record the result.
    ///
    /// Pushes the result onto the owner's history, selects it for display,
    /// updates question usage counters and clears the test in progress.
    /// Fails with [`QuizError::NoTestInProgress`](crate::QuizError) when no
    /// test was started.
    async fn complete_test(
        &self,
        owner: &str,
        answers: BTreeMap<String, SubmittedAnswer>,
    ) -> anyhow::Result<TestResult>;

    /// The owner's recent results, newest first.
    async fn history(&self, owner: &str) -> anyhow::Result<Vec<TestResult>>;

    /// Question IDs of the owner's most recent test, started or completed.
    async fn previous_question_ids(&self, owner: &str) -> anyhow::Result<HashSet<u32>>;

    /// Select the history entry at `index` for display.
    async fn select_result(&self, owner: &str, index: usize) -> anyhow::Result<TestResult>;

    /// The result selected for display, defaulting to the newest one.
    async fn selected_result(&self, owner: &str) -> anyhow::Result<Option<TestResult>>;
}
