//! Remote question generation with a static fallback.
//!
//! The generator asks an LLM provider for a fresh batch of questions. Any
//! failure along the way (no provider, transport or HTTP error, unparseable
//! output) is logged and answered with the fallback bank, unchanged.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::bank::fallback_questions;
use crate::model::Question;
use crate::parser::parse_generated_questions;
use crate::traits::{GenerateRequest, LlmProvider, DEFAULT_SYSTEM_PROMPT};

/// Configuration for question generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Model to request.
    pub model: String,
    /// Number of questions to ask for.
    pub count: usize,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens for the completion.
    pub max_tokens: u32,
    /// Student level named in the prompt.
    pub level: String,
    /// Optional system prompt override.
    pub system_prompt_override: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".into(),
            count: 10,
            temperature: 0.7,
            max_tokens: 2000,
            level: "Year 7".into(),
            system_prompt_override: None,
        }
    }
}

/// Where a batch of questions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionOrigin {
    Generated,
    Fallback,
}

impl fmt::Display for QuestionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionOrigin::Generated => write!(f, "generated"),
            QuestionOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// A batch of questions plus its provenance.
#[derive(Debug, Clone)]
pub struct GeneratedQuestions {
    pub questions: Vec<Question>,
    pub origin: QuestionOrigin,
    /// Why the fallback was used, if it was.
    pub fallback_reason: Option<String>,
}

/// Generates questions through an optional LLM provider.
pub struct QuestionGenerator {
    provider: Option<Arc<dyn LlmProvider>>,
    config: GeneratorConfig,
}

impl QuestionGenerator {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, config: GeneratorConfig) -> Self {
        Self { provider, config }
    }

    /// A generator that always serves the fallback bank.
    pub fn disabled() -> Self {
        Self::new(None, GeneratorConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The user prompt sent to the provider.
    pub fn build_prompt(&self) -> String {
        format!(
            "Generate {count} diverse multiple-choice math questions for {level} students. \
Cover algebra, percentages, rates, geometry, fractions, and number sequences.\n\
Return a JSON array where each element has exactly these fields:\n\
- \"question\": the question text\n\
- \"options\": an array of exactly 4 answer strings\n\
- \"correct_answer\": the zero-based index (0-3) of the correct option\n\
- \"explanation\": a short worked solution\n\
Return only the JSON array.",
            count = self.config.count,
            level = self.config.level,
        )
    }

    /// Generate questions, falling back to the static bank on any failure.
    pub async fn generate(&self) -> GeneratedQuestions {
        let Some(provider) = &self.provider else {
            return fallback("question generation is disabled".into());
        };

        match self.try_generate(provider.as_ref()).await {
            Ok(questions) => GeneratedQuestions {
                questions,
                origin: QuestionOrigin::Generated,
                fallback_reason: None,
            },
            Err(e) => {
                tracing::warn!(provider = provider.name(), "question generation failed: {e:#}");
                fallback(format!("{e:#}"))
            }
        }
    }

    async fn try_generate(&self, provider: &dyn LlmProvider) -> anyhow::Result<Vec<Question>> {
        let start = Instant::now();
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: self.build_prompt(),
            system_prompt: Some(
                self.config
                    .system_prompt_override
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = provider.generate(&request).await?;
        let mut questions = parse_generated_questions(&response.content)?;
        questions.truncate(self.config.count.max(1));

        tracing::info!(
            provider = provider.name(),
            model = %response.model,
            count = questions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generated questions"
        );
        Ok(questions)
    }
}

fn fallback(reason: String) -> GeneratedQuestions {
    GeneratedQuestions {
        questions: fallback_questions(),
        origin: QuestionOrigin::Fallback,
        fallback_reason: Some(reason),
    }
}

/// Append generated questions to a pool under fresh IDs.
///
/// Questions whose text already appears in the pool (case-insensitive) are
/// skipped. Returns the number of questions added.
pub fn merge_into_pool(pool: &mut Vec<Question>, generated: Vec<Question>) -> usize {
    let mut known: HashSet<String> = pool
        .iter()
        .map(|q| q.question.trim().to_lowercase())
        .collect();
    let mut next_id = pool.iter().map(|q| q.id).max().unwrap_or(0) + 1;
    let mut added = 0;

    for mut q in generated {
        if !known.insert(q.question.trim().to_lowercase()) {
            continue;
        }
        q.id = next_id;
        q.times_used = 0;
        q.times_correct = 0;
        next_id += 1;
        added += 1;
        pool.push(q);
    }

    added
}
