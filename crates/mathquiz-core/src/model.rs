//! Core data model types for mathquiz.
//!
//! Questions always carry their correct answer as a zero-based option index.
//! Question files and generated output may also name the answer by letter,
//! literal option text or a numeric string; [`AnswerKey::resolve`] normalizes
//! those. Submitted answers are stricter: a string is matched as option text
//! or a letter, and only a JSON number is read as an index.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::QuizError;

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 4;

/// Option letters in display order.
pub const OPTION_LETTERS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D'];

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    /// Identifier, unique within a question pool.
    pub id: u32,
    /// The question text shown to the student.
    pub question: String,
    /// The four answer options, in display order.
    pub options: [String; OPTION_COUNT],
    /// Zero-based index into `options`.
    pub correct_answer: usize,
    /// Worked explanation shown after grading.
    pub explanation: String,
    /// How many completed tests included this question.
    #[serde(default)]
    pub times_used: u32,
    /// How many of those tests answered it correctly.
    #[serde(default)]
    pub times_correct: u32,
}

impl Question {
    /// Build a question, checking that the correct answer points at an option.
    pub fn new(
        id: u32,
        question: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct_answer: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuizError> {
        if correct_answer >= OPTION_COUNT {
            return Err(QuizError::InvalidQuestion {
                id,
                reason: format!("correct answer index {correct_answer} out of range"),
            });
        }
        Ok(Self {
            id,
            question: question.into(),
            options,
            correct_answer,
            explanation: explanation.into(),
            times_used: 0,
            times_correct: 0,
        })
    }

    /// Text of the correct option.
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_answer]
    }

    /// Key under which a submission for this question is expected.
    pub fn answer_key(&self) -> String {
        format!("q_{}", self.id)
    }
}

/// Intermediate shape accepted from JSON files and LLM output.
///
/// Field aliases cover the spellings seen in generated output. An `id` that
/// is not a whole number (`"q1"`, `-3`) is treated as missing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u32>,
    #[serde(alias = "text")]
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "correct", alias = "answer")]
    pub correct_answer: AnswerKey,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub times_used: u32,
    #[serde(default)]
    pub times_correct: u32,
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let id = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(id.and_then(|n| u32::try_from(n).ok()))
}

impl TryFrom<RawQuestion> for Question {
    type Error = QuizError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let id = raw.id.unwrap_or(0);
        let count = raw.options.len();
        let options: [String; OPTION_COUNT] =
            raw.options
                .into_iter()
                .map(|o| o.trim().to_string())
                .collect::<Vec<_>>()
                .try_into()
                .map_err(|_| QuizError::InvalidQuestion {
                    id,
                    reason: format!("expected {OPTION_COUNT} options, found {count}"),
                })?;
        let correct_answer = raw.correct_answer.resolve(&options)?;

        let mut question = Question::new(
            id,
            raw.question.trim(),
            options,
            correct_answer,
            raw.explanation.trim(),
        )?;
        question.times_used = raw.times_used;
        question.times_correct = raw.times_correct;
        Ok(question)
    }
}

/// A correct-answer marker in any of the accepted encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerKey {
    /// Zero-based option index.
    Index(u64),
    /// Letter, literal option text, or a numeric string.
    Text(String),
}

impl AnswerKey {
    /// Map this marker onto a zero-based option index.
    pub fn resolve(&self, options: &[String; OPTION_COUNT]) -> Result<usize, QuizError> {
        match self {
            AnswerKey::Index(i) => usize::try_from(*i)
                .ok()
                .filter(|i| *i < OPTION_COUNT)
                .ok_or_else(|| QuizError::UnresolvableAnswerKey(i.to_string())),
            AnswerKey::Text(s) => resolve_option(options, s)
                .or_else(|| s.trim().parse::<usize>().ok().filter(|i| *i < OPTION_COUNT))
                .ok_or_else(|| QuizError::UnresolvableAnswerKey(s.clone())),
        }
    }
}

/// Resolve answer text to an option index by literal option text, then letter.
///
/// Numeric strings are never read as indices here, so "1" only matches an
/// option whose text is "1".
pub fn resolve_option(options: &[String; OPTION_COUNT], raw: &str) -> Option<usize> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    options
        .iter()
        .position(|o| o.trim() == value)
        .or_else(|| parse_letter(value))
}

/// Parse "B", "b", "B)" or "B." into an index.
fn parse_letter(value: &str) -> Option<usize> {
    let value = value.trim_end_matches([')', '.']);
    let mut chars = value.chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() {
        return None;
    }
    OPTION_LETTERS.iter().position(|l| *l == c)
}

/// A submitted answer as it arrives in a JSON body or form post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    /// A JSON number: zero-based option index.
    Index(u64),
    /// Option text or a letter.
    Text(String),
}

impl SubmittedAnswer {
    /// The option index this answer picks, if any.
    pub fn resolve(&self, options: &[String; OPTION_COUNT]) -> Option<usize> {
        match self {
            SubmittedAnswer::Index(i) => usize::try_from(*i).ok().filter(|i| *i < OPTION_COUNT),
            SubmittedAnswer::Text(s) => resolve_option(options, s),
        }
    }

    /// Blank text counts as no answer.
    pub fn is_blank(&self) -> bool {
        matches!(self, SubmittedAnswer::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for SubmittedAnswer {
    fn from(s: &str) -> Self {
        SubmittedAnswer::Text(s.to_string())
    }
}

impl fmt::Display for SubmittedAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmittedAnswer::Index(i) => write!(f, "{i}"),
            SubmittedAnswer::Text(s) => write!(f, "{s}"),
        }
    }
}

/// How a single answer was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    /// The answer did not match any option.
    Invalid,
    Unanswered,
}

impl fmt::Display for AnswerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerOutcome::Correct => write!(f, "correct"),
            AnswerOutcome::Incorrect => write!(f, "incorrect"),
            AnswerOutcome::Invalid => write!(f, "invalid"),
            AnswerOutcome::Unanswered => write!(f, "unanswered"),
        }
    }
}

/// Per-question grading feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub question_id: u32,
    pub question: String,
    /// The raw submitted answer, if any.
    pub user_answer: Option<String>,
    /// Text of the correct option.
    pub correct_answer: String,
    pub explanation: String,
    pub outcome: AnswerOutcome,
    pub is_correct: bool,
}

/// The scored outcome of a completed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: Uuid,
    pub date: DateTime<Utc>,
    /// Number of correct answers.
    pub score: u32,
    /// Number of questions in the test.
    pub total: u32,
    /// Number of questions with any submitted answer.
    pub answered: u32,
    /// `score / total * 100`.
    pub percentage: f64,
    pub feedback: Vec<Feedback>,
}

/// One quiz attempt: the questions served, the answers given, and the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: Uuid,
    /// Session that owns this test.
    pub owner: String,
    /// Snapshot of the questions served.
    pub questions: Vec<Question>,
    /// Submitted answers keyed by `q_{id}`.
    #[serde(default)]
    pub answers: BTreeMap<String, SubmittedAnswer>,
    #[serde(default)]
    pub result: Option<TestResult>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

impl Test {
    /// Start a new test for `owner` over the given questions.
    pub fn new(owner: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            questions,
            answers: BTreeMap::new(),
            result: None,
            started_at: Utc::now(),
            completed_at: None,
            completed: false,
        }
    }

    /// IDs of the questions in this test, in served order.
    pub fn question_ids(&self) -> Vec<u32> {
        self.questions.iter().map(|q| q.id).collect()
    }

    /// Record the answers, grade them, and mark the test completed.
    pub fn complete(
        &mut self,
        answers: BTreeMap<String, SubmittedAnswer>,
    ) -> Result<&TestResult, QuizError> {
        let result = crate::grader::grade(self, &answers)?;
        self.answers = answers;
        self.completed_at = Some(result.date);
        self.completed = true;
        Ok(self.result.insert(result))
    }
}
