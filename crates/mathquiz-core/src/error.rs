//! Quiz error types.
//!
//! Expected failure conditions of the quiz logic. Callers at the HTTP and
//! CLI edges downcast these to decide between a redirect, a 400, or a hard
//! failure without string matching.

use thiserror::Error;

/// Errors produced by the quiz model and its operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    /// A test with zero questions cannot be scored.
    #[error("cannot grade a test with no questions")]
    EmptyTest,

    /// A question failed structural validation.
    #[error("invalid question {id}: {reason}")]
    InvalidQuestion { id: u32, reason: String },

    /// A correct-answer marker could not be mapped onto the options.
    #[error("correct answer {0:?} does not match any option")]
    UnresolvableAnswerKey(String),

    /// Generated output could not be turned into questions.
    #[error("malformed question response: {0}")]
    MalformedResponse(String),

    /// Submission arrived without a started test.
    #[error("no test in progress, start a new test")]
    NoTestInProgress,

    /// History lookup outside the stored range.
    #[error("history index {index} out of range (have {len})")]
    HistoryIndexOutOfRange { index: usize, len: usize },
}

impl QuizError {
    /// Returns `true` if the error was caused by the client's request rather
    /// than by the server or its data.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QuizError::EmptyTest
                | QuizError::NoTestInProgress
                | QuizError::HistoryIndexOutOfRange { .. }
        )
    }
}
