//! mathquiz-core — Question model, selection, grading, and history.
//!
//! This crate defines the data model, traits, and quiz logic that the rest
//! of the mathquiz workspace builds on.

pub mod bank;
pub mod error;
pub mod generator;
pub mod grader;
pub mod history;
pub mod model;
pub mod parser;
pub mod selector;
pub mod statistics;
pub mod traits;

pub use error::QuizError;
