//! mathquiz-providers — LLM provider integrations.
//!
//! Implements the `LlmProvider` trait for OpenAI-compatible chat completion
//! APIs and Anthropic, and loads the `mathquiz.toml` configuration.

pub mod anthropic;
pub mod config;
pub mod error;
pub mod mock;
pub mod openai;

pub use config::{create_provider, load_config, MathquizConfig, ProviderConfig};
pub use error::ProviderError;
