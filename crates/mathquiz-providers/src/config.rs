//! Application configuration and provider factory.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mathquiz_core::generator::{GeneratorConfig, QuestionGenerator};
use mathquiz_core::history::HISTORY_LIMIT;
use mathquiz_core::selector::DEFAULT_QUESTIONS_PER_TEST;
use mathquiz_core::traits::LlmProvider;

use crate::anthropic::AnthropicProvider;
use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single LLM provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    /// Canned responses, for demos and offline runs.
    Mock {
        #[serde(default)]
        response: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock { response, error } => f
                .debug_struct("Mock")
                .field("response", response)
                .field("error", error)
                .finish(),
        }
    }
}

/// Where tests, history and the question pool are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `questions.json` and `tests.json` under `data_dir`.
    Json,
    /// Process memory; lost on restart.
    Memory,
}

/// Remote question generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Whether to call a provider at all.
    #[serde(default)]
    pub enabled: bool,
    /// Name of the entry in `[providers]` to use.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Questions to request per call.
    #[serde(default = "default_generate_count")]
    pub count: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Student level named in the prompt.
    #[serde(default = "default_level")]
    pub level: String,
    /// Refresh the question pool each time a test starts.
    #[serde(default)]
    pub refresh_on_start: bool,
    /// Replaces the built-in system prompt sent with each request.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            count: default_generate_count(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            level: default_level(),
            refresh_on_start: false,
            system_prompt: None,
        }
    }
}

impl GenerationSettings {
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            model: self.model.clone(),
            count: self.count,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            level: self.level.clone(),
            system_prompt_override: self.system_prompt.clone(),
        }
    }
}

/// Top-level mathquiz configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathquizConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Address the web server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Questions served per test.
    #[serde(default = "default_questions_per_test")]
    pub questions_per_test: usize,
    /// Results kept per session (at most 5).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,
    /// Directory holding `questions.json` and `tests.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Hours of inactivity after which a session's state may be dropped.
    #[serde(default = "default_session_idle_hours")]
    pub session_idle_hours: u64,
    /// Sessions kept at most; the least recently active are dropped first.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default)]
    pub generation: GenerationSettings,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_generate_count() -> usize {
    10
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_level() -> String {
    "Year 7".to_string()
}
fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}
fn default_questions_per_test() -> usize {
    DEFAULT_QUESTIONS_PER_TEST
}
fn default_history_limit() -> usize {
    HISTORY_LIMIT
}
fn default_storage() -> StorageBackend {
    StorageBackend::Json
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_session_idle_hours() -> u64 {
    24
}
fn default_max_sessions() -> usize {
    10_000
}

impl Default for MathquizConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            bind: default_bind(),
            questions_per_test: default_questions_per_test(),
            history_limit: default_history_limit(),
            storage: default_storage(),
            data_dir: default_data_dir(),
            session_idle_hours: default_session_idle_hours(),
            max_sessions: default_max_sessions(),
            generation: GenerationSettings::default(),
        }
    }
}

impl MathquizConfig {
    /// Check values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.questions_per_test >= 1,
            "questions_per_test must be at least 1"
        );
        anyhow::ensure!(
            (1..=HISTORY_LIMIT).contains(&self.history_limit),
            "history_limit must be between 1 and {HISTORY_LIMIT}"
        );
        anyhow::ensure!(
            (0.0..=2.0).contains(&self.generation.temperature),
            "generation.temperature must be between 0.0 and 2.0"
        );
        anyhow::ensure!(self.generation.count >= 1, "generation.count must be at least 1");
        anyhow::ensure!(self.max_sessions >= 1, "max_sessions must be at least 1");
        Ok(())
    }

    /// `session_idle_hours` as a duration.
    pub fn session_idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_idle_hours.saturating_mul(60 * 60))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::Mock { .. } => config.clone(),
    }
}

/// Replace the port of a `host:port` bind address.
fn with_port(bind: &str, port: &str) -> String {
    match bind.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{bind}:{port}"),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mathquiz.toml` in the current directory
/// 2. `~/.config/mathquiz/config.toml`
///
/// Environment variable overrides: `MATHQUIZ_OPENAI_KEY`,
/// `MATHQUIZ_ANTHROPIC_KEY`, `PORT`.
pub fn load_config() -> Result<MathquizConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MathquizConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("mathquiz.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MathquizConfig::default(),
    };

    apply_env_overrides(&mut config);
    tracing::debug!(path = ?config_path, "configuration loaded");
    Ok(config)
}

/// Parse a TOML config string and resolve `${VAR}` references.
pub fn parse_config_str(content: &str) -> Result<MathquizConfig> {
    let mut config = toml::from_str::<MathquizConfig>(content)?;
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    Ok(config)
}

fn apply_env_overrides(config: &mut MathquizConfig) {
    if let Ok(key) = std::env::var("MATHQUIZ_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("MATHQUIZ_ANTHROPIC_KEY") {
        let entry = config
            .providers
            .entry("anthropic".into())
            .or_insert(ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Anthropic { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(port) = std::env::var("PORT") {
        if port.parse::<u16>().is_ok() {
            config.bind = with_port(&config.bind, &port);
        } else {
            tracing::warn!("ignoring invalid PORT value: {port}");
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mathquiz"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    let provider: Box<dyn LlmProvider> = match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Box::new(OpenAiProvider::new(api_key, base_url.clone(), org_id.clone())?),
        ProviderConfig::Anthropic { api_key, base_url } => {
            Box::new(AnthropicProvider::new(api_key, base_url.clone())?)
        }
        ProviderConfig::Mock { response, error } => match error {
            Some(message) => Box::new(MockProvider::failing(message)),
            None => Box::new(MockProvider::with_fixed_response(
                response.as_deref().unwrap_or("[]"),
            )),
        },
    };
    tracing::debug!(name, provider = provider.name(), "provider created");
    Ok(provider)
}

/// Build the question generator described by `[generation]`.
///
/// Generation that is disabled, or that names a provider missing from
/// `[providers]`, yields a generator that always serves the fallback bank.
pub fn create_generator(config: &MathquizConfig) -> Result<QuestionGenerator> {
    let settings = &config.generation;
    if !settings.enabled {
        return Ok(QuestionGenerator::new(None, settings.generator_config()));
    }

    let Some(provider_config) = config.providers.get(&settings.provider) else {
        tracing::warn!(
            "generation provider '{}' is not configured, using fallback questions",
            settings.provider
        );
        return Ok(QuestionGenerator::new(None, settings.generator_config()));
    };

    let provider: Arc<dyn LlmProvider> =
        Arc::from(create_provider(&settings.provider, provider_config)?);
    Ok(QuestionGenerator::new(
        Some(provider),
        settings.generator_config(),
    ))
}
