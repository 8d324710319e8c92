//! mathquiz-server — the quiz web application.
//!
//! An axum router over a [`QuizStore`] and a [`QuestionGenerator`]. Sessions
//! are identified by a cookie; all state lives in the store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;

use mathquiz_core::generator::QuestionGenerator;
use mathquiz_core::traits::QuizStore;
use mathquiz_providers::config::{create_generator, StorageBackend};
use mathquiz_providers::MathquizConfig;
use mathquiz_store::{JsonFileStore, MemoryStore, Retention};

pub mod error;
pub mod handlers;
pub mod session;

pub use error::AppError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QuizStore>,
    pub generator: Arc<QuestionGenerator>,
    pub questions_per_test: usize,
    /// Ask the generator for new questions each time a test starts.
    pub refresh_on_start: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn QuizStore>, generator: QuestionGenerator) -> Self {
        Self {
            store,
            generator: Arc::new(generator),
            questions_per_test: mathquiz_core::selector::DEFAULT_QUESTIONS_PER_TEST,
            refresh_on_start: false,
        }
    }

    /// Build the store and generator described by `config`.
    pub async fn from_config(config: &MathquizConfig) -> Result<Self> {
        let retention = Retention {
            idle_timeout: config.session_idle_timeout(),
            max_sessions: config.max_sessions,
        };
        let store: Arc<dyn QuizStore> = match config.storage {
            StorageBackend::Json => Arc::new(
                JsonFileStore::open(&config.data_dir, config.history_limit)
                    .await
                    .context("failed to open JSON store")?
                    .with_retention(retention),
            ),
            StorageBackend::Memory => {
                Arc::new(MemoryStore::new(config.history_limit).with_retention(retention))
            }
        };
        let generator = create_generator(config)?;

        Ok(Self {
            store,
            generator: Arc::new(generator),
            questions_per_test: config.questions_per_test,
            refresh_on_start: config.generation.enabled && config.generation.refresh_on_start,
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/start_test", get(handlers::start_test))
        .route("/submit_test", post(handlers::submit_test))
        .route("/results", get(handlers::results))
        .route("/view_test_result", post(handlers::view_test_result))
        .route("/history", get(handlers::history))
        .fallback(handlers::not_found)
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid bind address: {addr}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        store = state.store.name(),
        generation = state.generator.is_enabled(),
        "server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
