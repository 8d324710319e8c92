//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use mathquiz_core::QuizError;

/// A handler failure rendered as a JSON error body.
///
/// Client-caused [`QuizError`]s become 400; everything else is logged and
/// reported as 500.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Response {
        json_error(StatusCode::BAD_REQUEST, message.into())
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0.downcast_ref::<QuizError>() {
            Some(e) if e.is_client_error() => json_error(StatusCode::BAD_REQUEST, e.to_string()),
            _ => {
                tracing::error!("request failed: {:#}", self.0);
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("An error occurred: {}", self.0),
                )
            }
        }
    }
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
