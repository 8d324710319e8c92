//! Route handlers.

use std::collections::BTreeMap;

use axum::extract::rejection::FormRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use tower_cookies::Cookies;

use mathquiz_core::bank::fallback_questions;
use mathquiz_core::generator::{merge_into_pool, QuestionOrigin};
use mathquiz_core::model::{SubmittedAnswer, Test, TestResult};
use mathquiz_core::selector::select_questions;
use mathquiz_core::statistics::summarize_history;
use mathquiz_core::QuizError;
use mathquiz_report::{render_index, render_not_found, render_results, render_test, IndexPage};

use crate::error::AppError;
use crate::session::{session_id, set_flash, take_flash, Flash};
use crate::AppState;

pub async fn index(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let owner = session_id(&cookies);
    let history = state.store.history(&owner).await?;
    let summary = summarize_history(&history);

    Ok(Html(render_index(&IndexPage {
        history: &history,
        summary: &summary,
        flash: take_flash(&cookies),
        questions_per_test: state.questions_per_test,
    })))
}

pub async fn start_test(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    let owner = session_id(&cookies);

    if state.refresh_on_start && state.generator.is_enabled() {
        refresh_pool(&state).await?;
    }

    let mut pool = state.store.questions().await?;
    if pool.is_empty() {
        tracing::warn!("question pool is empty, restoring fallback questions");
        pool = fallback_questions();
        state.store.replace_questions(pool.clone()).await?;
    }

    let previous = state.store.previous_question_ids(&owner).await?;
    let questions = {
        let mut rng = rand::thread_rng();
        select_questions(&pool, &previous, state.questions_per_test, &mut rng)
    };

    let test = Test::new(owner, questions);
    tracing::info!(
        owner = %test.owner,
        test_id = %test.id,
        questions = ?test.question_ids(),
        "test started"
    );
    state.store.begin_test(test.clone()).await?;

    Ok(Html(render_test(&test, take_flash(&cookies))).into_response())
}

/// Merge freshly generated questions into the stored pool.
async fn refresh_pool(state: &AppState) -> Result<(), AppError> {
    let generated = state.generator.generate().await;
    if generated.origin == QuestionOrigin::Fallback {
        return Ok(());
    }

    let mut pool = state.store.questions().await?;
    let added = merge_into_pool(&mut pool, generated.questions);
    if added > 0 {
        tracing::info!(added, pool = pool.len(), "question pool refreshed");
        state.store.replace_questions(pool).await?;
    }
    Ok(())
}

/// JSON submission body: `{"answers": {"q_1": "5", "q_2": 1, "q_3": null}}`.
///
/// Strings name an option or a letter, numbers are option indices and
/// `null` leaves the question unanswered.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    #[serde(default)]
    pub answers: BTreeMap<String, Option<SubmittedAnswer>>,
}

/// Grade the test in progress.
///
/// JSON bodies get the result back as JSON. Form posts from the test page
/// are redirected to `/results`.
pub async fn submit_test(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request,
) -> Result<Response, AppError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let answers = match Form::<BTreeMap<String, String>>::from_request(request, &state).await {
            Ok(Form(answers)) => answers
                .into_iter()
                .map(|(key, answer)| (key, SubmittedAnswer::Text(answer)))
                .collect(),
            Err(_) => return Ok(AppError::bad_request("No data received")),
        };
        let owner = session_id(&cookies);
        return match complete(&state, &owner, answers).await? {
            Some(_) => Ok(Redirect::to("/results").into_response()),
            None => {
                set_flash(&cookies, Flash::NoTestInProgress);
                Ok(Redirect::to("/start_test").into_response())
            }
        };
    }

    if !content_type.starts_with("application/json") {
        return Ok(AppError::bad_request("No data received"));
    }
    let body = match Json::<SubmitBody>::from_request(request, &state).await {
        Ok(Json(body)) => body,
        Err(e) => {
            tracing::debug!("rejected submission body: {e}");
            return Ok(AppError::bad_request("No data received"));
        }
    };

    let answers = body
        .answers
        .into_iter()
        .filter_map(|(key, answer)| answer.map(|a| (key, a)))
        .collect();
    let owner = session_id(&cookies);
    match complete(&state, &owner, answers).await? {
        Some(result) => Ok(Json(result).into_response()),
        None => Ok(AppError::bad_request(Flash::NoTestInProgress.message())),
    }
}

/// Complete the owner's test; `None` when no test was started.
async fn complete(
    state: &AppState,
    owner: &str,
    answers: BTreeMap<String, SubmittedAnswer>,
) -> Result<Option<TestResult>, AppError> {
    match state.store.complete_test(owner, answers).await {
        Ok(result) => Ok(Some(result)),
        Err(e) if e.downcast_ref::<QuizError>() == Some(&QuizError::NoTestInProgress) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn results(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    let owner = session_id(&cookies);
    match state.store.selected_result(&owner).await? {
        Some(result) => Ok(Html(render_results(&result, take_flash(&cookies))).into_response()),
        None => {
            set_flash(&cookies, Flash::NoResults);
            Ok(Redirect::to("/start_test").into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ViewForm {
    pub test_index: Option<String>,
}

pub async fn view_test_result(
    State(state): State<AppState>,
    cookies: Cookies,
    form: Result<Form<ViewForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    let owner = session_id(&cookies);
    let back = |flash: Flash| {
        set_flash(&cookies, flash);
        Redirect::to("/")
    };

    let Some(raw) = form.ok().and_then(|Form(f)| f.test_index) else {
        return Ok(back(Flash::NoTestIndex));
    };

    let history = state.store.history(&owner).await?;
    if history.is_empty() {
        return Ok(back(Flash::NoHistory));
    }

    let Ok(index) = raw.trim().parse::<i64>() else {
        return Ok(back(Flash::InvalidTestIndexFormat));
    };
    let Ok(index) = usize::try_from(index) else {
        return Ok(back(Flash::InvalidTestIndex));
    };

    match state.store.select_result(&owner, index).await {
        Ok(_) => Ok(Redirect::to("/results")),
        Err(e) if matches!(
            e.downcast_ref::<QuizError>(),
            Some(QuizError::HistoryIndexOutOfRange { .. })
        ) =>
        {
            Ok(back(Flash::InvalidTestIndex))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn history(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<Vec<TestResult>>, AppError> {
    let owner = session_id(&cookies);
    Ok(Json(state.store.history(&owner).await?))
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(render_not_found(uri.path())))
}
