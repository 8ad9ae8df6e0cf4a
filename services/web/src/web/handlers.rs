//! services/web/src/web/handlers.rs
//!
//! Contains the Axum handlers for the three pages. Each handler resolves the
//! caller's session from the cookie, applies one transition and renders the
//! resulting page.

use crate::web::{pages, state::AppState};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use show_tell_core::domain::Session;
use show_tell_core::flow::{FlowError, StoryInput};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "story_session";

const NO_SESSION: &str = "Your session has expired. Please enter your story again.";

//=========================================================================================
// Form Payloads
//=========================================================================================

#[derive(Deserialize, Debug, Default)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub story: String,
}

impl From<AnalyzeForm> for StoryInput {
    fn from(form: AnalyzeForm) -> Self {
        StoryInput {
            name: form.name,
            email: form.email,
            title: form.title,
            story: form.story,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct SubmitForm {
    #[serde(default)]
    pub reflection: String,
    pub comments: Option<String>,
}

//=========================================================================================
// Session Cookie Helpers
//=========================================================================================

/// Reads the session id from the `Cookie` header, if present and well formed.
fn session_id_from(headers: &HeaderMap) -> Option<Uuid> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix(prefix.as_str()))
        .and_then(|id| Uuid::parse_str(id).ok())
}

/// Wraps a rendered page, attaching the session cookie for new sessions.
fn respond(status: StatusCode, body: String, new_session: Option<Uuid>) -> Response {
    let mut response = (status, Html(body)).into_response();
    if let Some(id) = new_session {
        let cookie = format!("{}={}; HttpOnly; SameSite=Lax; Path=/", SESSION_COOKIE, id);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => error!("Failed to build session cookie: {:?}", e),
        }
    }
    response
}

/// Maps a refused transition onto a status code and the page to show.
fn flow_error_response(
    session: &Session,
    err: &FlowError,
    new_session: Option<Uuid>,
) -> Response {
    match err {
        FlowError::Fatal(message) => {
            error!(session_id = %session.id, "Analysis aborted: {}", message);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                pages::fatal_page(&err.to_string()),
                new_session,
            )
        }
        FlowError::Validation(_) => respond(
            StatusCode::UNPROCESSABLE_ENTITY,
            pages::page_for(session, Some(&err.to_string())),
            new_session,
        ),
        FlowError::WrongStage { .. } | FlowError::UnknownSentence(_) => {
            warn!(session_id = %session.id, "Refused transition: {}", err);
            respond(
                StatusCode::CONFLICT,
                pages::page_for(session, Some(&err.to_string())),
                new_session,
            )
        }
    }
}

/// Answers a Review or Reflection action that arrived without a live session.
fn no_session_response() -> Response {
    warn!("Refused action without a live session");
    respond(
        StatusCode::CONFLICT,
        pages::input_page(&StoryInput::default(), Some(NO_SESSION)),
        None,
    )
}

//=========================================================================================
// Page Handlers
//=========================================================================================

/// GET / - Render the page for the caller's current stage.
///
/// Visitors without a live session see an empty input page; no session is
/// registered until they submit it.
pub async fn show_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let body = match state.sessions.get(session_id_from(&headers)) {
        Some(handle) => {
            let session = handle.lock().await;
            pages::page_for(&session, None)
        }
        None => pages::input_page(&StoryInput::default(), None),
    };
    respond(StatusCode::OK, body, None)
}

/// POST /analyze - Input -> Review.
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<AnalyzeForm>,
) -> Response {
    let (id, handle, created) = state.sessions.get_or_create(session_id_from(&headers));
    if created {
        info!(session_id = %id, live_sessions = state.sessions.live_count(), "Session started");
    }
    let new_session = created.then_some(id);
    let mut session = handle.lock().await;

    let input = StoryInput::from(form);
    match state.flow.analyze(&mut session, input.clone()).await {
        Ok(()) => respond(StatusCode::OK, pages::review_page(&session, None), new_session),
        Err(err @ FlowError::Validation(_)) => respond(
            StatusCode::UNPROCESSABLE_ENTITY,
            pages::input_page(&input, Some(&err.to_string())),
            new_session,
        ),
        Err(err) => flow_error_response(&session, &err, new_session),
    }
}

/// POST /review - Save agreement flags and comments; `action=next` advances to Reflection.
///
/// Checkboxes arrive as `agree_<index>=on`; an absent box means "not agreed".
pub async fn review_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let Some(handle) = state.sessions.get(session_id_from(&headers)) else {
        return no_session_response();
    };
    let mut session = handle.lock().await;

    match apply_review(&state, &mut session, &fields) {
        Ok(()) => respond(StatusCode::OK, pages::page_for(&session, None), None),
        Err(err) => flow_error_response(&session, &err, None),
    }
}

fn apply_review(
    state: &AppState,
    session: &mut Session,
    fields: &HashMap<String, String>,
) -> Result<(), FlowError> {
    for index in 0..session.verdicts.len() {
        let agreed = fields.contains_key(&format!("agree_{}", index));
        state.flow.set_agreement(session, index, agreed)?;
    }
    if let Some(comments) = fields.get("comments") {
        state.flow.set_comments(session, comments)?;
    }
    if fields.get("action").map(String::as_str) == Some("next") {
        state.flow.advance_to_reflection(session)?;
    }
    Ok(())
}

/// POST /submit - Store the record, send the email and acknowledge.
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<SubmitForm>,
) -> Response {
    let Some(handle) = state.sessions.get(session_id_from(&headers)) else {
        return no_session_response();
    };
    let mut session = handle.lock().await;

    if let Some(comments) = &form.comments {
        if let Err(err) = state.flow.set_comments(&mut session, comments) {
            return flow_error_response(&session, &err, None);
        }
    }

    match state.flow.submit(&mut session, &form.reflection).await {
        Ok(report) => respond(
            StatusCode::OK,
            pages::reflection_page(&session, Some(&report), None),
            None,
        ),
        Err(err) => flow_error_response(&session, &err, None),
    }
}

/// POST /restart - Discard the session and return to the input page.
pub async fn restart_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(handle) = state.sessions.get(session_id_from(&headers)) {
        state.flow.restart(&mut *handle.lock().await);
    }
    respond(StatusCode::OK, pages::input_page(&StoryInput::default(), None), None)
}
