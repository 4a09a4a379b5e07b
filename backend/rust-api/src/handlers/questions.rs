use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::ApiError;
use crate::{
    models::{
        params::WidgetParams, EditRequest, OpenQuestionRequest, OpenQuestionResponse, StateKey,
        SubmitResponse,
    },
    services::{driver::SessionHandle, AppState},
};

/// POST /api/v1/questions
pub async fn open_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OpenQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        "Opening question for user_id={}, content_id={}",
        req.user_id,
        req.content_id
    );

    if req.user_id.trim().is_empty() || req.content_id.trim().is_empty() {
        return Err(ApiError::bad_request("user_id and content_id are required"));
    }

    let params = match req.params {
        Some(value) => {
            WidgetParams::from_json(value).map_err(|e| ApiError::bad_request(e.to_string()))?
        }
        None => WidgetParams::default(),
    };

    let key = StateKey {
        user_id: req.user_id,
        content_id: req.content_id,
    };
    let (session_id, handle) = state.open_session(key, params, req.previous_state).await?;
    let view = handle.view().await?;

    Ok((
        StatusCode::CREATED,
        Json(OpenQuestionResponse {
            session_id: session_id.to_string(),
            view,
        }),
    ))
}

/// GET /api/v1/questions/{id}
pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_session(&state, &session_id).await?;
    Ok(Json(handle.view().await?))
}

/// POST /api/v1/questions/{id}/edit
pub async fn edit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<EditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.text.len() > state.config.max_answer_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "Answer exceeds {} bytes",
            state.config.max_answer_bytes
        )));
    }

    let handle = find_session(&state, &session_id).await?;
    Ok(Json(handle.edit(req.text).await?))
}

/// POST /api/v1/questions/{id}/blur
pub async fn blur_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_session(&state, &session_id).await?;
    Ok(Json(handle.blur().await?))
}

/// POST /api/v1/questions/{id}/submit
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Submit clicked for session: {}", session_id);

    let handle = find_session(&state, &session_id).await?;
    let (outcome, view) = handle.submit().await?;
    Ok(Json(SubmitResponse { outcome, view }))
}

/// POST /api/v1/questions/{id}/show-question
pub async fn show_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_session(&state, &session_id).await?;
    Ok(Json(handle.show_question().await?))
}

/// POST /api/v1/questions/{id}/show-answer
pub async fn show_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_session(&state, &session_id).await?;
    Ok(Json(handle.show_answer().await?))
}

/// GET /api/v1/questions/{id}/xapi
pub async fn get_xapi_data(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_session(&state, &session_id).await?;
    Ok(Json(handle.xapi_data().await?))
}

/// GET /api/v1/questions/{id}/state
pub async fn get_persisted_state(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_session(&state, &session_id).await?;
    Ok(Json(handle.persisted_state().await?))
}

/// DELETE /api/v1/questions/{id}
pub async fn close_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Closing session: {}", session_id);

    let id = parse_session_id(&session_id)?;
    let handle = state
        .remove_session(&id)
        .await
        .ok_or_else(|| ApiError::not_found("Session not found"))?;
    let persisted = handle.close().await?;

    Ok(Json(json!({ "state": persisted })))
}

fn parse_session_id(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::bad_request("Invalid session id: must be UUID"))
}

pub(super) async fn find_session(
    state: &AppState,
    session_id: &str,
) -> Result<SessionHandle, ApiError> {
    let id = parse_session_id(session_id)?;
    state
        .session(&id)
        .await
        .ok_or_else(|| ApiError::not_found("Session not found"))
}
