use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use std::time::Duration;
use tracing::{info, warn};

use crate::api::rest::dto::{
    AddColumnReq, AddTaskReq, BoardViewDto, CreatedDto, SignInReq, SignInResp, UserDto,
};
use crate::api::rest::error::ProblemResponse;
use crate::api::rest::sessions::{BearerToken, CurrentSession, SessionRegistry};
use crate::api::rest::sse::board_view_events;
use crate::contract::model::DocumentId;
use crate::domain::ports::Credential;

/// SSE keepalive interval, installed as an extension by the router.
#[derive(Debug, Clone, Copy)]
pub struct SseSettings {
    pub keepalive: Duration,
}

/// Sign in and open the user's board
pub async fn sign_in(
    Extension(sessions): Extension<SessionRegistry>,
    Json(req): Json<SignInReq>,
) -> Result<Json<SignInResp>, ProblemResponse> {
    info!(user_id = %req.user_id, "Signing in");
    let (session, user) = sessions.sign_in(&Credential::new(req.user_id)).await?;
    Ok(Json(SignInResp {
        session,
        user: UserDto::from(user),
    }))
}

/// Close the board and end the session; unknown tokens succeed too
pub async fn sign_out(
    Extension(sessions): Extension<SessionRegistry>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, ProblemResponse> {
    info!("Signing out");
    sessions.sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current board view
pub async fn get_board(CurrentSession(session): CurrentSession) -> Json<BoardViewDto> {
    Json(BoardViewDto::from(&session.view()))
}

/// Live board view as server-sent events
pub async fn board_events(
    Extension(settings): Extension<SseSettings>,
    CurrentSession(session): CurrentSession,
) -> impl IntoResponse {
    info!(user_id = ?session.user_id(), "Board event stream opened");
    board_view_events(session.watch(), settings.keepalive)
}

pub async fn add_column(
    CurrentSession(session): CurrentSession,
    Json(req): Json<AddColumnReq>,
) -> Result<(StatusCode, Json<CreatedDto>), ProblemResponse> {
    let user = session.user_id();
    let id = session
        .mutations()
        .try_add_column(user.as_ref(), &req.title)
        .await
        .inspect_err(|e| warn!(error = %e, "Add column rejected"))?;
    Ok((StatusCode::ACCEPTED, Json(CreatedDto { id: id.to_string() })))
}

/// Delete a column and all of its tasks
pub async fn delete_column(
    CurrentSession(session): CurrentSession,
    Path(column_id): Path<String>,
) -> Result<StatusCode, ProblemResponse> {
    let user = session.user_id();
    session
        .mutations()
        .try_delete_column(user.as_ref(), &DocumentId::new(column_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_task(
    CurrentSession(session): CurrentSession,
    Path(column_id): Path<String>,
    Json(req): Json<AddTaskReq>,
) -> Result<(StatusCode, Json<CreatedDto>), ProblemResponse> {
    let user = session.user_id();
    let id = session
        .mutations()
        .try_add_task(user.as_ref(), &DocumentId::new(column_id), &req.text)
        .await
        .inspect_err(|e| warn!(error = %e, "Add task rejected"))?;
    Ok((StatusCode::ACCEPTED, Json(CreatedDto { id: id.to_string() })))
}

pub async fn delete_task(
    CurrentSession(session): CurrentSession,
    Path((column_id, task_id)): Path<(String, String)>,
) -> Result<StatusCode, ProblemResponse> {
    let user = session.user_id();
    session
        .mutations()
        .try_delete_task(
            user.as_ref(),
            &DocumentId::new(column_id),
            &DocumentId::new(task_id),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
