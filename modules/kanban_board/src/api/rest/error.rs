use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::error::{AuthError, DomainError};

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// RFC 9457 Problem Details for HTTP APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// Machine-readable error code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            code: String::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

/// Axum response wrapper that renders `Problem` with correct status & content type.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl From<Problem> for ProblemResponse {
    fn from(p: Problem) -> Self {
        Self(p)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = axum::Json(self.0).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

pub fn bad_request(detail: impl Into<String>) -> ProblemResponse {
    Problem::new(StatusCode::BAD_REQUEST, "Bad Request", detail).into()
}

pub fn unauthorized(detail: impl Into<String>) -> ProblemResponse {
    Problem::new(StatusCode::UNAUTHORIZED, "Unauthorized", detail).into()
}

pub fn internal_error(detail: impl Into<String>) -> ProblemResponse {
    Problem::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        detail,
    )
    .into()
}

impl From<DomainError> for ProblemResponse {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::EmptyColumnTitle => {
                bad_request(e.to_string()).with_code("EMPTY_COLUMN_TITLE")
            }
            DomainError::EmptyTaskText => bad_request(e.to_string()).with_code("EMPTY_TASK_TEXT"),
            DomainError::Unauthenticated => unauthorized(e.to_string()).with_code("UNAUTHENTICATED"),
            DomainError::Auth(AuthError::Rejected { .. }) => {
                unauthorized(e.to_string()).with_code("SIGN_IN_REJECTED")
            }
            DomainError::Auth(AuthError::Unavailable { .. }) => Problem::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service Unavailable",
                e.to_string(),
            )
            .with_code("IDENTITY_UNAVAILABLE")
            .into(),
            DomainError::Write { .. } | DomainError::Read { .. } if e.is_invalid_id() => {
                bad_request("Column or task id is not valid").with_code("INVALID_ID")
            }
            DomainError::Write { .. } | DomainError::Read { .. } => {
                error!(error = %e, "store operation failed");
                internal_error("The board store could not complete the operation")
                    .with_code("STORE_FAILURE")
            }
        }
    }
}

impl ProblemResponse {
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.0 = self.0.with_code(code);
        self
    }
}
