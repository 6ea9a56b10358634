//! Application error taxonomy.
//!
//! Authorization failures are resolved at the context-builder/scoping
//! boundary; the HTTP layer only maps the variants below to status codes.
//! Error bodies are stable and never carry another tenant's data.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No, expired, or invalid session.
    #[error("unauthenticated")]
    Unauthenticated,
    /// Authenticated but lacking the required membership or admin grant.
    #[error("forbidden")]
    Forbidden,
    /// Target organization exists but the user holds no membership there.
    #[error("not a member of the target organization")]
    NotMember,
    /// Target organization is suspended.
    #[error("organization is not active")]
    OrgInactive,
    #[error("organization not found")]
    OrgNotFound,
    /// The stored active-organization pointer no longer matches a membership.
    /// Surfaced distinctly so callers force re-selection instead of leaking
    /// data from an unintended tenant.
    #[error("active organization requires re-selection")]
    OrphanedActiveOrg,
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// A privileged mutation could not be audited; the enclosing transaction
    /// must abort.
    #[error("audit write failed: {0}")]
    AuditWriteFailure(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the HTTP layer and clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotMember => "NOT_MEMBER",
            AppError::OrgInactive => "ORG_INACTIVE",
            AppError::OrgNotFound => "ORG_NOT_FOUND",
            AppError::OrphanedActiveOrg => "ORPHANED_ACTIVE_ORG",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::AuditWriteFailure(_) => "AUDIT_WRITE_FAILURE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::NotMember => StatusCode::FORBIDDEN,
            AppError::OrgInactive
            | AppError::OrphanedActiveOrg
            | AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::OrgNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuditWriteFailure(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the logs, not the response body.
        let message = match &self {
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "Internal server error".to_string()
            }
            AppError::AuditWriteFailure(msg) => {
                tracing::error!(error = %msg, "audit write failure");
                "Audit write failed".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": { "code": self.code(), "message": message }
        }));
        (status, body).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Internal(format!("database error: {err}"))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Internal(format!("connection pool error: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization error: {err}"))
    }
}
