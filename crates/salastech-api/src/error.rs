//! API error handling: maps the core error taxonomy onto HTTP responses
//! as `{code, message, details}`, with an optional `details` payload for
//! conflict ids.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use salastech_core::{policy::PolicyViolation, Error as CoreError};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self { status, code: code.to_string(), message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} {} not found", entity, id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse { code: self.code, message: self.message, details: self.details };
        (self.status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", msg),
            CoreError::Unauthenticated(msg) => ApiError::unauthenticated(msg),
            CoreError::Forbidden(msg) => ApiError::forbidden(msg),
            CoreError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            CoreError::Conflict { conflicting_ids } => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", "reservation overlaps an existing booking")
                    .with_details(serde_json::json!({ "conflictingIds": conflicting_ids }))
            }
            CoreError::PolicyViolation(PolicyViolation::CrossDepartmentForbidden) => ApiError::new(
                StatusCode::FORBIDDEN,
                "CROSS_DEPARTMENT_FORBIDDEN",
                "room belongs to a different department",
            ),
            CoreError::PolicyViolation(v) => {
                let code = serde_json::to_value(v).ok().and_then(|j| j.as_str().map(str::to_string));
                ApiError::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &code.unwrap_or_else(|| "POLICY_VIOLATION".to_string()),
                    v.to_string(),
                )
            }
            CoreError::TerminalState => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "TERMINAL_STATE", "reservation is in a terminal state")
            }
            CoreError::DeadlineExceeded => {
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED", "request deadline exceeded")
            }
            CoreError::StorageUnavailable(msg) => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE", msg)
            }
            CoreError::Internal(msg) => {
                let correlation_id = uuid::Uuid::new_v4();
                tracing::error!(%correlation_id, error = %msg, "internal error");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", format!("internal error ({correlation_id})"))
            }
        }
    }
}

impl From<salastech_auth::SessionError> for ApiError {
    fn from(e: salastech_auth::SessionError) -> Self {
        CoreError::from(e).into()
    }
}

impl From<salastech_db::DbError> for ApiError {
    fn from(e: salastech_db::DbError) -> Self {
        CoreError::from(e).into()
    }
}
