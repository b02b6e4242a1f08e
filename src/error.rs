//! Error taxonomy shared by the HTTP layer and the store adapters.
//!
//! Every failure a client can observe maps to one `ApiError` variant; the
//! response body is always `{"error": "<message>"}`. Internal detail stays
//! in the server log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, or expired credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the caller does not own the target resource.
    #[error("Unauthorized access to user data")]
    Forbidden,

    /// Field-level validation failure.
    #[error("{message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    /// Entity id does not exist in the store.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate budget for the same (month, category).
    #[error("Budget already exists for this category and month")]
    Conflict,

    /// Store or identity provider timed out or is down; safe to retry.
    #[error("Service temporarily unavailable")]
    Unavailable,

    /// Unexpected failure; detail is logged, not returned.
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            // Duplicate budgets respond 400, not 409; clients treat the
            // duplicate as a validation failure.
            Self::InvalidInput { .. } | Self::Conflict => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout | StoreError::Unavailable(_) => {
                tracing::warn!("store unavailable: {}", err);
                Self::Unavailable
            }
            StoreError::Backend(detail) => {
                tracing::error!("store backend error: {}", detail);
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            ApiError::Unauthorized("missing header".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::invalid("amount", "Amount must be positive").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("Budget").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Unavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err: ApiError = StoreError::Backend("disk I/O error at /var/db".into()).into();
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(ApiError::NotFound("Budget").to_string(), "Budget not found");
    }
}
