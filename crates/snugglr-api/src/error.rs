use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures surfaced to clients. Uniqueness conflicts never appear here:
/// the storage layer resolves them internally (a duplicate like is a
/// no-op, a lost chat-creation race fetches the winner).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    /// Also covers entities that exist but belong to another institution;
    /// the two cases are deliberately indistinguishable to the caller.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidInput(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ApiError::Internal(e) => {
                // Log the detail, return a generic message
                error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                ApiError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ApiError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err = ApiError::Internal(anyhow::anyhow!("connection string leaked"));
        assert_eq!(err.to_string(), "internal server error");
    }
}
