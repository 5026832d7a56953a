//! Error types for fftt-licence
//!
//! An unknown licence keeps answering 400 as existing front-ends expect.
//! Registry and network failures are reported as gateway errors instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fftt_common::LookupError;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Registry lookup failed (400, 502 or 504)
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Lookup(LookupError::NotFound { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Lookup(LookupError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Lookup(
                LookupError::Rejected(_)
                | LookupError::Transport(_)
                | LookupError::MalformedResponse(_),
            ) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Lookup(LookupError::NotFound {
                    licence: "1".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::BadRequest("empty".into()), StatusCode::BAD_REQUEST),
            (ApiError::Lookup(LookupError::Timeout), StatusCode::GATEWAY_TIMEOUT),
            (
                ApiError::Lookup(LookupError::Transport("refused".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Lookup(LookupError::MalformedResponse("eof".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Lookup(LookupError::Rejected("Compte incorrect".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{}", err);
        }
    }

    #[test]
    fn test_message_is_lookup_text() {
        let err = ApiError::from(LookupError::NotFound {
            licence: "42".into(),
        });
        assert_eq!(err.to_string(), "Licence introuvable: 42");
    }
}
