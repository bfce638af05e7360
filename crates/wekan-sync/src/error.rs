//! Error taxonomy for the webhook receiver and Wekan client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors produced while verifying, routing, or mirroring webhook events.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The webhook signature header was absent or did not match the payload.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The request body was not valid JSON or lacked required fields.
    #[error("Invalid JSON payload")]
    PayloadInvalid(#[source] serde_json::Error),

    /// Wekan rejected the provided credentials.
    #[error("authentication failed: {status} - {body}")]
    AuthenticationFailure {
        /// HTTP status of the login response.
        status: u16,
        /// Login response body.
        body: String,
    },

    /// A Wekan request kept failing after the retry budget was spent.
    ///
    /// Carries the last observed status code and body.
    #[error("Wekan request failed: {status} - {body}")]
    UpstreamRequestFailure {
        /// Last observed HTTP status.
        status: u16,
        /// Last observed response body.
        body: String,
    },

    /// The request never reached Wekan.
    #[error("error connecting to Wekan: {0}")]
    Transport(#[from] reqwest::Error),

    /// A template failed structural validation.
    #[error("invalid template: {0}")]
    TemplateValidation(String),

    /// No template registered under the requested name.
    #[error("template '{name}' not found. Available templates: {available}")]
    TemplateNotFound {
        /// Requested template name.
        name: String,
        /// Comma-separated registered names.
        available: String,
    },

    /// A named list or board does not exist upstream. Not retried: a retry
    /// will not make the name exist.
    #[error("{kind} '{name}' not found")]
    ResourceNotFound {
        /// Kind of the missing resource ("list", "board").
        kind: &'static str,
        /// The name that failed to resolve.
        name: String,
    },

    /// A board has no swimlane, so no card can be created in it.
    #[error("board {board} has no swimlanes; cannot create cards")]
    NoSwimlane {
        /// Board id missing a swimlane.
        board: String,
    },

    /// Wekan replied with a success status but an unusable body.
    #[error("unexpected Wekan response: {0}")]
    UnexpectedResponse(String),
}

impl SyncError {
    /// HTTP status this error maps to on the webhook endpoint.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SignatureInvalid => StatusCode::UNAUTHORIZED,
            Self::PayloadInvalid(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            SyncError::SignatureInvalid.status_code(),
            StatusCode::UNAUTHORIZED
        );

        let payload_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        assert_eq!(
            SyncError::PayloadInvalid(payload_err).status_code(),
            StatusCode::BAD_REQUEST
        );

        assert_eq!(
            SyncError::UpstreamRequestFailure {
                status: 503,
                body: String::new()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_matches_response_contract() {
        assert_eq!(SyncError::SignatureInvalid.to_string(), "Invalid signature");

        let payload_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            SyncError::PayloadInvalid(payload_err).to_string(),
            "Invalid JSON payload"
        );
    }

    #[test]
    fn test_upstream_failure_carries_status_and_body() {
        let err = SyncError::UpstreamRequestFailure {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Wekan request failed: 500 - boom");
    }
}
