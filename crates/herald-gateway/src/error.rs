// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from [`HeraldError`] to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use herald_core::HeraldError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error ready to be rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "missing or invalid bearer token")
    }

    /// Mapping for the send endpoint, where an unknown broadcast is a bad request.
    pub fn for_send(err: HeraldError) -> Self {
        match err {
            HeraldError::NotFound { .. } => Self::bad_request(err.to_string()),
            other => Self::from(other),
        }
    }
}

fn status_for(err: &HeraldError) -> StatusCode {
    match err {
        HeraldError::Validation(_)
        | HeraldError::Conflict(_)
        | HeraldError::SessionUnavailable { .. } => StatusCode::BAD_REQUEST,
        HeraldError::NotFound { .. } => StatusCode::NOT_FOUND,
        HeraldError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
        HeraldError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<HeraldError> for ApiError {
    fn from(err: HeraldError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn maps_error_kinds_to_status_codes() {
        let cases = [
            (HeraldError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (HeraldError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (
                HeraldError::SessionUnavailable {
                    tenant: "t".into(),
                    reason: "x".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                HeraldError::NotFound {
                    kind: "broadcast".into(),
                    id: "b".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                HeraldError::Timeout {
                    duration: Duration::from_secs(10),
                },
                StatusCode::REQUEST_TIMEOUT,
            ),
            (HeraldError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (
                HeraldError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn send_maps_not_found_to_bad_request() {
        let err = HeraldError::NotFound {
            kind: "broadcast".into(),
            id: "b".into(),
        };
        assert_eq!(ApiError::for_send(err).status, StatusCode::BAD_REQUEST);
    }
}
