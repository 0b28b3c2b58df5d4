//! Claim failures as HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prdrop_sdk::{ClaimError, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message of a committed claim.
pub const CLAIMED_MESSAGE: &str = "Airdrop claimed successfully";
/// Message of a request using a method the route does not serve.
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method Not Allowed";

/// Body of every claim endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Whether the airdrop was claimed.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
}

impl ClaimResponse {
    /// A committed claim.
    #[must_use]
    pub fn claimed() -> Self {
        Self {
            success: true,
            message: CLAIMED_MESSAGE.to_owned(),
        }
    }

    /// A rejected request.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Error returned by the HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// The claim protocol rejected the request.
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// The route does not serve this method.
    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl AppError {
    /// Response status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Claim(error) => match error.kind() {
                ErrorKind::Validation | ErrorKind::Crypto | ErrorKind::Conflict => {
                    StatusCode::BAD_REQUEST
                }
                ErrorKind::Policy => StatusCode::FORBIDDEN,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Claim(ClaimError::Malformed(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // `ClaimError` renders internal failures without their detail.
        let body = ClaimResponse::failure(self.to_string());
        (self.status(), Json(body)).into_response()
    }
}
