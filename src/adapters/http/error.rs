//! HTTP error mapping.
//!
//! Every failure leaves the service as `{ "message": ..., "details"? }`.
//! Server-side failures are logged with full detail and answered with a
//! generic body.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::domain::validation::ValidationError;
use crate::usecases::journal::JournalError;

/// Error returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Payload failed validation.
    #[error("Validation Error")]
    Validation(ValidationError),

    #[error("{0}")]
    NotFound(String),

    /// Known path, unsupported method.
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Unparseable request (malformed JSON and the like).
    #[error("{0}")]
    BadRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    /// A dependency the request needs is not set up.
    #[error("{0}")]
    Unavailable(String),

    /// Anything the caller cannot fix. The detail is only logged.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a ValidationError>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JournalError> for ApiError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::NotFound => Self::NotFound(err.to_string()),
            JournalError::Validation(e) => Self::Validation(e),
            JournalError::Storage(e) => Self::Internal(e.to_string()),
            JournalError::MediaNotConfigured => Self::Unavailable(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Internal(detail) => {
                error!(error = %detail, "Request failed");
                ErrorBody {
                    message: "Internal Server Error",
                    details: None,
                }
            }
            Self::Validation(errors) => ErrorBody {
                message: "Validation Error",
                details: Some(errors),
            },
            other => {
                warn!(status = status.as_u16(), error = %other, "Request rejected");
                return (
                    status,
                    Json(ErrorBody {
                        message: &other.to_string(),
                        details: None,
                    }),
                )
                    .into_response();
            }
        };

        (status, Json(body)).into_response()
    }
}
