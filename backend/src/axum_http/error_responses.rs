use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crates::domain::errors::UserSubscriptionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
}

/// Maps the business-level outcomes to a status and client message.
///
/// `None` means the error is not one the client can act on; callers answer
/// with 500 and a generic message instead.
pub fn classify(err: &UserSubscriptionError) -> Option<(StatusCode, &'static str)> {
    match err {
        UserSubscriptionError::NotFound => {
            Some((StatusCode::NOT_FOUND, "user_subscription not found"))
        }
        UserSubscriptionError::UserNotFound => Some((StatusCode::NOT_FOUND, "user not found")),
        UserSubscriptionError::AlreadyExists => {
            Some((StatusCode::CONFLICT, "user subscription already exists"))
        }
        UserSubscriptionError::Overlap => Some((
            StatusCode::CONFLICT,
            "user subscription conflicts with existing record",
        )),
        UserSubscriptionError::Timeout { .. } | UserSubscriptionError::Internal(_) => None,
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{fallback}: {source}")]
    UseCase {
        source: UserSubscriptionError,
        /// Message sent when `source` is not classified.
        fallback: &'static str,
    },
}

impl AppError {
    pub fn use_case(source: UserSubscriptionError, fallback: &'static str) -> Self {
        Self::UseCase { source, fallback }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::UseCase { source, fallback } => match classify(&source) {
                Some((status, message)) => (status, message.to_string()),
                // Internal detail stays in the logs.
                None => (StatusCode::INTERNAL_SERVER_ERROR, fallback.to_string()),
            },
        };

        error_response(status, message)
    }
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(ErrorResponse {
        status: status.as_u16(),
        error: message.into(),
    });

    (status, body).into_response()
}
