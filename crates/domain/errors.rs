use std::time::Duration;

use thiserror::Error;

/// Failures a user subscription operation can end with.
///
/// The first four variants are the business-level outcomes raised by the
/// storage layer. They travel through the use case untouched so the HTTP
/// layer can match on them.
#[derive(Debug, Error)]
pub enum UserSubscriptionError {
    #[error("user_subscription not found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("user subscription already exists")]
    AlreadyExists,
    #[error("user subscription conflicts with existing record")]
    Overlap,
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type UserSubscriptionResult<T> = std::result::Result<T, UserSubscriptionError>;
