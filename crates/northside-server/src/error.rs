use axum::{http::StatusCode, Json};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler's return type.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Failures of the event, voting and account operations.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} is required")]
    EmptyInput(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("reviews are limited to {max} characters")]
    ReviewTooLong { max: usize },

    #[error("an event with this name already exists")]
    DuplicateName,

    #[error("an event with this code already exists")]
    DuplicateCode,

    #[error("{0}")]
    InvalidDj(String),

    #[error("{0}")]
    Conflict(String),

    #[error("you are already in an event, leave it before joining another one")]
    AlreadyInEvent,

    #[error("you are not in this event")]
    NotInEvent,

    #[error("event not found")]
    EventNotFound,

    #[error("event is already active")]
    EventAlreadyActive,

    #[error("event is not active")]
    EventNotActive,

    #[error("only the event owner can do this")]
    NotEventOwner,

    #[error("you have already voted for this song")]
    AlreadyVoted,

    #[error("review not found")]
    ReviewNotFound,

    #[error("only the author can delete this review")]
    NotReviewAuthor,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::EmptyInput(_)
            | AppError::Validation(_)
            | AppError::ReviewTooLong { .. }
            | AppError::InvalidDj(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotEventOwner | AppError::NotReviewAuthor => StatusCode::FORBIDDEN,
            AppError::EventNotFound | AppError::ReviewNotFound | AppError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::DuplicateName
            | AppError::DuplicateCode
            | AppError::Conflict(_)
            | AppError::AlreadyInEvent
            | AppError::NotInEvent
            | AppError::EventAlreadyActive
            | AppError::EventNotActive
            | AppError::AlreadyVoted => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Lets handlers returning `(StatusCode, Json<ErrorResponse>)` use `?` on
/// service results.
impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = err.status();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{err}");
            "Internal server error".to_string()
        } else {
            err.to_string()
        };
        (status, Json(ErrorResponse { error }))
    }
}

/// Shorthand for the plain-message errors raised directly in handlers.
pub fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}
