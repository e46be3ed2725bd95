use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error. Every variant carries a fixed HTTP status and a
/// machine-readable `errorCode` for the JSON envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Validation failed")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session mismatch")]
    SessionMismatch,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Email already exists")]
    EmailTaken,

    #[error("Event has already been processed")]
    EventAlreadyProcessed,

    #[error("OTP is invalid or has expired")]
    OtpNotFound,

    #[error("Incorrect OTP, {remaining} attempt(s) remaining")]
    InvalidOtp { remaining: i32 },

    #[error("Maximum OTP attempts exceeded")]
    MaxAttemptsExceeded,

    #[error("Reset token is invalid or has expired")]
    InvalidResetToken,

    #[error("Image storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidFields(_) => StatusCode::BAD_REQUEST,
            Self::OtpNotFound | Self::InvalidOtp { .. } | Self::InvalidResetToken => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials
            | Self::MissingToken
            | Self::InvalidToken
            | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::TokenRevoked
            | Self::SessionNotFound
            | Self::SessionMismatch
            | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailTaken | Self::EventAlreadyProcessed => StatusCode::CONFLICT,
            Self::MaxAttemptsExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::InvalidFields(_) => "VALIDATION_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::MissingToken => "TOKEN_MISSING",
            Self::InvalidToken => "TOKEN_INVALID",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionMismatch => "SESSION_MISMATCH",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::EventAlreadyProcessed => "EVENT_ALREADY_PROCESSED",
            Self::OtpNotFound => "OTP_NOT_FOUND",
            Self::InvalidOtp { .. } => "INVALID_OTP",
            Self::MaxAttemptsExceeded => "MAX_ATTEMPTS_EXCEEDED",
            Self::InvalidResetToken => "INVALID_RESET_TOKEN",
            Self::Storage(_) | Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to clients. Internal failures never leak their cause.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Database(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::SessionNotFound | Self::SessionMismatch => {
                "Session is no longer valid, please log in again".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::Internal(format!("hashing failed: {err}"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_code: None,
            errors: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            message: message.into(),
            error_code: Some(code),
            errors: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = ErrorResponse::with_code(self.public_message(), self.error_code());
        if let AppError::InvalidFields(errors) = &self {
            body.errors = serde_json::to_value(errors).ok();
        }

        (status, Json(body)).into_response()
    }
}
