use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::schema::FieldViolation;

/// Domain failures returned by the signup and terms-agreement services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("email already registered")]
    EmailAlreadyExists,
    #[error("identity creation failed")]
    UserCreationFailed,
    #[error("profile insert failed")]
    ProfileCreationFailed,
    #[error("terms agreement insert failed")]
    TermsAgreementFailed,
    #[error("terms already agreed")]
    TermsAlreadyAgreed,
    #[error("unknown user id")]
    InvalidUserId,
    #[error("database error")]
    Database,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            AuthError::UserCreationFailed => "USER_CREATION_FAILED",
            AuthError::ProfileCreationFailed => "PROFILE_CREATION_FAILED",
            AuthError::TermsAgreementFailed => "TERMS_AGREEMENT_FAILED",
            AuthError::TermsAlreadyAgreed => "TERMS_ALREADY_AGREED",
            AuthError::InvalidUserId => "INVALID_USER_ID",
            AuthError::Database => "DATABASE_ERROR",
        }
    }

    /// User-facing message. Never carries provider or database text.
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::EmailAlreadyExists => "이미 등록된 이메일입니다",
            AuthError::UserCreationFailed => "사용자 생성에 실패했습니다",
            AuthError::ProfileCreationFailed => "프로필 생성에 실패했습니다",
            AuthError::TermsAgreementFailed => "약관 동의 처리에 실패했습니다",
            AuthError::TermsAlreadyAgreed => "이미 약관에 동의했습니다",
            AuthError::InvalidUserId => "올바르지 않은 사용자 ID입니다",
            AuthError::Database => "데이터베이스 오류가 발생했습니다",
        }
    }
}

pub const VALIDATION_ERROR_CODE: &str = "VALIDATION_ERROR";
pub const VALIDATION_ERROR_MESSAGE: &str = "입력값이 올바르지 않습니다";

/// Error side of the `{ success, data | error }` envelope.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

impl ErrorEnvelope {
    fn new(code: &'static str, message: &'static str, details: Option<Vec<FieldViolation>>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code,
                message,
                details,
            },
        }
    }
}

/// Everything a route handler can answer with besides success.
///
/// Service failures are 400 whatever their code; only failures nothing
/// classified (unreadable body, panics) become a 500 DATABASE_ERROR.
#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<FieldViolation>),
    Service(AuthError),
    Unclassified,
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Service(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorEnvelope::new(
                    VALIDATION_ERROR_CODE,
                    VALIDATION_ERROR_MESSAGE,
                    Some(details),
                )),
            )
                .into_response(),
            ApiError::Service(e) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorEnvelope::new(e.code(), e.message(), None)),
            )
                .into_response(),
            ApiError::Unclassified => {
                let e = AuthError::Database;
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorEnvelope::new(e.code(), e.message(), None)),
                )
                    .into_response()
            }
        }
    }
}

/// Response for a panic caught at the router boundary.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "handler panicked");
    ApiError::Unclassified.into_response()
}
