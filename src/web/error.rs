//! API error handling.

use axum::{
    extract::multipart::MultipartError,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::drive::DriveError;
use crate::upload::UploadError;
use crate::AppError;

/// Where a teacher is sent when their credentials need renewing.
pub const LOGIN_PATH: &str = "/teacher/login";

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    PayloadTooLarge,
    /// Field-level validation failure.
    ValidationError,
    /// Drive credentials must be renewed through login (redirect).
    ReauthenticationRequired,
    InternalError,
    /// A backing service is not configured.
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ReauthenticationRequired => StatusCode::SEE_OTHER,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
    /// Set when the requested folder lies outside the teacher's root.
    #[serde(
        rename = "redirectToRoot",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub redirect_to_root: bool,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<HashMap<String, Vec<String>>>,
    redirect_to_root: bool,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            redirect_to_root: false,
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadTooLarge, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Redirect to login so the teacher grants drive access again.
    pub fn reauthentication_required() -> Self {
        Self::new(
            ErrorCode::ReauthenticationRequired,
            "Drive access expired, please log in again",
        )
    }

    /// 404 telling the frontend to fall back to the root folder.
    pub fn outside_root(message: impl Into<String>) -> Self {
        Self {
            redirect_to_root: true,
            ..Self::not_found(message)
        }
    }

    pub fn validation(details: HashMap<String, Vec<String>>) -> Self {
        Self::with_details(ErrorCode::ValidationError, "Validation failed", details)
    }

    /// Create a validation error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details: HashMap<String, Vec<String>> = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            details.insert(field.to_string(), messages);
        }

        Self::validation(details)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
                redirect_to_root: self.redirect_to_root,
            },
        };

        if self.code == ErrorCode::ReauthenticationRequired {
            return (status, [(header::LOCATION, LOGIN_PATH)], Json(body)).into_response();
        }
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Auth(msg) => ApiError::unauthorized(msg),
            e @ AppError::NotFound(_) => ApiError::not_found(e.to_string()),
            AppError::ReauthenticationRequired(msg) => {
                tracing::info!(reason = %msg, "Sending teacher back to login");
                ApiError::reauthentication_required()
            }
            AppError::Drive(e) => e.into(),
            other => {
                tracing::error!("Internal error: {}", other);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<DriveError> for ApiError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::NotFound(_) => ApiError::not_found("Drive item not found"),
            DriveError::PermissionDenied(_) => {
                ApiError::forbidden("The drive denied access to this item")
            }
            other => {
                tracing::error!("Drive error: {}", other);
                ApiError::internal("The drive request failed")
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingDestination => ApiError::bad_request("No destination folder"),
            UploadError::MissingFile => ApiError::bad_request("No file uploaded"),
            UploadError::TooLarge { limit } => ApiError::payload_too_large(format!(
                "File is larger than {} MB",
                limit / (1024 * 1024)
            )),
            UploadError::Drive(e) => e.into(),
            UploadError::Io(e) => {
                tracing::error!("Upload I/O error: {}", e);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}
