//! Error types for classdrive.

use thiserror::Error;

use crate::drive::DriveError;

/// Common error type for classdrive.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The stored refresh credential is missing or was rejected.
    ///
    /// Callers respond by sending the user through the login flow again.
    #[error("reauthentication required: {0}")]
    ReauthenticationRequired(String),

    /// The identity provider could not be reached or answered garbage.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// Remote drive error.
    #[error(transparent)]
    Drive(#[from] DriveError),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

/// Result type alias for classdrive operations.
pub type Result<T> = std::result::Result<T, AppError>;
