//! Error types module
//!
//! All failures that reach the UI layer are expressed as [`AppError`]. Transport-level
//! failures ([`TransportError`]) are converted at the subsystem boundary through
//! [`AppError::from_auth_failure`] and [`AppError::from_upload_failure`] so callers never
//! see opaque transport errors.

use std::io;

use crate::hooks::Severity;
use crate::transport::TransportError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like network hiccups
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "AUTHENTICATION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-displayable message
    fn client_message(&self) -> String;

    /// Severity of the toast raised for this error
    fn severity(&self) -> Severity;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Client-side rejection of a file before any task is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{name} is {size} bytes, which exceeds the maximum of {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("{name} has unsupported type {content_type}")]
    UnsupportedType { name: String, content_type: String },

    #[error("{name} is empty")]
    EmptyFile { name: String },
}

impl ValidationError {
    /// Name of the rejected file.
    pub fn file_name(&self) -> &str {
        match self {
            ValidationError::FileTooLarge { name, .. }
            | ValidationError::UnsupportedType { name, .. }
            | ValidationError::EmptyFile { name } => name,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Upload failed: {message}")]
    Upload { message: String },

    #[error("Upload cancelled")]
    UploadCancelled,

    #[error("Invalid file: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convert a failed login/registration exchange into an authentication error.
    ///
    /// The server's `message` payload wins; otherwise `default_message` is used.
    pub fn from_auth_failure(err: &TransportError, default_message: &str) -> Self {
        let message = err
            .server_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(default_message);
        AppError::Authentication(message.to_string())
    }

    /// Convert a failed upload exchange into an upload error.
    pub fn from_upload_failure(err: &TransportError) -> Self {
        match err {
            TransportError::Cancelled => AppError::UploadCancelled,
            other => AppError::Upload {
                message: other
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            },
        }
    }

    /// Convert any other failed request (read endpoints, file deletion).
    pub fn from_request_failure(err: &TransportError) -> Self {
        match err {
            TransportError::Status { status: 401, .. } => AppError::SessionExpired,
            other => AppError::Request(
                other
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            ),
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Authentication(_) => "Authentication",
            AppError::SessionExpired => "SessionExpired",
            AppError::Unauthenticated => "Unauthenticated",
            AppError::Upload { .. } => "Upload",
            AppError::UploadCancelled => "UploadCancelled",
            AppError::Validation(_) => "Validation",
            AppError::Storage(_) => "Storage",
            AppError::Config(_) => "Config",
            AppError::Request(_) => "Request",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, severity, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, Severity, LogLevel) {
    match err {
        AppError::Authentication(_) => (
            "AUTHENTICATION_FAILED",
            false,
            Some("Check your email and password"),
            Severity::Error,
            LogLevel::Debug,
        ),
        AppError::SessionExpired => (
            "SESSION_EXPIRED",
            false,
            Some("Log in again"),
            Severity::Warning,
            LogLevel::Warn,
        ),
        AppError::Unauthenticated => (
            "UNAUTHENTICATED",
            false,
            Some("Log in to continue"),
            Severity::Warning,
            LogLevel::Debug,
        ),
        AppError::Upload { .. } => (
            "UPLOAD_FAILED",
            true,
            Some("Retry the upload"),
            Severity::Error,
            LogLevel::Warn,
        ),
        AppError::UploadCancelled => (
            "UPLOAD_CANCELLED",
            true,
            None,
            Severity::Info,
            LogLevel::Debug,
        ),
        AppError::Validation(_) => (
            "INVALID_FILE",
            false,
            Some("Choose a smaller file of a supported type"),
            Severity::Warning,
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            "STORAGE_ERROR",
            true,
            Some("Check that the session file is writable"),
            Severity::Error,
            LogLevel::Warn,
        ),
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check environment configuration"),
            Severity::Error,
            LogLevel::Error,
        ),
        AppError::Request(_) => (
            "REQUEST_FAILED",
            true,
            Some("Retry after a short delay"),
            Severity::Error,
            LogLevel::Warn,
        ),
        AppError::Internal(_) => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            Severity::Error,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn severity(&self) -> Severity {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Authentication(ref msg) => msg.clone(),
            AppError::SessionExpired => "Your session has expired. Please log in again.".to_string(),
            AppError::Unauthenticated => "Please log in to continue".to_string(),
            AppError::Upload { ref message } => message.clone(),
            AppError::UploadCancelled => "Upload cancelled".to_string(),
            AppError::Validation(ref err) => err.to_string(),
            AppError::Storage(_) => "Failed to access local session storage".to_string(),
            AppError::Config(ref msg) => msg.clone(),
            AppError::Request(ref msg) => msg.clone(),
            AppError::Internal(_) => "Something went wrong".to_string(),
        }
    }
}
