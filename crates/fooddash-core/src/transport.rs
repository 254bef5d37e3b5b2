//! Transport collaborator interfaces
//!
//! The session manager and upload pipeline only see these traits. The reqwest-backed
//! implementation lives in `fooddash-api-client`; tests substitute stubs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::{AuthResponse, FileUploadResponse, LoginRequest, RegisterRequest, UploadFile};

/// Transport-level failure. Never handed to the UI directly; see [`crate::AppError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request failed with status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Message carried in the server's error payload, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Status {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Progress callback receiving a completion percentage. Values may arrive out of
/// order or outside [0, 100]; consumers clamp.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Source of the bearer credential attached to outbound requests.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Login and registration exchanges.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, TransportError>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, TransportError>;
}

/// Upload-shaped requests with progress and cancellation.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Upload `file` into `folder`.
    ///
    /// Once `cancel` fires, implementations must stop reporting progress and return
    /// [`TransportError::Cancelled`] instead of a success.
    async fn upload(
        &self,
        file: &UploadFile,
        folder: &str,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<FileUploadResponse, TransportError>;
}
