//! Fooddash Core Library
//!
//! This crate provides the domain models, error types, configuration, upload validation
//! and collaborator traits shared by the session manager, the upload pipeline and the
//! HTTP transport.

pub mod config;
pub mod error;
pub mod events;
pub mod hooks;
pub mod models;
pub mod preview;
pub mod transport;
pub mod validation;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{AppError, ErrorMetadata, LogLevel, ValidationError};
pub use events::{auth_event_channel, AuthEvent, AuthEventReceiver, AuthEventSender};
pub use hooks::{
    NoOpNotifier, NoOpRouter, Notifier, Route, Router, Severity, Toast, TracingNotifier,
};
pub use preview::{PreviewHandle, PreviewProvider};
pub use transport::{AuthApi, CredentialProvider, ProgressFn, TransportError, UploadTransport};
pub use validation::UploadPolicy;
