//! Hooks for the UI collaborators
//!
//! The core never renders anything. It pushes user-facing outcomes to a [`Notifier`]
//! (the toast surface) and asks a [`Router`] to change location. Front ends implement
//! these traits; the no-op and tracing implementations cover headless use.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Severity of a toast notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A fire-and-forget notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Warning,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

/// Toast surface. Not required for correctness.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Well-known locations the core may navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Routing collaborator.
pub trait Router: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Notifier that drops every toast
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _toast: Toast) {}
}

/// Router that ignores navigation requests
pub struct NoOpRouter;

impl Router for NoOpRouter {
    fn navigate(&self, _route: Route) {}
}

/// Notifier that writes toasts to the tracing log
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.severity {
            Severity::Info => tracing::info!(title = %toast.title, "{}", toast.description),
            Severity::Warning => tracing::warn!(title = %toast.title, "{}", toast.description),
            Severity::Error => tracing::error!(title = %toast.title, "{}", toast.description),
        }
    }
}
