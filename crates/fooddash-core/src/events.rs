//! Authentication events emitted by the transport
//!
//! A rejected credential is reported as an explicit [`AuthEvent`] instead of a hidden
//! side effect inside the HTTP layer. The receiving half is not `Clone`, so exactly one
//! subscriber (the session manager) consumes it.

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A request carrying a bearer token was answered with 401.
    CredentialRejected { path: String },
}

/// Sending half, held by the transport.
#[derive(Debug, Clone)]
pub struct AuthEventSender(mpsc::UnboundedSender<AuthEvent>);

impl AuthEventSender {
    /// Emit an event. A dropped receiver is not an error for the sender.
    pub fn emit(&self, event: AuthEvent) {
        if self.0.send(event).is_err() {
            tracing::debug!("Auth event dropped: no subscriber");
        }
    }
}

/// Receiving half, consumed by a single subscriber.
#[derive(Debug)]
pub struct AuthEventReceiver(mpsc::UnboundedReceiver<AuthEvent>);

impl AuthEventReceiver {
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.0.recv().await
    }

    /// Take a pending event without waiting.
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        self.0.try_recv().ok()
    }
}

pub fn auth_event_channel() -> (AuthEventSender, AuthEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AuthEventSender(tx), AuthEventReceiver(rx))
}
