//! HTTP client for the fooddash dashboard API.
//!
//! Every request goes through one interceptor pair:
//! - outbound, the current bearer credential (if any) is attached;
//! - inbound, a 401 answering a request that carried a credential is reported as
//!   [`AuthEvent::CredentialRejected`] to the single auth-event subscriber.
//!
//! Domain endpoints live in [`api`]; the streamed multipart upload lives in [`upload`].

pub mod api;
pub mod upload;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use fooddash_core::{AuthEvent, AuthEventSender, ClientConfig, CredentialProvider, TransportError};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// HTTP client for the dashboard API with session-aware auth.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Option<Arc<dyn CredentialProvider>>,
    auth_events: Option<AuthEventSender>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
            auth_events: None,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    /// Attach a credential source consulted on every request.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Report rejected credentials on `events`.
    pub fn with_auth_events(mut self, events: AuthEventSender) -> Self {
        self.auth_events = Some(events);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer credential. Returns whether one was attached.
    fn apply_auth(&self, request: RequestBuilder) -> (RequestBuilder, bool) {
        match self.credentials.as_ref().and_then(|c| c.bearer_token()) {
            Some(token) => (
                request.header("Authorization", format!("Bearer {}", token)),
                true,
            ),
            None => (request, false),
        }
    }

    /// Send an authenticated request and check its status.
    pub(crate) async fn execute(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Response, TransportError> {
        let (request, authenticated) = self.apply_auth(request);
        self.dispatch(request, path, authenticated).await
    }

    /// Send a request without a credential (login, registration).
    pub(crate) async fn execute_anonymous(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Response, TransportError> {
        self.dispatch(request, path, false).await
    }

    async fn dispatch(
        &self,
        request: RequestBuilder,
        path: &str,
        authenticated: bool,
    ) -> Result<Response, TransportError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);

        if status.as_u16() == 401 && authenticated {
            tracing::warn!(path, "Credential rejected by API");
            if let Some(events) = &self.auth_events {
                events.emit(AuthEvent::CredentialRejected {
                    path: path.to_string(),
                });
            }
        } else {
            tracing::debug!(path, status = status.as_u16(), "API request failed");
        }

        Err(TransportError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = self.execute(request, path).await?;
        decode_json(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let request = self.client.post(self.build_url(path)).json(body);
        let response = self.execute(request, path).await?;
        decode_json(response).await
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<(), TransportError> {
        let request = self.client.delete(self.build_url(path));
        self.execute(request, path).await?;
        Ok(())
    }

    /// Raw client for custom requests. Callers are responsible for auth.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    response
        .json()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Network("request timed out".to_string())
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

/// Extract a user-displayable message from an error body.
///
/// Accepts `{"message": …}` or `{"error": …}` JSON; falls back to a short plain-text body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return ["message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(str::to_string);
    }

    let text = body.trim();
    if text.is_empty() || text.len() > 200 || text.starts_with('<') {
        None
    } else {
        Some(text.to_string())
    }
}

// Re-export domain types for convenience.
pub use fooddash_core::models::{
    AuthResponse, FileUploadResponse, MenuItemResponse, OrderResponse, RestaurantResponse,
    UserResponse,
};
