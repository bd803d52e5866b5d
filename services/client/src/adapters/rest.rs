//! services/client/src/adapters/rest.rs
//!
//! The remote resource client: a thin wrapper around `reqwest` that attaches
//! the bearer credential, tags every request with an id for tracing, and maps
//! HTTP failures onto `PortError`. It knows nothing about lessons or users.

use std::sync::Arc;
use std::time::Duration;

use life_lessons_core::ports::{PortError, PortResult};
use reqwest::{header, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// An HTTP client bound to one backend and, optionally, one credential.
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    credential: Option<Arc<str>>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.credential.is_some())
            .finish()
    }
}

impl RestClient {
    /// Creates an unauthenticated client for public-only reads.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("life-lessons-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url,
            credential: None,
        })
    }

    /// Returns a client that sends `token` as a bearer credential on every request.
    pub fn with_credential(&self, token: &str) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            credential: Some(Arc::from(token)),
        }
    }

    /// Returns a client for the same backend with no credential.
    pub fn without_credential(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            credential: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> PortResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| PortError::Unexpected(format!("invalid path '{}': {}", path, e)))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> PortResult<T> {
        self.send(Method::GET, path, query, None::<&()>).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> PortResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    /// A POST with no request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        self.send(Method::POST, path, &[], None::<&()>).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> PortResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PATCH, path, &[], Some(body)).await
    }

    /// A PATCH with no request body, used for toggles.
    pub async fn patch_empty<T: DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        self.send(Method::PATCH, path, &[], None::<&()>).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        self.send(Method::DELETE, path, &[], None::<&()>).await
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> PortResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let request_id = Uuid::new_v4();

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(header::ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.credential {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, path, %request_id, "sending request");
        let response = request.send().await.map_err(|e| {
            warn!(%method, path, %request_id, "request failed: {}", e);
            PortError::Transport(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PortError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(status, &text);
            warn!(%method, path, %request_id, status = status.as_u16(), "backend rejected request: {}", message);
            return Err(PortError::from_status(status.as_u16(), message));
        }

        debug!(%method, path, %request_id, status = status.as_u16(), "request succeeded");
        decode_body(&text)
    }
}

/// Decodes a success body. An empty body decodes as JSON `null`, so unit
/// and `Option` targets work for endpoints that answer with no content.
pub(crate) fn decode_body<T: DeserializeOwned>(text: &str) -> PortResult<T> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| PortError::Decode(e.to_string()))
}

/// Picks the user-facing message out of an error body: the JSON `message`
/// or `error` field when present, otherwise the raw text, otherwise the
/// status' canonical reason.
fn error_message(status: StatusCode, text: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        for field in ["message", "error"] {
            if let Some(message) = value.get(field).and_then(|m| m.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = text.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}
