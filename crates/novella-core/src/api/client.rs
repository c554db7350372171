//! Request pipeline for the novel analysis REST API.
//!
//! Every call goes through [`ApiClient::send`], which applies two stages
//! around the network I/O:
//!
//! - outgoing: attach `Authorization: Bearer <token>` from the credential
//!   store unless the caller set an Authorization header already
//! - incoming: turn any failure into an [`ApiError`] via [`normalize`]
//!
//! Successful payloads are unwrapped one `data` level deep. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::multipart::Form;
use reqwest::{Client, Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{normalize, RawFailure};
use super::ApiError;
use crate::auth::CredentialStore;
use crate::config::Config;

/// Body of an outgoing request.
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Form),
}

/// A single outgoing call. Built per request and consumed by [`ApiClient::send`].
pub struct RequestEnvelope {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub headers: HeaderMap,
}

impl RequestEnvelope {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest {
            message: format!("Could not encode request body: {}", e),
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Add query parameters from any serializable map-like value. Null fields are skipped.
    pub fn query<Q: Serialize + ?Sized>(mut self, params: &Q) -> Result<Self, ApiError> {
        let value = serde_json::to_value(params).map_err(|e| ApiError::InvalidRequest {
            message: format!("Could not encode query parameters: {}", e),
        })?;
        self.query.extend(query_pairs(&value));
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Flatten a JSON object into query pairs, dropping nulls.
fn query_pairs(value: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key.clone(), s.clone())),
            other => Some((key.clone(), other.to_string())),
        })
        .collect()
}

/// Remove exactly one `{ "data": ... }` wrapper, if present.
///
/// Payloads without a non-null `data` field are returned unchanged.
pub fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.get("data").is_some_and(|d| !d.is_null()) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode a response body: empty is `None`, JSON is parsed, anything else is a string.
fn decode_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

/// Decode an unwrapped payload into the type a caller expects.
pub(crate) fn decode<T: DeserializeOwned>(payload: Value, path: &str) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::InvalidResponse {
        message: format!("Unexpected response from {}: {}", path, e),
    })
}

/// API client for the novel analysis service.
/// Clone is cheap - reqwest::Client and the credential store are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    /// Create a client from the application configuration.
    pub fn new(config: &Config, store: Arc<CredentialStore>) -> Result<Self> {
        Self::with_options(&config.base_address, config.timeout(), store)
    }

    pub fn with_options(
        base_address: &str,
        timeout: Duration,
        store: Arc<CredentialStore>,
    ) -> Result<Self> {
        Url::parse(base_address)
            .with_context(|| format!("Invalid API base address '{}'", base_address))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_address.trim_end_matches('/').to_string(),
            timeout,
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn credential_store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Outgoing stage: attach the stored token unless an Authorization header is present.
    ///
    /// Reads the credential store directly, so it works before any session exists.
    pub fn intercept_outgoing(&self, envelope: &mut RequestEnvelope) {
        if envelope.headers.contains_key(AUTHORIZATION) {
            return;
        }
        match self.store.get() {
            Ok(Some(token)) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    envelope.headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value, sending without it"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read credential token, sending without it"),
        }
    }

    fn transport_failure(&self, err: &reqwest::Error) -> ApiError {
        let description = if err.is_timeout() {
            format!("Request timed out after {} ms", self.timeout.as_millis())
        } else if err.is_connect() {
            format!("Could not connect to {}", self.base_url)
        } else {
            err.to_string()
        };
        warn!(error = %err, "Request did not complete");
        normalize(RawFailure::transport(description))
    }

    /// Send a request through both interception stages and return the unwrapped payload.
    pub async fn send(&self, mut envelope: RequestEnvelope) -> Result<Value, ApiError> {
        self.intercept_outgoing(&mut envelope);

        let url = self.url(&envelope.path);
        debug!(method = %envelope.method, url = %url, "Sending request");

        let mut request = self
            .client
            .request(envelope.method, &url)
            .headers(envelope.headers);
        if !envelope.query.is_empty() {
            request = request.query(&envelope.query);
        }
        request = match envelope.body {
            RequestBody::Empty => request,
            RequestBody::Json(body) => request.json(&body),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await.map_err(|e| self.transport_failure(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_failure(&e))?;

        if !status.is_success() {
            debug!(
                status = status.as_u16(),
                url = %url,
                body = %ApiError::truncate_body(&text),
                "Request failed"
            );
            return Err(normalize(RawFailure::status(status.as_u16(), decode_body(&text))));
        }

        Ok(unwrap_envelope(decode_body(&text).unwrap_or(Value::Null)))
    }

    /// Send a request and decode the unwrapped payload.
    pub async fn request<T: DeserializeOwned>(
        &self,
        envelope: RequestEnvelope,
    ) -> Result<T, ApiError> {
        let path = envelope.path.clone();
        let payload = self.send(envelope).await?;
        decode(payload, &path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestEnvelope::get(path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestEnvelope::post(path).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestEnvelope::put(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestEnvelope::delete(path)).await
    }
}
