//! HTTP plumbing for the SimplyBook user API (v2).
//!
//! [`ApiClient`] owns the connection pool and base URL. Domain clients never
//! hold credentials; they receive an [`AuthorizedClient`] bound to the headers
//! of the current session for the duration of one tool call.

mod auth;

use std::sync::Arc;

pub use auth::HttpAuthenticator;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    config::UpstreamConfig,
    error::{ApiError, ApiResult},
    session::AuthHeaders,
};

/// Longest error body echoed back when the upstream sends non-JSON text.
const MAX_ERROR_BODY: usize = 200;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<Url>,
}

impl ApiClient {
    pub fn new(config: &UpstreamConfig) -> ApiResult<Self> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("simplybook-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: Arc::new(base_url),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Bind this client to the headers of the current session.
    pub fn authorized(&self, headers: AuthHeaders) -> AuthorizedClient {
        AuthorizedClient {
            api: self.clone(),
            headers,
        }
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded,
    /// so identifiers supplied by callers cannot escape their position.
    pub(crate) fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        if let Some(empty) = segments.iter().position(|s| s.trim().is_empty()) {
            return Err(ApiError::InvalidArgument(format!(
                "path segment {} must not be empty",
                empty
            )));
        }
        let mut url = (*self.base_url).clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// An [`ApiClient`] carrying the auth headers for one call.
#[derive(Clone)]
pub struct AuthorizedClient {
    api: ApiClient,
    headers: AuthHeaders,
}

impl AuthorizedClient {
    pub fn headers(&self) -> &AuthHeaders {
        &self.headers
    }

    pub async fn get(&self, segments: &[&str], query: &Query) -> ApiResult<Value> {
        self.send(Method::GET, segments, Some(query), None).await
    }

    pub async fn post(&self, segments: &[&str], body: &Value) -> ApiResult<Value> {
        self.send(Method::POST, segments, None, Some(body)).await
    }

    pub async fn put(&self, segments: &[&str], body: &Value) -> ApiResult<Value> {
        self.send(Method::PUT, segments, None, Some(body)).await
    }

    pub async fn delete(&self, segments: &[&str]) -> ApiResult<Value> {
        self.send(Method::DELETE, segments, None, None).await
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: Option<&Query>,
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let url = self.api.url(segments)?;
        debug!(method = %method, path = %url.path(), "SimplyBook request");

        let mut request = self.api.http().request(method, url);
        for (name, value) in self.headers.pairs() {
            request = request.header(name, value);
        }
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            request = request.query(query.pairs());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        decode_response(request.send().await?).await
    }
}

/// Turn an upstream response into JSON or a typed error.
///
/// An empty success body becomes `null`. Error messages come from the JSON
/// `message` field when present, else from the raw body or status text.
pub(crate) async fn decode_response(response: reqwest::Response) -> ApiResult<Value> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()));
    }

    let message = error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    if status == StatusCode::UNAUTHORIZED {
        Err(ApiError::Unauthorized(message))
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return value
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_ERROR_BODY).collect())
}

/// Query string builder following SimplyBook conventions: list filters go in
/// `filter[<name>]`, pagination in `page` and `on_page`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param<V: ToString>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.pairs.push((name.to_string(), value.to_string()));
        }
        self
    }

    #[must_use]
    pub fn filter<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        self.param(&format!("filter[{}]", name), value)
    }

    /// Boolean filter, sent as `1`/`0`.
    #[must_use]
    pub fn flag(self, name: &str, value: Option<bool>) -> Self {
        self.filter(name, value.map(u8::from))
    }

    /// Multi-valued filter, sent as repeated `filter[<name>][]` pairs.
    #[must_use]
    pub fn filter_list(mut self, name: &str, values: Option<&[String]>) -> Self {
        for value in values.unwrap_or_default() {
            self.pairs
                .push((format!("filter[{}][]", name), value.to_string()));
        }
        self
    }

    #[must_use]
    pub fn page(self, page: Option<u32>, on_page: Option<u32>) -> Self {
        self.param("page", page).param("on_page", on_page)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
