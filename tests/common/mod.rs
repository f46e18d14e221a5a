//! In-process mock of the SimplyBook user API.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use simplybook_mcp::{
    build_registry, ApiClient, Credentials, HttpAuthenticator, SessionManager, ToolContext,
    ToolRegistry, UpstreamConfig,
};
use tokio::net::TcpListener;

pub const COMPANY: &str = "acme";
pub const LOGIN: &str = "u";
pub const PASSWORD: &str = "p";

/// Time the identity endpoint takes to answer, so concurrent callers overlap.
const AUTH_LATENCY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct MockState {
    pub auth_calls: AtomicUsize,
    pub api_calls: AtomicUsize,
    pub reject_auth: AtomicBool,
    pub require_2fa: AtomicBool,
    pub omit_token: AtomicBool,
    issued: AtomicUsize,
    valid_token: Mutex<Option<String>>,
    failure: Mutex<Option<(StatusCode, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::SeqCst)
    }

    pub fn reject_auth(&self, reject: bool) {
        self.reject_auth.store(reject, Ordering::SeqCst);
    }

    pub fn require_2fa(&self, required: bool) {
        self.require_2fa.store(required, Ordering::SeqCst);
    }

    /// Answer auth requests with 200 but no token.
    pub fn omit_token(&self, omit: bool) {
        self.omit_token.store(omit, Ordering::SeqCst);
    }

    /// Forget the issued token; the next API call answers 401.
    pub fn revoke_token(&self) {
        *self.valid_token.lock() = None;
    }

    pub fn current_token(&self) -> Option<String> {
        self.valid_token.lock().clone()
    }

    /// Make every API call fail with `status` and `message`.
    pub fn fail_with(&self, status: StatusCode, message: &str) {
        *self.failure.lock() = Some((status, message.to_string()));
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

pub struct MockSimplyBook {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockSimplyBook {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/admin/auth", post(auth))
            .fallback(api)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Session and registry wired to this mock with the acme/u/p account.
    pub fn registry(&self, ttl: Duration) -> (Arc<SessionManager>, ToolRegistry) {
        let api = ApiClient::new(&UpstreamConfig::new(self.url())).unwrap();
        let session = Arc::new(SessionManager::new(
            Credentials::new(COMPANY, LOGIN, PASSWORD),
            Arc::new(HttpAuthenticator::new(api.clone())),
            ttl,
        ));
        let registry = build_registry(ToolContext::new(session.clone(), api)).unwrap();
        (session, registry)
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"code": status.as_u16(), "message": message, "data": [], "message_data": []})),
    )
        .into_response()
}

async fn auth(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.auth_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(AUTH_LATENCY).await;

    let valid = body["company"] == COMPANY && body["login"] == LOGIN && body["password"] == PASSWORD;
    if !valid || state.reject_auth.load(Ordering::SeqCst) {
        return error_body(StatusCode::UNAUTHORIZED, "Login or password is incorrect");
    }
    if state.require_2fa.load(Ordering::SeqCst) {
        return Json(json!({
            "company": COMPANY,
            "login": LOGIN,
            "token": null,
            "require2fa": true,
            "allowed2fa_providers": ["ga"]
        }))
        .into_response();
    }

    if state.omit_token.load(Ordering::SeqCst) {
        return Json(json!({"company": COMPANY, "login": LOGIN, "require2fa": false}))
            .into_response();
    }

    let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let token = format!("token-{}", n);
    *state.valid_token.lock() = Some(token.clone());
    Json(json!({
        "company": COMPANY,
        "login": LOGIN,
        "token": token,
        "refresh_token": format!("refresh-{}", n),
        "domain": "simplybook.me",
        "require2fa": false
    }))
    .into_response()
}

async fn api(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);

    let company = headers.get("X-Company-Login").and_then(|v| v.to_str().ok());
    let token = headers.get("X-Token").and_then(|v| v.to_str().ok());
    let expected = state.valid_token.lock().clone();
    if company != Some(COMPANY) || token.is_none() || token.map(str::to_string) != expected {
        return error_body(StatusCode::UNAUTHORIZED, "Token expired");
    }

    let query: Vec<(String, String)> = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let body = (!body.is_empty())
        .then(|| serde_json::from_slice::<Value>(&body).ok())
        .flatten();
    state.requests.lock().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: query.clone(),
        body: body.clone(),
    });

    if let Some((status, message)) = state.failure.lock().clone() {
        return error_body(status, &message);
    }
    if method == Method::DELETE {
        return StatusCode::OK.into_response();
    }

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": query,
        "body": body,
        "data": [{"id": 1}],
        "metadata": {"items_count": 1, "pages_count": 1, "page": 1, "on_page": 10}
    }))
    .into_response()
}

pub fn args(value: Value) -> Option<serde_json::Map<String, Value>> {
    value.as_object().cloned()
}
