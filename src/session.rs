//! Session management for the upstream SimplyBook account.
//!
//! A single [`SessionManager`] is shared by every domain router. It owns the
//! bearer token, decides when it is stale, and funnels all token mutation
//! through two transitions: acquire (a successful authentication) and
//! invalidate.
//!
//! Authentication is single-flight. The first caller that finds no fresh
//! token spawns the authentication request as its own task and publishes a
//! shared handle to it; callers arriving while it runs await that same
//! handle. Because the request lives in a spawned task, dropping any waiter
//! (a cancelled tool call, a disconnected client) never aborts it.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{config::Credentials, error::ApiResult};

/// Token material returned by the identity endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub refresh_token: Option<String>,
}

impl IssuedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            refresh_token: None,
        }
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Exchanges credentials for a token.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn authenticate(&self, credentials: &Credentials) -> ApiResult<IssuedToken>;
}

/// A cached token together with its freshness estimate.
#[derive(Clone)]
pub struct SessionToken {
    value: String,
    acquired_at: Instant,
    ttl: Duration,
}

impl SessionToken {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            acquired_at: Instant::now(),
            ttl,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn age(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    pub fn is_fresh(&self) -> bool {
        self.age() < self.ttl
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("age", &self.age())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Per-request view of the session, rendered as SimplyBook headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    company: String,
    token: Option<String>,
}

impl AuthHeaders {
    pub const COMPANY_HEADER: &'static str = "X-Company-Login";
    pub const TOKEN_HEADER: &'static str = "X-Token";

    pub fn new(company: impl Into<String>, token: Option<String>) -> Self {
        Self {
            company: company.into(),
            token,
        }
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Header name/value pairs. The token header is omitted when absent.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        std::iter::once((Self::COMPANY_HEADER, self.company.as_str())).chain(
            self.token
                .as_deref()
                .map(|token| (Self::TOKEN_HEADER, token)),
        )
    }
}

type AuthFlight = Shared<BoxFuture<'static, bool>>;

#[derive(Default)]
struct SessionState {
    token: RwLock<Option<SessionToken>>,
    // Lock order: `in_flight` before `token`.
    in_flight: Mutex<Option<AuthFlight>>,
    last_error: Mutex<Option<String>>,
}

impl SessionState {
    fn has_fresh_token(&self) -> bool {
        self.token.read().as_ref().is_some_and(SessionToken::is_fresh)
    }
}

pub struct SessionManager {
    credentials: Arc<Credentials>,
    authenticator: Arc<dyn Authenticator>,
    ttl: Duration,
    state: Arc<SessionState>,
}

impl SessionManager {
    pub fn new(
        credentials: Credentials,
        authenticator: Arc<dyn Authenticator>,
        ttl: Duration,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            authenticator,
            ttl,
            state: Arc::new(SessionState::default()),
        }
    }

    pub fn company(&self) -> &str {
        self.credentials.company()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True when a token is cached and still within its TTL.
    pub fn is_authenticated(&self) -> bool {
        self.state.has_fresh_token()
    }

    /// Why the most recent authentication attempt failed. Cleared by the next
    /// successful one.
    pub fn last_auth_error(&self) -> Option<String> {
        self.state.last_error.lock().clone()
    }

    /// Make sure a fresh token is cached, authenticating at most once across
    /// all concurrent callers.
    ///
    /// Returns `false` when the identity endpoint rejects the credentials or
    /// cannot be reached; no token is cached in that case.
    pub async fn ensure_authenticated(&self) -> bool {
        let flight = {
            let mut in_flight = self.state.in_flight.lock();
            if self.state.has_fresh_token() {
                return true;
            }
            match in_flight.as_ref() {
                Some(flight) => {
                    debug!(company = %self.company(), "Joining in-flight authentication");
                    flight.clone()
                }
                None => {
                    let flight = self.start_flight();
                    *in_flight = Some(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    fn start_flight(&self) -> AuthFlight {
        let credentials = Arc::clone(&self.credentials);
        let authenticator = Arc::clone(&self.authenticator);
        let state = Arc::clone(&self.state);
        let ttl = self.ttl;

        info!(company = %credentials.company(), "Authenticating with SimplyBook");

        let task = tokio::spawn(async move {
            let outcome = authenticator.authenticate(&credentials).await;

            let mut in_flight = state.in_flight.lock();
            let authenticated = match outcome {
                Ok(issued) => {
                    *state.token.write() = Some(SessionToken::new(issued.token, ttl));
                    state.last_error.lock().take();
                    info!(company = %credentials.company(), "SimplyBook session established");
                    true
                }
                Err(e) => {
                    *state.token.write() = None;
                    *state.last_error.lock() = Some(e.to_string());
                    warn!(company = %credentials.company(), error = %e, "SimplyBook authentication failed");
                    false
                }
            };
            *in_flight = None;
            authenticated
        });

        let state = Arc::clone(&self.state);
        async move {
            match task.await {
                Ok(authenticated) => authenticated,
                Err(e) => {
                    // The task never reached its cleanup; release the slot so
                    // the next caller can start over.
                    error!(error = %e, "Authentication task aborted");
                    state.in_flight.lock().take();
                    *state.last_error.lock() = Some(format!("authentication task aborted: {}", e));
                    false
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Headers for the current token.
    ///
    /// Call after a successful [`ensure_authenticated`](Self::ensure_authenticated);
    /// with nothing cached the token header is left out.
    pub fn get_auth_headers(&self) -> AuthHeaders {
        let token = self
            .state
            .token
            .read()
            .as_ref()
            .map(|t| t.value().to_string());
        AuthHeaders::new(self.company(), token)
    }

    /// Drop the cached token unconditionally.
    pub fn invalidate(&self) {
        if self.state.token.write().take().is_some() {
            info!(company = %self.company(), "Session token invalidated");
        }
    }

    /// Drop the cached token only if it is the one the upstream rejected.
    ///
    /// Returns whether anything was cleared. A token refreshed by another
    /// caller after `rejected` was handed out is kept.
    pub fn invalidate_token(&self, rejected: &str) -> bool {
        let mut token = self.state.token.write();
        if token.as_ref().is_some_and(|t| t.value() == rejected) {
            *token = None;
            info!(company = %self.company(), "Rejected session token invalidated");
            true
        } else {
            debug!(company = %self.company(), "Rejected token already replaced");
            false
        }
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("credentials", &self.credentials)
            .field("ttl", &self.ttl)
            .field("token", &*self.state.token.read())
            .finish()
    }
}
