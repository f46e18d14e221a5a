//! SimplyBook MCP server.
//!
//! Exposes the SimplyBook.me user API (v2) as MCP tools over SSE. A single
//! [`SessionManager`](session::SessionManager) owns the upstream token and
//! guarantees that concurrent tool calls trigger at most one authentication;
//! every tool answers with a [`ToolEnvelope`](envelope::ToolEnvelope).
//!
//! Module map:
//! - [`config`]: environment and `.env` loading
//! - [`session`]: token cache and single-flight authentication
//! - [`api`]: HTTP client, identity endpoint, query conventions
//! - [`registry`]: tool declarations and the per-call pipeline
//! - [`routers`]: the SimplyBook domains (bookings, clients, ...)
//! - [`server`]: rmcp handler, SSE listener, shutdown
//! - [`tunnel`]: optional ngrok exposure

pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod registry;
pub mod routers;
pub mod server;
pub mod session;
pub mod tunnel;

pub use api::{ApiClient, AuthorizedClient, HttpAuthenticator, Query};
pub use config::{AppConfig, Credentials, ServerConfig, UpstreamConfig};
pub use envelope::ToolEnvelope;
pub use error::{ApiError, ApiResult, ConfigError, ServerError, ServerResult};
pub use registry::{DomainRouter, ToolContext, ToolRegistry, ToolSpec};
pub use server::{build_registry, SimplyBookServer};
pub use session::{AuthHeaders, Authenticator, IssuedToken, SessionManager};
