//! Error types.
//!
//! Defines error variants for configuration loading, upstream SimplyBook API
//! calls and server bootstrap.

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} environment variable(s) are required", .0.join(", "))]
    MissingVariables(Vec<&'static str>),

    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to load env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

/// Errors raised by the upstream SimplyBook API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure (connect, timeout, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream rejected the session token (HTTP 401).
    #[error("SimplyBook rejected the session token: {0}")]
    Unauthorized(String),

    /// Any other non-success status.
    #[error("SimplyBook returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not the JSON we expected.
    #[error("Malformed SimplyBook response: {0}")]
    Decode(String),

    /// The identity endpoint refused to issue a token.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// A request could not be built from the given arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// True when the error proves the token used for the call is stale.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

/// Fatal startup errors. Any of these terminates the process with exit code 1.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Tool '{tool}' from router '{router}' is already registered by '{existing}'")]
    DuplicateTool {
        tool: String,
        router: &'static str,
        existing: &'static str,
    },

    #[error("Tool '{tool}' has an invalid argument schema: {reason}")]
    InvalidSchema { tool: String, reason: String },

    #[error("Failed to build upstream client: {0}")]
    Client(#[from] ApiError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tunnel error: {0}")]
    Tunnel(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
