//! Configuration loaded from the process environment.
//!
//! Everything is read once at startup. Lookups go through a closure so the
//! parsing rules can be exercised without mutating the real environment.

use std::{fmt, path::Path, time::Duration};

use tracing::{debug, info};
use url::Url;

use crate::error::ConfigError;

pub const ENV_COMPANY: &str = "SIMPLYBOOK_COMPANY";
pub const ENV_LOGIN: &str = "SIMPLYBOOK_LOGIN";
pub const ENV_PASSWORD: &str = "SIMPLYBOOK_PASSWORD";
pub const ENV_API_URL: &str = "SIMPLYBOOK_API_URL";
pub const ENV_TOKEN_TTL: &str = "SIMPLYBOOK_TOKEN_TTL_SECS";
pub const ENV_TIMEOUT: &str = "SIMPLYBOOK_TIMEOUT_SECS";
pub const ENV_HOST: &str = "MCP_HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_MCP_PORT: &str = "MCP_PORT";

pub const DEFAULT_API_URL: &str = "https://user-api-v2.simplybook.me";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Account credentials for the single upstream SimplyBook company.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    company: String,
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(
        company: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("company", &self.company)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the SSE transport listens. `host` may be an IP literal or a name
/// resolved at bind time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `host:port`, with IPv6 literals bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Upstream API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// How long an issued token is trusted before re-authenticating.
    pub token_ttl: Duration,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset, so `PORT=""` falls through to
    /// `MCP_PORT` and an empty password counts as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let company = get(ENV_COMPANY);
        let login = get(ENV_LOGIN);
        let password = get(ENV_PASSWORD);

        let missing: Vec<&'static str> = [
            (ENV_COMPANY, company.is_none()),
            (ENV_LOGIN, login.is_none()),
            (ENV_PASSWORD, password.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(company), Some(login), Some(password)) = (company, login, password) else {
            return Err(ConfigError::MissingVariables(missing));
        };

        let host = get(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        // PaaS hosts export PORT; MCP_PORT is the local override.
        let port_var = get(ENV_PORT)
            .map(|v| (ENV_PORT, v))
            .or_else(|| get(ENV_MCP_PORT).map(|v| (ENV_MCP_PORT, v)));
        let port = match port_var {
            Some((var, raw)) => {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|e| ConfigError::InvalidValue {
                        var,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?
            }
            None => DEFAULT_PORT,
        };

        let base_url = get(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Url::parse(&base_url).map_err(|e| ConfigError::InvalidValue {
            var: ENV_API_URL,
            value: base_url.clone(),
            reason: e.to_string(),
        })?;

        let upstream = UpstreamConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            token_ttl: Duration::from_secs(parse_secs(
                &get,
                ENV_TOKEN_TTL,
                DEFAULT_TOKEN_TTL_SECS,
            )?),
            timeout: Duration::from_secs(parse_secs(&get, ENV_TIMEOUT, DEFAULT_TIMEOUT_SECS)?),
        };

        Ok(Self {
            credentials: Credentials::new(company, login, password),
            server: ServerConfig { host, port },
            upstream,
        })
    }
}

fn parse_secs<G>(get: &G, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            var,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidValue {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

/// Seed the process environment from a `.env` file.
///
/// An explicit path must exist. Without one, the usual `.env` discovery runs
/// and a missing file is not an error. Variables already set win.
pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            info!(path = %path.display(), "Loaded env file");
        }
        None => match dotenvy::dotenv() {
            Ok(found) => info!(path = %found.display(), "Loaded env file"),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => {
                return Err(ConfigError::EnvFile {
                    path: ".env".to_string(),
                    reason: e.to_string(),
                })
            }
        },
    }
    Ok(())
}
