//! Tracing setup: stdout plus an optional non-blocking log file.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Directive, fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_LOG_FILE: &str = "simplybook_mcp.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const QUIET_TARGETS: &[&str] = &["hyper=warn", "h2=warn", "reqwest=warn", "rustls=warn"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Explicit filter; falls back to `RUST_LOG`, then [`DEFAULT_LOG_LEVEL`].
    pub level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            json: false,
        }
    }
}

/// Flushes the file writer when dropped. Keep it alive for the process
/// lifetime.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

fn build_filter(level: Option<&str>) -> ServerResult<EnvFilter> {
    let (mut filter, spec) = match level {
        Some(level) => (
            EnvFilter::try_new(level).map_err(|e| {
                ServerError::Logging(format!("invalid log level '{}': {}", level, e))
            })?,
            level.to_string(),
        ),
        None => match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(env) if EnvFilter::try_new(&env).is_ok() => (EnvFilter::new(&env), env),
            _ => (
                EnvFilter::new(DEFAULT_LOG_LEVEL),
                DEFAULT_LOG_LEVEL.to_string(),
            ),
        },
    };
    for quiet in QUIET_TARGETS {
        let target = quiet.split('=').next().unwrap_or(quiet);
        if names_target(&spec, target) {
            continue;
        }
        if let Ok(directive) = quiet.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

/// Whether a filter string carries its own directive for `target`.
fn names_target(spec: &str, target: &str) -> bool {
    spec.split(',')
        .filter_map(|directive| directive.trim().split(['=', '[']).next())
        .any(|name| name == target)
}

fn split_log_path(path: &Path) -> ServerResult<(PathBuf, String)> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ServerError::Logging(format!("invalid log file path {}", path.display())))?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

pub fn init_logging(config: &LoggingConfig) -> ServerResult<LoggingGuard> {
    let filter = build_filter(config.level.as_deref())?;

    let (file_layer, file_guard) = match &config.log_file {
        Some(path) => {
            let (dir, file_name) = split_log_path(path)?;
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_timer(ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_timer(ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
            .with_target(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ServerError::Logging(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
