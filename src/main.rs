use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use simplybook_mcp::{
    config::{self, AppConfig},
    logging::{self, LoggingConfig, DEFAULT_LOG_FILE},
    server,
    tunnel::NgrokTunnel,
    ApiClient, HttpAuthenticator, ServerResult, SessionManager, SimplyBookServer, ToolContext,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "simplybook-mcp", author, version, about, long_about = None)]
struct Cli {
    /// Load environment variables from this file instead of discovering `.env`
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Listen address; overrides MCP_HOST
    #[arg(long)]
    host: Option<String>,

    /// Listen port; overrides PORT and MCP_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Log filter, e.g. `debug` or `info,simplybook_mcp=trace`; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log to stdout only
    #[arg(long)]
    no_log_file: bool,

    /// Emit stdout logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Expose the server through an ngrok tunnel
    #[arg(long)]
    ngrok: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load first so RUST_LOG from the file applies; report once logging is up.
    let env_loaded = config::load_env_file(cli.env_file.as_deref());

    let _guard = match logging::init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        log_file: (!cli.no_log_file).then(|| cli.log_file.clone()),
        json: cli.log_json,
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match env_loaded {
        Ok(()) => run(cli).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    info!("Initializing SimplyBook MCP server");

    let mut config = AppConfig::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    info!(
        company = %config.credentials.company(),
        host = %config.server.host,
        port = config.server.port,
        api = %config.upstream.base_url,
        token_ttl_secs = config.upstream.token_ttl.as_secs(),
        "Configuration loaded"
    );

    let api = ApiClient::new(&config.upstream)?;
    let session = Arc::new(SessionManager::new(
        config.credentials.clone(),
        Arc::new(HttpAuthenticator::new(api.clone())),
        config.upstream.token_ttl,
    ));
    let registry = Arc::new(server::build_registry(ToolContext::new(session, api))?);

    let listener = server::bind(&config.server).await?;
    let port = listener.local_addr()?.port();

    let tunnel = if cli.ngrok {
        Some(NgrokTunnel::start(port).await?)
    } else {
        None
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(server::shutdown_signal(shutdown.clone()));

    let served = server::serve(listener, SimplyBookServer::new(registry), shutdown).await;

    if let Some(tunnel) = tunnel {
        tunnel.stop().await;
    }
    served
}
