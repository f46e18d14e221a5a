//! MCP server surface: tool registry assembly, the rmcp handler and the SSE
//! HTTP listener.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Json, Router};
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    transport::sse_server::{SseServer, SseServerConfig},
    ErrorData, RoleServer, ServerHandler,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    registry::{ToolContext, ToolRegistry},
    routers,
};

pub const SERVER_NAME: &str = "simplybook";
pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages/";
pub const HEALTH_PATH: &str = "/health";

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);
/// How long open SSE streams may linger after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const INSTRUCTIONS: &str = "Tools for the SimplyBook.me booking system: bookings, clients, \
services, providers, statistics, tickets, memberships, coupons, calendar notes, products, \
subscription, payments and intake forms. Every tool returns {success, result} or \
{success: false, error}. Call get_additional_fields before create_booking.";

/// Register every domain router. Duplicate tool names are fatal.
pub fn build_registry(context: ToolContext) -> ServerResult<ToolRegistry> {
    let mut registry = ToolRegistry::new(context);
    for router in routers::all() {
        let count = registry.register(router.as_ref())?;
        debug!(router = router.name(), tools = count, "Router registered");
    }
    info!(tools = registry.len(), "All routers registered");
    Ok(registry)
}

/// rmcp handler exposing the registry. Cloned once per SSE session.
#[derive(Clone)]
pub struct SimplyBookServer {
    registry: Arc<ToolRegistry>,
}

impl SimplyBookServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }
}

impl ServerHandler for SimplyBookServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.registry.list_tools(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = request.name;
        debug!(tool = %name, "Tool call received");
        match self.registry.call(&name, request.arguments).await {
            Some(envelope) => Ok(envelope.into_call_result()),
            None => Err(ErrorData::invalid_params(
                format!("Unknown tool: {}", name),
                None,
            )),
        }
    }
}

/// Bind the listening socket for the configured host and port. Host names
/// are resolved here.
pub async fn bind(config: &ServerConfig) -> ServerResult<TcpListener> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.address(),
            source,
        })?;
    info!(addr = %listener.local_addr()?, "Listener bound");
    Ok(listener)
}

/// Build the HTTP app: SSE transport, message endpoint and health probe.
pub fn app(server: SimplyBookServer, bind: SocketAddr, shutdown: CancellationToken) -> Router {
    let (sse_server, sse_router) = SseServer::new(SseServerConfig {
        bind,
        sse_path: SSE_PATH.to_string(),
        post_path: MESSAGES_PATH.to_string(),
        ct: shutdown,
        sse_keep_alive: Some(SSE_KEEP_ALIVE),
    });

    let tool_count = server.registry().len();
    // The returned token is a child of `shutdown`.
    let _session_ct = sse_server.with_service(move || server.clone());

    sse_router.route(
        HEALTH_PATH,
        get(move || async move { Json(json!({"status": "ok", "tools": tool_count})) }),
    )
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    server: SimplyBookServer,
    shutdown: CancellationToken,
) -> ServerResult<()> {
    let addr = listener.local_addr()?;
    let router = app(server, addr, shutdown.clone());
    info!(
        sse = %format!("http://{}{}", addr, SSE_PATH),
        messages = MESSAGES_PATH,
        "Serving MCP over SSE"
    );

    let graceful = {
        let shutdown = shutdown.clone();
        async move { shutdown.cancelled().await }
    };
    let serving = axum::serve(listener, router).with_graceful_shutdown(graceful);

    tokio::select! {
        result = serving => result?,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => {
            warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Open connections did not close, stopping");
        }
    }
    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM and cancel `shutdown`.
pub async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
