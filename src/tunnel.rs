//! Optional ngrok tunnel for exposing a local server publicly.

use std::{process::Stdio, time::Duration};

use serde::Deserialize;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::{
    error::{ServerError, ServerResult},
    server::SSE_PATH,
};

pub const NGROK_API_URL: &str = "http://127.0.0.1:4040/api/tunnels";

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const POLL_ATTEMPTS: u32 = 20;

#[derive(Debug, Deserialize)]
struct TunnelList {
    #[serde(default)]
    tunnels: Vec<TunnelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TunnelInfo {
    #[serde(default)]
    pub proto: String,
    #[serde(default)]
    pub public_url: String,
}

/// Pick the public URL to advertise: the https tunnel when present, else the
/// first one listed.
pub fn select_public_url(tunnels: &[TunnelInfo]) -> Option<&str> {
    tunnels
        .iter()
        .find(|t| t.proto == "https" && !t.public_url.is_empty())
        .or_else(|| tunnels.iter().find(|t| !t.public_url.is_empty()))
        .map(|t| t.public_url.as_str())
}

/// A running `ngrok http <port>` child. Killed on drop.
pub struct NgrokTunnel {
    child: Child,
    public_url: Option<String>,
}

impl NgrokTunnel {
    /// Start ngrok for `port` and wait for its public URL.
    ///
    /// Fails when the `ngrok` binary is unavailable. A tunnel whose URL never
    /// shows up on the local agent API is kept running with a warning.
    pub async fn start(port: u16) -> ServerResult<Self> {
        check_installed().await?;

        info!(port, "Starting ngrok tunnel");
        let child = Command::new("ngrok")
            .arg("http")
            .arg(port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ServerError::Tunnel(format!("failed to spawn ngrok: {}", e)))?;

        let public_url = poll_public_url(NGROK_API_URL).await;
        match &public_url {
            Some(url) => info!(
                public_url = %url,
                endpoint = %format!("{}{}", url.trim_end_matches('/'), SSE_PATH),
                "ngrok tunnel active"
            ),
            None => warn!(
                dashboard = "http://127.0.0.1:4040",
                "ngrok started but its public URL could not be read"
            ),
        }

        Ok(Self { child, public_url })
    }

    pub fn public_url(&self) -> Option<&str> {
        self.public_url.as_deref()
    }

    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Failed to stop ngrok");
        } else {
            info!("ngrok stopped");
        }
    }
}

async fn check_installed() -> ServerResult<()> {
    let check = Command::new("ngrok")
        .arg("version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(VERSION_CHECK_TIMEOUT, check).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(ServerError::Tunnel(format!(
            "`ngrok version` exited with {}",
            status
        ))),
        Ok(Err(e)) => Err(ServerError::Tunnel(format!(
            "ngrok is not installed or not in PATH ({}); see https://ngrok.com/download",
            e
        ))),
        Err(_) => Err(ServerError::Tunnel(
            "`ngrok version` did not answer in time".to_string(),
        )),
    }
}

async fn poll_public_url(api_url: &str) -> Option<String> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .ok()?;

    for attempt in 1..=POLL_ATTEMPTS {
        tokio::time::sleep(POLL_INTERVAL).await;
        let list = match http.get(api_url).send().await {
            Ok(response) => response.json::<TunnelList>().await,
            Err(e) => {
                debug!(attempt, error = %e, "ngrok agent API not ready");
                continue;
            }
        };
        match list {
            Ok(list) => {
                if let Some(url) = select_public_url(&list.tunnels) {
                    return Some(url.to_string());
                }
            }
            Err(e) => debug!(attempt, error = %e, "Unexpected ngrok agent response"),
        }
    }
    None
}
