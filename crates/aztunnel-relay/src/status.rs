//! Tunnel readiness probe for Linux App Service targets.
//!
//! The SSH tunnel sidecar starts lazily. Before handing a port to the
//! debugger we wake Kudu with a deployment-log request and poll the tunnel
//! status endpoint until the remote port is reachable.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use aztunnel_core::auth::AccessTokenProvider;
use aztunnel_core::error::{Error, Result};
use aztunnel_core::target::AppServiceTarget;

const STATUS_ATTEMPTS: u32 = 10;
const STATUS_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Reported state of the remote tunnel sidecar.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelStatus {
    pub state: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub can_reach_port: bool,
    #[serde(default)]
    pub msg: String,
}

/// Polls the tunnel status endpoint of one target.
pub struct TunnelStatusClient {
    client: reqwest::Client,
    target: AppServiceTarget,
    token_provider: Arc<dyn AccessTokenProvider>,
}

impl TunnelStatusClient {
    pub fn new(target: AppServiceTarget, token_provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            target,
            token_provider,
        }
    }

    /// Wait until the remote tunnel reports a reachable port.
    ///
    /// A tunnel that is `stopped`, has SSH disabled, or reports an unknown
    /// state is an error. A tunnel still `starting` after all attempts is
    /// logged and tolerated; the first relayed connection will surface the
    /// failure if it persists.
    pub async fn wait_until_started(&self) -> Result<()> {
        self.wake_up().await;

        for attempt in 1..=STATUS_ATTEMPTS {
            let status = self.fetch_status().await?;
            if is_ready(&status)? {
                debug!(app = %self.target.id, attempt, "tunnel ready");
                return Ok(());
            }
            debug!(app = %self.target.id, attempt, state = %status.state, "tunnel not ready yet");
            tokio::time::sleep(STATUS_RETRY_DELAY).await;
        }

        warn!(app = %self.target.id, "tunnel readiness not confirmed, continuing");
        Ok(())
    }

    /// Request the deployment log to wake a cold Kudu site up; the payload
    /// is irrelevant.
    async fn wake_up(&self) {
        if let Ok(token) = self.token_provider.access_token(&self.target.subscription_id).await {
            let _ = self
                .client
                .get(self.target.deployments_url())
                .bearer_auth(token)
                .send()
                .await;
        }
    }

    async fn fetch_status(&self) -> Result<TunnelStatus> {
        let token = self
            .token_provider
            .access_token(&self.target.subscription_id)
            .await?;
        let response = self
            .client
            .get(self.target.tunnel_status_url())
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Tunnel(format!(
                "status endpoint returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

/// Classify a reported tunnel state.
fn is_ready(status: &TunnelStatus) -> Result<bool> {
    match status.state.to_lowercase().as_str() {
        "starting" => Ok(false),
        "stopped" => Err(Error::Tunnel(
            "SSH endpoint is stopped on the remote instance".to_string(),
        )),
        "started" => {
            if status.can_reach_port {
                Ok(true)
            } else {
                Err(Error::Tunnel(format!(
                    "tunnel is up but cannot reach port {} (is SSH enabled in the container?)",
                    status.port
                )))
            }
        }
        other => Err(Error::Tunnel(format!("unknown tunnel state received: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: &str, can_reach_port: bool) -> TunnelStatus {
        TunnelStatus {
            state: state.to_string(),
            port: 2222,
            can_reach_port,
            msg: String::new(),
        }
    }

    #[test]
    fn starting_means_keep_polling() {
        assert_eq!(is_ready(&status("STARTING", false)).ok(), Some(false));
    }

    #[test]
    fn started_with_reachable_port_is_ready() {
        assert_eq!(is_ready(&status("Started", true)).ok(), Some(true));
    }

    #[test]
    fn started_with_unreachable_port_is_an_error() {
        assert!(matches!(is_ready(&status("started", false)), Err(Error::Tunnel(_))));
    }

    #[test]
    fn stopped_is_an_error() {
        assert!(matches!(is_ready(&status("stopped", true)), Err(Error::Tunnel(_))));
    }

    #[test]
    fn unknown_state_is_an_error() {
        assert!(matches!(is_ready(&status("hibernating", true)), Err(Error::Tunnel(_))));
    }

    #[test]
    fn status_payload_deserializes_with_camel_case_fields() {
        let parsed: TunnelStatus = serde_json::from_str(
            r#"{"state":"STARTED","port":2222,"canReachPort":true,"msg":"SSH is available"}"#,
        )
        .expect("well-formed status payload");
        assert_eq!(parsed.state, "STARTED");
        assert_eq!(parsed.port, 2222);
        assert!(parsed.can_reach_port);
    }
}
