//! Remote App Service target identity.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Operating system of the remote App Service plan.
///
/// Selects which credential and handshake-header variant the relay server
/// uses; the relay mechanics themselves are identical across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppServiceOs {
    Windows,
    Linux,
    /// Custom-container plans. The tunnel agent is not available there.
    Docker,
}

impl std::str::FromStr for AppServiceOs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "docker" => Ok(Self::Docker),
            other => Err(Error::Config(format!(
                "Unknown operating system \"{other}\" (expected windows, linux or docker)"
            ))),
        }
    }
}

impl std::fmt::Display for AppServiceOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::Docker => write!(f, "docker"),
        }
    }
}

/// Identity of one remote App Service app.
///
/// The resource `id` keys the relay-server cache: one relay server (and one
/// local port) exists per distinct `id` at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppServiceTarget {
    /// Azure resource ID of the app.
    pub id: String,
    /// Hostname of the app's Kudu (SCM) site, e.g. `myapp.scm.azurewebsites.net`.
    pub kudu_host: String,
    /// Subscription the app belongs to; scopes token requests.
    pub subscription_id: String,
    /// Operating system of the hosting plan.
    pub os: AppServiceOs,
    tunnel_url: String,
}

impl AppServiceTarget {
    pub fn new(
        id: impl Into<String>,
        kudu_host: impl Into<String>,
        subscription_id: impl Into<String>,
        os: AppServiceOs,
    ) -> Self {
        let kudu_host = kudu_host.into();
        let tunnel_url = format!("wss://{kudu_host}/AppServiceTunnel/Tunnel.ashx");
        Self {
            id: id.into(),
            kudu_host,
            subscription_id: subscription_id.into(),
            os,
            tunnel_url,
        }
    }

    /// Override the tunnel endpoint, e.g. a plain `ws://` endpoint in
    /// development.
    #[must_use]
    pub fn with_tunnel_url(mut self, url: impl Into<String>) -> Self {
        self.tunnel_url = url.into();
        self
    }

    /// WebSocket endpoint of the remote tunnel.
    pub fn tunnel_url(&self) -> &str {
        &self.tunnel_url
    }

    /// Status endpoint of the tunnel sidecar.
    pub fn tunnel_status_url(&self) -> String {
        format!(
            "https://{}/AppServiceTunnel/Tunnel.ashx?GetStatus&GetStatusAPIVer=2",
            self.kudu_host
        )
    }

    /// Deployment-log endpoint; requesting it wakes a cold Kudu site up.
    pub fn deployments_url(&self) -> String {
        format!("https://{}/api/deployments", self.kudu_host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(os: AppServiceOs) -> AppServiceTarget {
        AppServiceTarget::new("app-1", "myapp.scm.azurewebsites.net", "sub-1", os)
    }

    #[test]
    fn tunnel_url_derived_from_kudu_host() {
        assert_eq!(
            target(AppServiceOs::Linux).tunnel_url(),
            "wss://myapp.scm.azurewebsites.net/AppServiceTunnel/Tunnel.ashx"
        );
    }

    #[test]
    fn tunnel_url_override() {
        let target = target(AppServiceOs::Linux).with_tunnel_url("ws://127.0.0.1:9999/tunnel");
        assert_eq!(target.tunnel_url(), "ws://127.0.0.1:9999/tunnel");
    }

    #[test]
    fn status_url_uses_v2_api() {
        assert_eq!(
            target(AppServiceOs::Windows).tunnel_status_url(),
            "https://myapp.scm.azurewebsites.net/AppServiceTunnel/Tunnel.ashx?GetStatus&GetStatusAPIVer=2"
        );
    }

    #[test]
    fn os_parses_case_insensitively() {
        assert_eq!("Windows".parse::<AppServiceOs>().ok(), Some(AppServiceOs::Windows));
        assert_eq!("LINUX".parse::<AppServiceOs>().ok(), Some(AppServiceOs::Linux));
        assert!("solaris".parse::<AppServiceOs>().is_err());
    }
}
