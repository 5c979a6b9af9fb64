//! Debugger-facing connection credentials for a relay endpoint.

use crate::error::{Error, Result};
use crate::target::{AppServiceOs, AppServiceTarget};

/// Linux tunnel containers run sshd with fixed defaults.
const LINUX_TUNNEL_USER: &str = "root";
const LINUX_TUNNEL_PASSWORD: &str = "Docker!";

/// How a debugger should connect to the local end of the tunnel.
///
/// Derived once when the relay server binds and cached for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    /// Loopback host the relay listens on.
    pub host: String,
    /// OS-assigned port of the local listener.
    pub port: u16,
    pub user_name: String,
    pub password: String,
    /// The tunnel terminates on loopback, so host key checks stay off.
    pub strict_host_key_checking: bool,
}

impl RemoteCredentials {
    /// Derive credentials for a target listening on `host:port`.
    ///
    /// Windows tunnel agents authenticate with the app's resource ID on
    /// both fields; Linux tunnel containers use the sshd defaults. Custom
    /// containers have no tunnel agent at all.
    pub fn for_target(target: &AppServiceTarget, host: impl Into<String>, port: u16) -> Result<Self> {
        let (user_name, password) = match target.os {
            AppServiceOs::Windows => (target.id.clone(), target.id.clone()),
            AppServiceOs::Linux => (LINUX_TUNNEL_USER.to_string(), LINUX_TUNNEL_PASSWORD.to_string()),
            AppServiceOs::Docker => return Err(Error::UnsupportedOs(target.os.to_string())),
        };

        Ok(Self {
            host: host.into(),
            port,
            user_name,
            password,
            strict_host_key_checking: false,
        })
    }
}
