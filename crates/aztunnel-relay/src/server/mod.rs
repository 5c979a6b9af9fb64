//! Relay server: local listening endpoint bridged to one remote tunnel.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use aztunnel_core::RelayConfig;
use aztunnel_core::auth::AccessTokenProvider;
use aztunnel_core::credentials::RemoteCredentials;
use aztunnel_core::target::{AppServiceOs, AppServiceTarget};

use crate::error::ServerError;
use crate::relay::{RelayOrchestrator, SocketRelay, TunnelRequest, WebSocketRelay};

/// Local TCP listener owning one OS-assigned loopback port.
struct SocketServer {
    listener: TcpListener,
    port: u16,
}

impl SocketServer {
    async fn bind(host: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((host, 0)).await.map_err(ServerError::Bind)?;
        let port = listener.local_addr().map_err(ServerError::Bind)?.port();
        Ok(Self { listener, port })
    }

    async fn accept(&self) -> std::io::Result<(TcpStream, std::net::SocketAddr)> {
        self.listener.accept().await
    }
}

/// Bridges a local listening socket to one remote tunnel endpoint.
///
/// Owns the listener for its whole lifetime. Every accepted connection gets
/// a fresh relay pair and a freshly fetched bearer token; connection
/// outcomes never stop the accept loop.
pub struct RelayServer {
    target: AppServiceTarget,
    config: RelayConfig,
    token_provider: Arc<dyn AccessTokenProvider>,
    socket_server: SocketServer,
    credentials: RemoteCredentials,
}

impl RelayServer {
    /// Bind the local listener and derive debugger-facing credentials.
    pub async fn bind(
        target: AppServiceTarget,
        config: RelayConfig,
        token_provider: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ServerError> {
        let socket_server = SocketServer::bind(&config.bind_host).await?;
        let credentials =
            RemoteCredentials::for_target(&target, config.bind_host.clone(), socket_server.port)?;
        info!(app = %target.id, port = socket_server.port, "relay server bound");
        Ok(Self {
            target,
            config,
            token_provider,
            socket_server,
            credentials,
        })
    }

    /// Local endpoint a debugger should attach to.
    pub fn remote_credentials(&self) -> &RemoteCredentials {
        &self.credentials
    }

    /// OS-assigned port of the local listener.
    pub fn port(&self) -> u16 {
        self.socket_server.port
    }

    /// Target this server relays to.
    pub fn target(&self) -> &AppServiceTarget {
        &self.target
    }

    /// Accept debugger connections until shutdown is signalled.
    ///
    /// Each accepted connection is relayed on its own task. On shutdown the
    /// listener closes and in-flight relays are aborted.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut relays = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.socket_server.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            debug!(app = %self.target.id, %peer, "accepted debugger connection");
                            let server = Arc::clone(&self);
                            relays.spawn(async move { server.relay_connection(socket).await });
                        }
                        Err(e) => {
                            warn!(app = %self.target.id, error = %e, "accept failed");
                        }
                    }
                }
                Some(finished) = relays.join_next(), if !relays.is_empty() => {
                    if let Err(e) = finished {
                        if !e.is_cancelled() {
                            error!(app = %self.target.id, error = %e, "relay task failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!(app = %self.target.id, "relay server shutting down");
                    break;
                }
            }
        }

        relays.shutdown().await;
    }

    /// Bridge one accepted socket to the remote tunnel.
    async fn relay_connection(&self, socket: TcpStream) {
        let request = self.tunnel_request().await;
        let websocket_relay = WebSocketRelay::new(request, self.config.ping_interval);
        let socket_relay = SocketRelay::new(socket, self.config.read_buffer_size);
        RelayOrchestrator::new(websocket_relay, socket_relay, self.config.channel_capacity)
            .start()
            .await;
    }

    /// Build the WebSocket handshake for one connection attempt.
    ///
    /// The token is fetched fresh every time; a cached one could expire
    /// while the server sits idle between connections.
    async fn tunnel_request(&self) -> TunnelRequest {
        let token = match self
            .token_provider
            .access_token(&self.target.subscription_id)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                // TODO: fail the connection instead of sending an empty
                // bearer, which the tunnel rejects with an opaque 401.
                warn!(app = %self.target.id, error = %e, "token fetch failed, proceeding with empty bearer");
                String::new()
            }
        };

        let mut request = TunnelRequest::new(self.target.tunnel_url(), token)
            .with_header("Cache-Control", "no-cache");
        if self.target.os == AppServiceOs::Windows {
            request = request
                .with_header("Agent-username", &self.target.id)
                .with_header("Agent-password", &self.target.id);
        }
        request
    }
}
