//! Process-wide cache of relay servers keyed by remote target.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::info;

use aztunnel_core::RelayConfig;
use aztunnel_core::auth::AccessTokenProvider;
use aztunnel_core::target::AppServiceTarget;

use crate::error::ServerError;
use crate::server::RelayServer;

/// Hands out at most one running [`RelayServer`] per remote target.
///
/// Servers live until [`RelayServerProvider::shutdown`] (or until the
/// provider is dropped): repeated attach requests against the same app
/// reuse the existing local port.
pub struct RelayServerProvider {
    config: RelayConfig,
    token_provider: Arc<dyn AccessTokenProvider>,
    servers: Mutex<HashMap<String, Arc<RelayServer>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl RelayServerProvider {
    pub fn new(config: RelayConfig, token_provider: Arc<dyn AccessTokenProvider>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            token_provider,
            servers: Mutex::new(HashMap::new()),
            shutdown_tx,
        }
    }

    /// Get the relay server for a target, creating and starting it on first
    /// request.
    ///
    /// Concurrent calls for the same target never bind two listeners: the
    /// map lock is held across creation, so exactly one caller creates the
    /// server and the rest observe it.
    pub async fn relay_server_for(
        &self,
        target: &AppServiceTarget,
    ) -> Result<Arc<RelayServer>, ServerError> {
        let mut servers = self.servers.lock().await;
        if let Some(server) = servers.get(&target.id) {
            return Ok(Arc::clone(server));
        }

        let server = Arc::new(
            RelayServer::bind(
                target.clone(),
                self.config.clone(),
                Arc::clone(&self.token_provider),
            )
            .await?,
        );
        servers.insert(target.id.clone(), Arc::clone(&server));

        let accept_loop = Arc::clone(&server);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let _accept_handle = tokio::spawn(accept_loop.run(shutdown_rx));

        info!(app = %target.id, port = server.port(), "relay server started");
        Ok(server)
    }

    /// Stop all relay servers and abort their in-flight relays.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
