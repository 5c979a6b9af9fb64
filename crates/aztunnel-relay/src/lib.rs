//! App Service tunnel relay engine:
//! - byte relays over TCP sockets and WebSocket tunnel sessions
//! - per-connection orchestration with symmetric teardown
//! - a relay server owning one local listener per remote target
//! - a process-wide provider cache (one server, one port per target)

pub mod error;
pub mod provider;
pub mod relay;
pub mod server;
pub mod status;

pub use error::{RelayError, ServerError};
pub use provider::RelayServerProvider;
pub use server::RelayServer;
pub use status::TunnelStatusClient;
