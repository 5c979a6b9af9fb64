//! Bidirectional byte relays between transports.
//!
//! A [`Relay`] moves bytes unchanged between one concrete transport and a
//! pair of in-memory frame channels. Two relays wired together by a
//! [`RelayOrchestrator`] form one proxied connection.

mod orchestrator;
mod socket;
mod websocket;

pub use orchestrator::RelayOrchestrator;
pub use socket::SocketRelay;
pub use websocket::{TunnelRequest, WebSocketRelay};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::RelayError;

/// Receiving half of a frame channel.
pub type FrameReceiver = mpsc::Receiver<Bytes>;
/// Sending half of a frame channel.
pub type FrameSender = mpsc::Sender<Bytes>;

/// One side of a proxied connection.
///
/// `process` consumes the relay: it pumps bytes between its transport and
/// the given channel pair until either direction closes, then releases the
/// transport. A relay instance is scoped to exactly one connection and
/// never reused.
pub trait Relay: Send + 'static {
    fn process(
        self,
        receive_from: FrameReceiver,
        send_to: FrameSender,
    ) -> impl std::future::Future<Output = Result<(), RelayError>> + Send;
}
