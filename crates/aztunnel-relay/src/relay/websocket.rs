//! WebSocket side of a proxied connection.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::{self, handshake::client::Request};
use tracing::{debug, warn};

use super::{FrameReceiver, FrameSender, Relay};
use crate::error::RelayError;

/// Handshake parameters for one tunnel WebSocket session.
///
/// Built fresh for every accepted connection so the bearer token is current
/// at connect time.
#[derive(Debug, Clone)]
pub struct TunnelRequest {
    url: String,
    bearer_token: String,
    extra_headers: Vec<(String, String)>,
}

impl TunnelRequest {
    pub fn new(url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: bearer_token.into(),
            extra_headers: Vec::new(),
        }
    }

    /// Add a handshake header, e.g. the Windows tunnel agent credentials.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    fn into_client_request(self) -> Result<Request, RelayError> {
        let mut request = self.url.as_str().into_client_request()?;
        let headers = request.headers_mut();

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.bearer_token))
            .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
        headers.insert(AUTHORIZATION, bearer);

        for (name, value) in self.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
            headers.insert(name, value);
        }

        Ok(request)
    }
}

/// Adapts an authenticated WebSocket tunnel session to a frame-channel pair.
///
/// Opens exactly one session per [`Relay::process`] call. Tunnel payload
/// travels as binary frames; a Close frame ends the session gracefully.
pub struct WebSocketRelay {
    request: TunnelRequest,
    ping_interval: Duration,
}

impl WebSocketRelay {
    pub fn new(request: TunnelRequest, ping_interval: Duration) -> Self {
        Self {
            request,
            ping_interval,
        }
    }
}

impl Relay for WebSocketRelay {
    async fn process(
        self,
        mut receive_from: FrameReceiver,
        send_to: FrameSender,
    ) -> Result<(), RelayError> {
        let ping_interval = self.ping_interval;
        let request = self.request.into_client_request()?;
        let (stream, _response) = connect_async(request).await?;
        let (mut sink, mut source) = stream.split();

        let receive_loop = async move {
            while let Some(message) = source.next().await {
                match message? {
                    Message::Binary(data) => {
                        if send_to.send(data).await.is_err() {
                            break; // paired relay is gone
                        }
                    }
                    Message::Close(_) => {
                        debug!("close frame received, shutting down");
                        break;
                    }
                    // Keepalive traffic; ping replies are handled by the
                    // protocol layer.
                    Message::Ping(_) | Message::Pong(_) => {}
                    Message::Text(text) => {
                        warn!(len = text.len(), "ignoring unexpected text frame from tunnel");
                    }
                    Message::Frame(_) => {}
                }
            }
            Ok::<(), RelayError>(())
        };

        let send_loop = async move {
            let mut ping_timer = tokio::time::interval(ping_interval);
            ping_timer.tick().await; // Skip first immediate tick
            loop {
                tokio::select! {
                    frame = receive_from.recv() => match frame {
                        Some(data) => sink.send(Message::Binary(data)).await?,
                        None => break,
                    },
                    _ = ping_timer.tick() => {
                        sink.send(Message::Ping(Bytes::new())).await?;
                    }
                }
            }
            let _ = sink.close().await;
            Ok::<(), RelayError>(())
        };

        let result = tokio::select! {
            res = receive_loop => res,
            res = send_loop => res,
        };

        debug!("websocket relay closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_bearer_and_extra_headers() {
        let request = TunnelRequest::new("ws://127.0.0.1:9999/tunnel", "tok-123")
            .with_header("Cache-Control", "no-cache")
            .with_header("Agent-username", "app-1")
            .into_client_request()
            .expect("a loopback ws url is always valid");

        let headers = request.headers();
        assert_eq!(headers.get(AUTHORIZATION).map(|v| v.as_bytes()), Some(&b"Bearer tok-123"[..]));
        assert_eq!(
            headers.get("Cache-Control").map(|v| v.as_bytes()),
            Some(&b"no-cache"[..])
        );
        assert_eq!(
            headers.get("Agent-username").map(|v| v.as_bytes()),
            Some(&b"app-1"[..])
        );
    }

    #[test]
    fn empty_bearer_is_still_a_valid_header() {
        let request = TunnelRequest::new("ws://127.0.0.1:9999/tunnel", "")
            .into_client_request()
            .expect("empty tokens must not fail request construction");
        assert_eq!(
            request.headers().get(AUTHORIZATION).map(|v| v.as_bytes()),
            Some(&b"Bearer "[..])
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        let result = TunnelRequest::new("not a url", "tok").into_client_request();
        assert!(result.is_err());
    }
}
