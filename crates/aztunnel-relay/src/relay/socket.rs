//! TCP socket side of a proxied connection.

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::{FrameReceiver, FrameSender, Relay};
use crate::error::RelayError;

/// Adapts one accepted TCP connection to a frame-channel pair.
pub struct SocketRelay {
    socket: TcpStream,
    read_buffer_size: usize,
}

impl SocketRelay {
    pub fn new(socket: TcpStream, read_buffer_size: usize) -> Self {
        Self {
            socket,
            read_buffer_size,
        }
    }
}

impl Relay for SocketRelay {
    async fn process(
        mut self,
        mut receive_from: FrameReceiver,
        send_to: FrameSender,
    ) -> Result<(), RelayError> {
        let buffer_size = self.read_buffer_size;
        let (mut reader, mut writer) = self.socket.split();

        let read_loop = async move {
            let mut buffer = vec![0u8; buffer_size];
            loop {
                let read = reader.read(&mut buffer).await?;
                if read == 0 {
                    break; // EOF
                }
                if send_to.send(Bytes::copy_from_slice(&buffer[..read])).await.is_err() {
                    break; // paired relay is gone
                }
            }
            Ok::<(), RelayError>(())
        };

        let write_loop = async move {
            while let Some(frame) = receive_from.recv().await {
                writer.write_all(&frame).await?;
                writer.flush().await?;
            }
            Ok::<(), RelayError>(())
        };

        // Either loop finishing cancels the other: an EOF on the read side
        // must stop the writer, and a closed inbound channel must stop the
        // reader.
        let result = tokio::select! {
            res = read_loop => res,
            res = write_loop => res,
        };

        let _ = self.socket.shutdown().await;
        debug!("socket relay closed");
        result
    }
}
