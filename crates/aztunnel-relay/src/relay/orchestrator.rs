//! Pairs two relays and pumps frames between them.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Relay;
use crate::error::RelayError;

/// Wires two relays together for the lifetime of one proxied connection.
///
/// Owns the two frame channels connecting the pair. When either relay's
/// processing loop finishes, normally or with an error, the other side is
/// cancelled immediately, so a dead transport never leaves its peer pumping
/// into the void.
pub struct RelayOrchestrator<A, B> {
    first: A,
    second: B,
    channel_capacity: usize,
}

impl<A: Relay, B: Relay> RelayOrchestrator<A, B> {
    pub fn new(first: A, second: B, channel_capacity: usize) -> Self {
        Self {
            first,
            second,
            channel_capacity,
        }
    }

    /// Run both relays until the connection ends.
    ///
    /// Transport failures are logged and absorbed so callers can treat one
    /// proxied connection as a self-contained unit of work; only panics
    /// escape, to be reported by the owning task reaper.
    pub async fn start(self) {
        let (first_to_second_tx, first_to_second_rx) = mpsc::channel(self.channel_capacity);
        let (second_to_first_tx, second_to_first_rx) = mpsc::channel(self.channel_capacity);

        let result = tokio::select! {
            res = self.first.process(second_to_first_rx, first_to_second_tx) => res,
            res = self.second.process(first_to_second_rx, second_to_first_tx) => res,
        };

        match result {
            Ok(()) => debug!("relay pair finished"),
            Err(error @ (RelayError::Io(_) | RelayError::WebSocket(_))) => {
                warn!(%error, "relay connection problem");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use tokio::sync::Notify;

    use super::*;
    use crate::relay::{FrameReceiver, FrameSender};

    /// Produces a fixed set of frames, then either finishes or parks so the
    /// paired relay keeps running.
    struct ProducerRelay {
        frames: Vec<Bytes>,
        sent: Arc<AtomicUsize>,
        park_after_send: bool,
    }

    impl Relay for ProducerRelay {
        async fn process(
            self,
            _receive_from: FrameReceiver,
            send_to: FrameSender,
        ) -> Result<(), RelayError> {
            for frame in self.frames {
                if send_to.send(frame).await.is_err() {
                    break;
                }
                self.sent.fetch_add(1, Ordering::SeqCst);
            }
            if self.park_after_send {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    /// Collects every inbound frame until its channel closes.
    struct CollectorRelay {
        collected: FrameSender,
    }

    impl Relay for CollectorRelay {
        async fn process(
            self,
            mut receive_from: FrameReceiver,
            _send_to: FrameSender,
        ) -> Result<(), RelayError> {
            while let Some(frame) = receive_from.recv().await {
                if self.collected.send(frame).await.is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    /// Blocks until notified, never consuming its inbound channel.
    struct StalledRelay {
        go: Arc<Notify>,
    }

    impl Relay for StalledRelay {
        async fn process(
            self,
            _receive_from: FrameReceiver,
            _send_to: FrameSender,
        ) -> Result<(), RelayError> {
            self.go.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn frames_flow_from_first_to_second() {
        let frames = vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")];
        let sent = Arc::new(AtomicUsize::new(0));
        let (collected_tx, mut collected_rx) = mpsc::channel(16);

        // Park the producer after sending so its completion cannot cancel
        // the collector before the frames cross.
        let orchestrator = RelayOrchestrator::new(
            ProducerRelay {
                frames: frames.clone(),
                sent: Arc::clone(&sent),
                park_after_send: true,
            },
            CollectorRelay {
                collected: collected_tx,
            },
            16,
        );
        let handle = tokio::spawn(orchestrator.start());

        for expected in &frames {
            let frame = tokio::time::timeout(std::time::Duration::from_secs(1), collected_rx.recv())
                .await
                .expect("frame must cross the pair promptly");
            assert_eq!(frame.as_ref(), Some(expected));
        }

        handle.abort();
    }

    #[tokio::test]
    async fn completion_of_one_side_ends_the_pair() {
        let sent = Arc::new(AtomicUsize::new(0));
        let (collected_tx, _collected_rx) = mpsc::channel(16);

        // The producer finishes immediately; start() must return even
        // though the collector would otherwise wait forever.
        let orchestrator = RelayOrchestrator::new(
            ProducerRelay {
                frames: Vec::new(),
                sent,
                park_after_send: false,
            },
            CollectorRelay {
                collected: collected_tx,
            },
            16,
        );

        tokio::time::timeout(std::time::Duration::from_secs(1), orchestrator.start())
            .await
            .expect("orchestrator must finish when one relay completes");
    }

    #[tokio::test]
    async fn bounded_channel_applies_backpressure() {
        let capacity = 4;
        let frames: Vec<Bytes> = (0..capacity + 2)
            .map(|i| Bytes::from(vec![u8::try_from(i).unwrap_or(0)]))
            .collect();
        let sent = Arc::new(AtomicUsize::new(0));
        let go = Arc::new(Notify::new());

        let orchestrator = RelayOrchestrator::new(
            ProducerRelay {
                frames,
                sent: Arc::clone(&sent),
                park_after_send: false,
            },
            StalledRelay { go: Arc::clone(&go) },
            capacity,
        );
        let handle = tokio::spawn(orchestrator.start());

        // Let the producer run until it suspends on the full channel.
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            sent.load(Ordering::SeqCst),
            capacity,
            "producer must suspend once the channel is full"
        );

        // Unblock the stalled side; its completion cancels the producer.
        go.notify_one();
        handle.await.expect("orchestrator task must not panic");
    }
}
