use crate::error::{InspectorError, InspectorResult};
use crate::protocol::{OutboundEnvelope, encode_outbound};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Outbound half of the host channel. Sends are fire-and-forget: `Ok`
/// means the message was handed off, not that the host saw it.
pub trait EventChannel {
    fn send(&self, envelope: OutboundEnvelope) -> InspectorResult<()>;
}

/// Bounded queue of encoded frames drained by the socket writer task.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(tx: mpsc::Sender<String>, capacity: usize) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            capacity,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventChannel for OutboundQueue {
    fn send(&self, envelope: OutboundEnvelope) -> InspectorResult<()> {
        let frame = encode_outbound(&envelope)?;

        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_frame)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped.is_power_of_two() {
                    tracing::warn!(
                        capacity = self.capacity,
                        dropped,
                        "outbound queue full; dropping message"
                    );
                }
                Ok(())
            }
            Err(TrySendError::Closed(_frame)) => Err(InspectorError::channel_unavailable(
                "outbound queue closed",
            )),
        }
    }
}
