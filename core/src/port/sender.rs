//! Outbound ports: wire batches, batch senders, inline senders and the
//! per-envelope delivery callback.

use crate::envelope::Envelope;
use crate::error::TransportError;
use crate::wire::WireRecord;
use async_trait::async_trait;
use thiserror::Error;

/// A broker-native batch under construction.
pub trait WireBatch: Send {
    /// Try to append a record. Returns `false` when the record does not
    /// fit the remaining capacity. A record refused by an *empty* batch is
    /// oversize for this broker.
    fn try_add(&mut self, record: &WireRecord) -> bool;

    /// Number of records currently in the batch.
    fn count(&self) -> usize;

    /// Capacity of the batch in bytes, as advertised by the broker.
    fn capacity(&self) -> usize;

    /// Whether the batch holds no records.
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// A producer handle able to build and flush wire batches.
///
/// One sender serves one `send_grouped` call: its internal buffers are not
/// safe for concurrent mutation, so concurrent batch sends to the same
/// channel use independent senders.
#[async_trait]
pub trait BatchSender: Send {
    /// The broker-native batch type.
    type Batch: WireBatch;

    /// Open a new, empty wire batch for the channel.
    async fn create_batch(
        &mut self,
        channel: &str,
        partition_key: Option<&str>,
    ) -> Result<Self::Batch, TransportError>;

    /// Flush a batch to the broker. Consumes the batch: once handed over
    /// it cannot be retracted.
    async fn send(&mut self, channel: &str, batch: Self::Batch) -> Result<(), TransportError>;

    /// Release the underlying producer resource. Called on every exit
    /// path of the batched send protocol.
    async fn close(&mut self);
}

/// A low-throughput, immediate single-envelope sender.
#[async_trait]
pub trait InlineSender: Send + Sync {
    /// Send one envelope now. Errors propagate to the caller; inline
    /// sends sit on a caller-owned execution path that wants to observe
    /// them.
    async fn send(&self, channel: &str, envelope: &Envelope) -> Result<(), TransportError>;

    /// Verify connectivity by requesting broker metadata for the channel.
    /// Unreachability converts to `false`, never an error.
    async fn ping(&self, channel: &str) -> bool;
}

/// Why an envelope failed delivery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The envelope cannot fit an empty wire batch.
    #[error("message of {size} bytes cannot fit an empty batch of {limit} bytes")]
    Oversize { size: usize, limit: usize },

    /// The underlying send call failed; no partial-success assumption is
    /// made for the submitted batch.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The batch send was cancelled before this envelope was attempted.
    #[error("cancelled before send")]
    Cancelled,
}

/// Per-envelope reporting contract for batch sends.
pub trait DeliveryCallback: Send + Sync {
    /// The envelope was handed to the broker as part of a flushed batch.
    fn on_success(&self, envelope: &Envelope);

    /// The envelope was not delivered.
    fn on_failure(&self, envelope: &Envelope, failure: &DeliveryFailure);
}
