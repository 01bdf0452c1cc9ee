//! The outbound surface the dispatch runtime calls.

use crate::batch::OutgoingBatch;
use crate::envelope::Envelope;
use crate::error::TransportError;
use crate::port::sender::DeliveryCallback;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Publishes envelopes to the broker.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Inline, one-at-a-time send. Errors propagate to the caller.
    async fn publish(&self, channel: &str, envelope: Envelope) -> Result<(), TransportError>;

    /// Batched send with per-envelope reporting through the callback.
    /// Transport failures are converted into per-envelope failure reports
    /// rather than propagated. Cancellation prevents starting further
    /// wire batches; it cannot retract batches already handed over.
    async fn publish_batch(
        &self,
        batch: OutgoingBatch,
        callback: Arc<dyn DeliveryCallback>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError>;

    /// Connectivity probe for a channel. Never errors on unreachability.
    async fn ping(&self, channel: &str) -> bool;
}
