//! Batched sending over JetStream.
//!
//! A wire batch is a byte-budgeted set of records, the budget being the
//! configured producer limit clamped to the server's advertised maximum
//! payload. Flushing publishes each record with its headers and awaits the
//! JetStream acknowledgments; a failed publish surfaces as a connectivity
//! error and the batch protocol fans it out.
//!
//! One sender serves one batched send call. Its buffers are never shared,
//! so concurrent calls to the same channel cannot interleave.

use async_nats::jetstream::Context as JetStreamContext;
use async_trait::async_trait;
use bidali_core::error::TransportError;
use bidali_core::port::sender::{BatchSender, WireBatch};
use bidali_core::wire::WireRecord;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::headers::headers_for;

/// A byte-budgeted set of records bound for one channel.
#[derive(Debug)]
pub struct NatsWireBatch {
    records: Vec<WireRecord>,
    bytes: usize,
    limit: usize,
}

impl NatsWireBatch {
    fn new(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            bytes: 0,
            limit,
        }
    }
}

impl WireBatch for NatsWireBatch {
    fn try_add(&mut self, record: &WireRecord) -> bool {
        let size = record.size_hint();
        if self.bytes + size > self.limit {
            return false;
        }
        self.bytes += size;
        self.records.push(record.clone());
        true
    }

    fn count(&self) -> usize {
        self.records.len()
    }

    fn capacity(&self) -> usize {
        self.limit
    }
}

/// JetStream-backed batch sender.
#[derive(Debug)]
pub struct NatsBatchSender {
    jetstream: Option<JetStreamContext>,
    batch_limit: usize,
    ack_wait: Duration,
}

impl NatsBatchSender {
    /// A sender with the given wire-batch byte budget and per-record
    /// acknowledgment wait. The caller clamps the budget to the server's
    /// maximum payload.
    pub fn new(jetstream: JetStreamContext, batch_limit: usize, ack_wait: Duration) -> Self {
        Self {
            jetstream: Some(jetstream),
            batch_limit,
            ack_wait,
        }
    }

    fn context(&self) -> Result<&JetStreamContext, TransportError> {
        self.jetstream
            .as_ref()
            .ok_or_else(|| TransportError::Connectivity("sender already closed".to_string()))
    }
}

#[async_trait]
impl BatchSender for NatsBatchSender {
    type Batch = NatsWireBatch;

    async fn create_batch(
        &mut self,
        _channel: &str,
        _partition_key: Option<&str>,
    ) -> Result<Self::Batch, TransportError> {
        self.context()?;
        Ok(NatsWireBatch::new(self.batch_limit))
    }

    async fn send(&mut self, channel: &str, batch: Self::Batch) -> Result<(), TransportError> {
        let jetstream = self.context()?.clone();
        let count = batch.count();
        for record in batch.records {
            let headers = headers_for(&record);
            let ack = jetstream
                .publish_with_headers(channel.to_string(), headers, record.payload)
                .await
                .map_err(|e| TransportError::Connectivity(e.to_string()))?;
            timeout(self.ack_wait, ack)
                .await
                .map_err(|_| {
                    TransportError::Connectivity(format!(
                        "no broker acknowledgment within {:?}",
                        self.ack_wait
                    ))
                })?
                .map_err(|e| TransportError::Connectivity(e.to_string()))?;
        }
        debug!(channel = %channel, records = count, "flushed wire batch");
        Ok(())
    }

    async fn close(&mut self) {
        // Dropping the context releases the producer handle; further use
        // of this sender is an error.
        self.jetstream = None;
    }
}
