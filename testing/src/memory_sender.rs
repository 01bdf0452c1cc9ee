//! In-memory batch sender with capacity limits and failure injection.

use async_trait::async_trait;
use bidali_core::error::TransportError;
use bidali_core::port::sender::{BatchSender, WireBatch};
use bidali_core::wire::WireRecord;
use parking_lot::Mutex;
use std::sync::Arc;

/// A wire batch flushed by a [`MemoryBatchSender`].
#[derive(Debug, Clone)]
pub struct FlushedBatch {
    /// Destination channel.
    pub channel: String,
    /// Partition key the batch was opened for.
    pub partition_key: Option<String>,
    /// Records in flush order.
    pub records: Vec<WireRecord>,
}

/// In-memory wire batch enforcing the same byte-budget contract the
/// broker-backed batch does.
#[derive(Debug)]
pub struct MemoryWireBatch {
    partition_key: Option<String>,
    records: Vec<WireRecord>,
    bytes: usize,
    limit: usize,
}

impl WireBatch for MemoryWireBatch {
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

/// Shared state recorded by a [`MemoryBatchSender`].
#[derive(Debug, Default)]
pub struct MemorySenderState {
    /// Every flushed batch, in order.
    pub flushed: Vec<FlushedBatch>,
    /// Whether the sender was closed.
    pub closed: bool,
}

/// In-memory batch sender for protocol tests.
#[derive(Debug, Clone)]
pub struct MemoryBatchSender {
    capacity: usize,
    fail_on_send: Option<usize>,
    state: Arc<Mutex<MemorySenderState>>,
}

impl MemoryBatchSender {
    /// A sender whose wire batches hold up to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            fail_on_send: None,
            state: Arc::new(Mutex::new(MemorySenderState::default())),
        }
    }

    /// Fail the `nth` flush (1-based) with a connectivity error.
    pub fn failing_on(mut self, nth: usize) -> Self {
        self.fail_on_send = Some(nth);
        self
    }

    /// Handle to the recorded state.
    pub fn state(&self) -> Arc<Mutex<MemorySenderState>> {
        self.state.clone()
    }

    /// Number of flushed batches.
    pub fn flush_count(&self) -> usize {
        self.state.lock().flushed.len()
    }

    /// Message ids flushed, in order.
    pub fn flushed_message_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .flushed
            .iter()
            .flat_map(|batch| {
                batch
                    .records
                    .iter()
                    .filter_map(|r| r.properties.get(bidali_core::wire::MESSAGE_ID).cloned())
            })
            .collect()
    }

    /// Whether the sender was closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl BatchSender for MemoryBatchSender {
    type Batch = MemoryWireBatch;

    async fn create_batch(
        &mut self,
        _channel: &str,
        partition_key: Option<&str>,
    ) -> Result<Self::Batch, TransportError> {
        Ok(MemoryWireBatch {
            partition_key: partition_key.map(str::to_string),
            records: Vec::new(),
            bytes: 0,
            limit: self.capacity,
        })
    }

    async fn send(&mut self, channel: &str, batch: Self::Batch) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if let Some(nth) = self.fail_on_send {
            if state.flushed.len() + 1 >= nth {
                return Err(TransportError::Connectivity(
                    "injected send failure".to_string(),
                ));
            }
        }
        state.flushed.push(FlushedBatch {
            channel: channel.to_string(),
            partition_key: batch.partition_key,
            records: batch.records,
        });
        Ok(())
    }

    async fn close(&mut self) {
        self.state.lock().closed = true;
    }
}
