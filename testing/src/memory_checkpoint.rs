//! In-memory checkpoint store.

use async_trait::async_trait;
use bidali_core::error::TransportError;
use bidali_core::port::checkpoint::{Checkpoint, CheckpointKey, CheckpointStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Checkpoint store held in process memory, with optional write-failure
/// injection for stall-path tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryCheckpointStore {
    checkpoints: Arc<Mutex<HashMap<CheckpointKey, Checkpoint>>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl MemoryCheckpointStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail, so tests can assert that
    /// consumption stalls instead of advancing.
    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// The stored sequence for a key, if any.
    pub fn sequence(&self, key: &CheckpointKey) -> Option<u64> {
        self.checkpoints.lock().get(key).map(|c| c.sequence)
    }

    /// Number of stored checkpoints.
    pub fn len(&self) -> usize {
        self.checkpoints.lock().len()
    }

    /// Whether no checkpoint has been stored.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.lock().is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>, TransportError> {
        Ok(self.checkpoints.lock().get(key).cloned())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), TransportError> {
        if *self.fail_saves.lock() {
            return Err(TransportError::CheckpointStore(
                "injected checkpoint failure".to_string(),
            ));
        }
        self.checkpoints
            .lock()
            .insert(checkpoint.key.clone(), checkpoint.clone());
        Ok(())
    }
}
