//! Transport metrics for observability.

use std::sync::Arc;
use tokio::sync::Mutex;

/// Counters maintained by broker adapters.
#[derive(Debug, Default, Clone)]
pub struct TransportMetrics {
    published: Arc<Mutex<u64>>,
    publish_failures: Arc<Mutex<u64>>,
    consumed: Arc<Mutex<u64>>,
    checkpoints_saved: Arc<Mutex<u64>>,
    dead_lettered: Arc<Mutex<u64>>,
}

impl TransportMetrics {
    /// Fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the published counter.
    pub async fn inc_published(&self) {
        let mut count = self.published.lock().await;
        *count += 1;
    }

    /// Increment the publish-failure counter.
    pub async fn inc_publish_failure(&self) {
        let mut count = self.publish_failures.lock().await;
        *count += 1;
    }

    /// Increment the consumed counter.
    pub async fn inc_consumed(&self) {
        let mut count = self.consumed.lock().await;
        *count += 1;
    }

    /// Increment the checkpoint counter.
    pub async fn inc_checkpoint_saved(&self) {
        let mut count = self.checkpoints_saved.lock().await;
        *count += 1;
    }

    /// Increment the dead-letter counter.
    pub async fn inc_dead_lettered(&self) {
        let mut count = self.dead_lettered.lock().await;
        *count += 1;
    }

    /// Current snapshot: (published, publish failures, consumed,
    /// checkpoints saved, dead-lettered).
    pub async fn snapshot(&self) -> (u64, u64, u64, u64, u64) {
        let published = *self.published.lock().await;
        let publish_failures = *self.publish_failures.lock().await;
        let consumed = *self.consumed.lock().await;
        let checkpoints_saved = *self.checkpoints_saved.lock().await;
        let dead_lettered = *self.dead_lettered.lock().await;
        (
            published,
            publish_failures,
            consumed,
            checkpoints_saved,
            dead_lettered,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters_accumulate() {
        let metrics = TransportMetrics::new();
        metrics.inc_published().await;
        metrics.inc_published().await;
        metrics.inc_consumed().await;
        metrics.inc_dead_lettered().await;

        let (published, failures, consumed, checkpoints, dead_lettered) =
            metrics.snapshot().await;
        assert_eq!(published, 2);
        assert_eq!(failures, 0);
        assert_eq!(consumed, 1);
        assert_eq!(checkpoints, 0);
        assert_eq!(dead_lettered, 1);
    }
}
