//! Durable consumption checkpoints.
//!
//! A checkpoint marks the last fully-processed position for one
//! `(channel, partition, consumer group)`. It is created lazily on first
//! successful consumption, read on consumer startup to resume, and never
//! rolled back by the library. Advancement must never precede successful
//! hand-off of the envelopes it covers.

use crate::error::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
    /// Fully-qualified channel name.
    pub channel: String,
    /// Broker partition identifier. Brokers without first-class
    /// partitions use `"0"`.
    pub partition: String,
    /// Consumer group name.
    pub consumer_group: String,
}

impl CheckpointKey {
    /// A key for a broker without first-class partitions.
    pub fn unpartitioned(channel: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            partition: "0".to_string(),
            consumer_group: consumer_group.into(),
        }
    }
}

impl std::fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.consumer_group, self.channel, self.partition)
    }
}

/// A durable position marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// What this checkpoint covers.
    pub key: CheckpointKey,
    /// Last fully-processed broker sequence.
    pub sequence: u64,
    /// When the checkpoint was written.
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// A checkpoint at the given sequence, stamped now.
    pub fn at(key: CheckpointKey, sequence: u64) -> Self {
        Self {
            key,
            sequence,
            updated_at: Utc::now(),
        }
    }
}

/// Externally durable checkpoint persistence.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the last durable checkpoint, if one exists.
    async fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>, TransportError>;

    /// Persist a checkpoint. A store error must surface so consumption
    /// stalls instead of silently advancing.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_key_display() {
        let key = CheckpointKey::unpartitioned("dev.shop.public.orders", "billing-dev");
        assert_eq!(key.to_string(), "billing-dev/dev.shop.public.orders/0");
    }

    #[test]
    fn test_checkpoint_serializes_round_trip() {
        let checkpoint = Checkpoint::at(
            CheckpointKey::unpartitioned("dev.shop.public.orders", "billing-dev"),
            42,
        );
        let bytes = serde_json::to_vec(&checkpoint).unwrap();
        let restored: Checkpoint = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(restored, checkpoint);
    }
}
