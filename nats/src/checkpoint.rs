//! Durable checkpoints on a JetStream key-value bucket.
//!
//! Keys are `{consumer_group}.{channel}.{partition}`; values are the JSON
//! form of the checkpoint. Store errors surface unmodified so the listener
//! stalls rather than advancing past unprocessed records.

use async_nats::jetstream::kv;
use async_nats::jetstream::Context as JetStreamContext;
use async_trait::async_trait;
use bidali_core::config::{CheckpointStoreConnection, ConfigError, TransportConfig};
use bidali_core::error::TransportError;
use bidali_core::port::checkpoint::{Checkpoint, CheckpointKey, CheckpointStore};
use tracing::debug;

/// Default bucket name for transport checkpoints.
pub const DEFAULT_BUCKET: &str = "bidali-checkpoints";

/// Checkpoint store backed by a JetStream KV bucket.
#[derive(Debug, Clone)]
pub struct KvCheckpointStore {
    bucket: kv::Store,
}

impl KvCheckpointStore {
    /// The bucket name selected by the transport's checkpoint store
    /// setting: a connection string names the bucket directly (with an
    /// optional `kv://` scheme), a container URI contributes its last
    /// path segment.
    pub fn bucket_name(config: &TransportConfig) -> Result<String, ConfigError> {
        let connection = config
            .checkpoint_store
            .as_ref()
            .ok_or(ConfigError::MissingCheckpointStore)?;
        let bucket = match connection {
            CheckpointStoreConnection::ConnectionString(raw) => {
                raw.strip_prefix("kv://").unwrap_or(raw).to_string()
            }
            CheckpointStoreConnection::Container { uri, .. } => uri
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(DEFAULT_BUCKET)
                .to_string(),
        };
        Ok(bucket)
    }

    /// Open the bucket selected by the transport configuration.
    pub async fn from_transport(
        jetstream: &JetStreamContext,
        config: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let bucket = Self::bucket_name(config)?;
        Self::open(jetstream, &bucket).await
    }

    /// Open (or create) the checkpoint bucket.
    pub async fn open(
        jetstream: &JetStreamContext,
        bucket_name: &str,
    ) -> Result<Self, TransportError> {
        let bucket = jetstream
            .create_key_value(kv::Config {
                bucket: bucket_name.to_string(),
                history: 1,
                ..Default::default()
            })
            .await
            .map_err(|e| TransportError::CheckpointStore(e.to_string()))?;
        Ok(Self { bucket })
    }

    fn entry_key(key: &CheckpointKey) -> String {
        format!("{}.{}.{}", key.consumer_group, key.channel, key.partition)
    }
}

#[async_trait]
impl CheckpointStore for KvCheckpointStore {
    async fn load(&self, key: &CheckpointKey) -> Result<Option<Checkpoint>, TransportError> {
        let entry_key = Self::entry_key(key);
        let value = self
            .bucket
            .get(entry_key.as_str())
            .await
            .map_err(|e| TransportError::CheckpointStore(e.to_string()))?;
        match value {
            Some(bytes) => {
                let checkpoint: Checkpoint = serde_json::from_slice(&bytes)
                    .map_err(|e| TransportError::CheckpointStore(e.to_string()))?;
                Ok(Some(checkpoint))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), TransportError> {
        let entry_key = Self::entry_key(&checkpoint.key);
        let bytes = serde_json::to_vec(checkpoint)
            .map_err(|e| TransportError::CheckpointStore(e.to_string()))?;
        self.bucket
            .put(entry_key.as_str(), bytes.into())
            .await
            .map_err(|e| TransportError::CheckpointStore(e.to_string()))?;
        debug!(key = %checkpoint.key, sequence = checkpoint.sequence, "checkpoint saved");
        Ok(())
    }
}
