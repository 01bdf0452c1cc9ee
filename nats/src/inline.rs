//! Inline single-envelope sends.
//!
//! One cached handle per destination channel, created lazily on first
//! use; no pooling, no rotation. Errors re-raise to the caller, which owns
//! the execution path and wants to observe them. The ping probe requests
//! stream metadata and converts unreachability into `false`.

use async_nats::jetstream::Context as JetStreamContext;
use async_trait::async_trait;
use bidali_core::config::ProducerTuning;
use bidali_core::envelope::Envelope;
use bidali_core::error::TransportError;
use bidali_core::port::sender::InlineSender;
use bidali_core::wire;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::headers::headers_for;
use crate::provision::stream_name_for;

/// Delay between inline retry attempts.
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Cached per-channel sender state.
#[derive(Debug, Clone)]
struct ChannelHandle {
    stream_name: String,
}

/// JetStream-backed inline sender.
#[derive(Debug)]
pub struct NatsInlineSender {
    jetstream: JetStreamContext,
    tuning: ProducerTuning,
    handles: Mutex<HashMap<String, ChannelHandle>>,
}

impl NatsInlineSender {
    /// Wrap a JetStream context.
    pub fn new(jetstream: JetStreamContext, tuning: ProducerTuning) -> Self {
        Self {
            jetstream,
            tuning,
            handles: Mutex::new(HashMap::new()),
        }
    }

    async fn publish_once(&self, channel: &str, envelope: &Envelope) -> Result<(), TransportError> {
        // The partition key travels as routing metadata in the headers.
        let record = wire::to_wire(envelope);
        let headers = headers_for(&record);
        let ack = self
            .jetstream
            .publish_with_headers(channel.to_string(), headers, record.payload)
            .await
            .map_err(|e| TransportError::Connectivity(e.to_string()))?;
        tokio::time::timeout(self.tuning.max_wait(), ack)
            .await
            .map_err(|_| {
                TransportError::Connectivity(format!(
                    "no broker acknowledgment within {:?}",
                    self.tuning.max_wait()
                ))
            })?
            .map_err(|e| TransportError::Connectivity(e.to_string()))?;
        Ok(())
    }

    /// The cached handle for a channel, created on first use by verifying
    /// the backing stream exists.
    async fn handle_for(&self, channel: &str) -> Result<ChannelHandle, TransportError> {
        {
            let handles = self.handles.lock().await;
            if let Some(handle) = handles.get(channel) {
                return Ok(handle.clone());
            }
        }

        let stream_name = stream_name_for(channel);
        self.jetstream
            .get_stream(stream_name.as_str())
            .await
            .map_err(|e| {
                TransportError::Connectivity(format!(
                    "no stream backing channel '{channel}': {e}"
                ))
            })?;

        let handle = ChannelHandle { stream_name };
        let mut handles = self.handles.lock().await;
        let handle = handles
            .entry(channel.to_string())
            .or_insert(handle)
            .clone();
        debug!(channel = %channel, stream = %handle.stream_name, "cached inline sender handle");
        Ok(handle)
    }
}

#[async_trait]
impl InlineSender for NatsInlineSender {
    async fn send(&self, channel: &str, envelope: &Envelope) -> Result<(), TransportError> {
        self.handle_for(channel).await?;

        // Transient failures retry up to the configured limit; the final
        // error re-raises to the caller.
        let mut attempt = 0u32;
        loop {
            match self.publish_once(channel, envelope).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt < self.tuning.retry_limit => {
                    attempt += 1;
                    warn!(
                        channel = %channel,
                        attempt,
                        error = %error,
                        "inline send failed; retrying"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn ping(&self, channel: &str) -> bool {
        match self.jetstream.get_stream(stream_name_for(channel)).await {
            Ok(_) => true,
            Err(error) => {
                warn!(channel = %channel, error = %error, "ping failed");
                false
            }
        }
    }
}
