//! The JetStream-backed publish surface.
//!
//! Implements the transport's [`EventPublisher`] port: the inline path
//! re-raises errors to the caller, the batched path opens a fresh batch
//! sender per call (independent producer buffers for concurrent calls to
//! the same channel) and converts transport failures into per-envelope
//! failure reports.

use async_nats::jetstream::Context as JetStreamContext;
use async_nats::Client;
use async_trait::async_trait;
use bidali_core::batch::{send_grouped, OutgoingBatch};
use bidali_core::config::TransportConfig;
use bidali_core::envelope::Envelope;
use bidali_core::error::TransportError;
use bidali_core::metrics::TransportMetrics;
use bidali_core::port::publisher::EventPublisher;
use bidali_core::port::sender::{DeliveryCallback, InlineSender};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::batch_sender::NatsBatchSender;
use crate::inline::NatsInlineSender;

/// JetStream-backed publisher.
pub struct NatsEventPublisher {
    jetstream: JetStreamContext,
    inline: NatsInlineSender,
    batch_limit: usize,
    ack_wait: std::time::Duration,
    metrics: TransportMetrics,
}

impl NatsEventPublisher {
    /// Build a publisher. The wire-batch budget is the configured producer
    /// limit clamped to the server's advertised maximum payload.
    pub fn new(client: &Client, config: &TransportConfig) -> Self {
        let server_max = client.server_info().max_payload;
        let batch_limit = config.producer.batch_limit_bytes.min(server_max);
        debug!(
            configured = config.producer.batch_limit_bytes,
            server_max, batch_limit, "wire batch budget"
        );

        let jetstream = async_nats::jetstream::new(client.clone());
        Self {
            inline: NatsInlineSender::new(jetstream.clone(), config.producer.clone()),
            jetstream,
            batch_limit,
            ack_wait: config.producer.max_wait(),
            metrics: TransportMetrics::new(),
        }
    }

    /// The publisher's counters.
    pub fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, channel: &str, envelope: Envelope) -> Result<(), TransportError> {
        match self.inline.send(channel, &envelope).await {
            Ok(()) => {
                self.metrics.inc_published().await;
                Ok(())
            }
            Err(error) => {
                self.metrics.inc_publish_failure().await;
                Err(error)
            }
        }
    }

    async fn publish_batch(
        &self,
        batch: OutgoingBatch,
        callback: Arc<dyn DeliveryCallback>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        // One sender per call: producer buffers are never shared between
        // concurrent batch sends.
        let mut sender = NatsBatchSender::new(self.jetstream.clone(), self.batch_limit, self.ack_wait);
        let report = send_grouped(&mut sender, &batch, callback.as_ref(), &cancel).await;

        for _ in 0..report.delivered {
            self.metrics.inc_published().await;
        }
        for _ in 0..report.failed {
            self.metrics.inc_publish_failure().await;
        }
        Ok(())
    }

    async fn ping(&self, channel: &str) -> bool {
        self.inline.ping(channel).await
    }
}
