//! Checkpointed consumption from JetStream.
//!
//! One durable pull consumer per `(channel, consumer group)`. Records map
//! through the wire layer into envelopes and hand off to the dispatch
//! runtime's handler; the checkpoint advances only after the handler
//! accepts, then the record is acknowledged. A record that keeps failing
//! is diverted to the channel's dead-letter subject once the delivery
//! limit is reached, and the checkpoint advances past it.

use async_nats::jetstream::consumer::pull::Config as PullConsumerConfig;
use async_nats::jetstream::consumer::{AckPolicy, DeliverPolicy, PullConsumer};
use async_nats::jetstream::{AckKind, Context as JetStreamContext};
use async_trait::async_trait;
use bidali_core::config::ConsumerTuning;
use bidali_core::error::TransportError;
use bidali_core::metrics::TransportMetrics;
use bidali_core::port::checkpoint::{Checkpoint, CheckpointKey, CheckpointStore};
use bidali_core::port::listener::{EnvelopeHandler, EventListener, ListenerHandle};
use bidali_core::wire::from_wire;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::headers::record_from;
use crate::provision::{dead_letter_subject, stream_name_for};

/// Durable consumer name for a subscription. Consumer names cannot contain
/// subject token separators.
fn durable_name_for(channel: &str, consumer_group: &str) -> String {
    format!("{consumer_group}-{channel}").replace('.', "_")
}

/// What to do with a consumed record after the handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumeAction {
    /// Checkpoint, then acknowledge.
    Advance,
    /// Leave the checkpoint alone and request redelivery.
    Redeliver,
    /// Divert to the dead-letter subject, then checkpoint past it.
    DeadLetter,
}

fn action_for(
    handled: &Result<(), bidali_core::port::listener::HandlerError>,
    delivered: i64,
    max_deliveries: u32,
) -> ConsumeAction {
    match handled {
        Ok(()) => ConsumeAction::Advance,
        Err(_) if delivered >= i64::from(max_deliveries) => ConsumeAction::DeadLetter,
        Err(_) => ConsumeAction::Redeliver,
    }
}

/// JetStream-backed listener with externally durable checkpoints.
pub struct NatsListener {
    jetstream: JetStreamContext,
    checkpoints: Arc<dyn CheckpointStore>,
    tuning: ConsumerTuning,
    metrics: TransportMetrics,
}

impl NatsListener {
    /// A listener using the given checkpoint store and tuning.
    pub fn new(
        jetstream: JetStreamContext,
        checkpoints: Arc<dyn CheckpointStore>,
        tuning: ConsumerTuning,
    ) -> Self {
        Self {
            jetstream,
            checkpoints,
            tuning,
            metrics: TransportMetrics::new(),
        }
    }

    /// The listener's counters.
    pub fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }
}

#[async_trait]
impl EventListener for NatsListener {
    async fn listen(
        &self,
        channel: &str,
        consumer_group: &str,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Result<ListenerHandle, TransportError> {
        let key = CheckpointKey::unpartitioned(channel, consumer_group);
        let resume_from = self
            .checkpoints
            .load(&key)
            .await?
            .map(|checkpoint| checkpoint.sequence);

        let stream = self
            .jetstream
            .get_stream(stream_name_for(channel))
            .await
            .map_err(|e| {
                TransportError::Connectivity(format!("no stream backing channel '{channel}': {e}"))
            })?;

        let deliver_policy = match resume_from {
            Some(sequence) => DeliverPolicy::ByStartSequence {
                start_sequence: sequence + 1,
            },
            None => DeliverPolicy::All,
        };

        let consumer_name = durable_name_for(channel, consumer_group);
        let consumer: PullConsumer = stream
            .get_or_create_consumer(
                &consumer_name,
                PullConsumerConfig {
                    durable_name: Some(consumer_name.clone()),
                    filter_subject: channel.to_string(),
                    deliver_policy,
                    ack_policy: AckPolicy::Explicit,
                    max_batch: self.tuning.fetch_batch_size as i64,
                    max_expires: self.tuning.max_wait(),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TransportError::Connectivity(e.to_string()))?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| TransportError::Connectivity(e.to_string()))?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let jetstream = self.jetstream.clone();
        let checkpoints = self.checkpoints.clone();
        let metrics = self.metrics.clone();
        let max_deliveries = self.tuning.max_delivery_attempts;
        let channel = channel.to_string();
        let dlq_subject = dead_letter_subject(&channel);

        let task = tokio::spawn(async move {
            info!(
                channel = %channel,
                consumer = %consumer_name,
                resume_from = ?resume_from,
                "📥 Listener started"
            );
            let mut last_sequence = resume_from.unwrap_or(0);

            loop {
                let next = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    next = messages.next() => next,
                };

                let message = match next {
                    Some(Ok(message)) => message,
                    Some(Err(error)) => {
                        warn!(channel = %channel, error = %error, "error receiving message");
                        continue;
                    }
                    None => {
                        debug!(channel = %channel, "message stream ended");
                        break;
                    }
                };

                let (sequence, delivered) = match message.info() {
                    Ok(info) => (info.stream_sequence, info.delivered),
                    Err(error) => {
                        warn!(channel = %channel, error = %error, "message without delivery info");
                        continue;
                    }
                };

                if sequence <= last_sequence {
                    // Redelivery of an already-checkpointed record.
                    if let Err(error) = message.ack().await {
                        warn!(channel = %channel, error = %error, "failed to ack duplicate");
                    }
                    continue;
                }

                let record = record_from(message.headers.as_ref(), message.payload.clone());
                let envelope = from_wire(&record);

                let handled = handler.handle(envelope).await;
                match action_for(&handled, delivered, max_deliveries) {
                    ConsumeAction::Advance => {
                        // Checkpoint strictly after successful hand-off.
                        let checkpoint = Checkpoint::at(key.clone(), sequence);
                        if let Err(error) = checkpoints.save(&checkpoint).await {
                            // Never advance past unprocessed records: leave
                            // the message unacknowledged and let redelivery
                            // retry the checkpoint write.
                            error!(
                                channel = %channel,
                                sequence,
                                error = %error,
                                "checkpoint save failed; stalling this partition"
                            );
                            if let Err(error) = message.ack_with(AckKind::Nak(None)).await {
                                warn!(channel = %channel, error = %error, "failed to nak");
                            }
                            continue;
                        }
                        metrics.inc_checkpoint_saved().await;
                        last_sequence = sequence;
                        if let Err(error) = message.ack().await {
                            warn!(channel = %channel, error = %error, "failed to ack");
                        }
                        metrics.inc_consumed().await;
                    }
                    ConsumeAction::DeadLetter => {
                        // Poison record: divert to the dead-letter subject
                        // and advance past it.
                        warn!(
                            channel = %channel,
                            sequence,
                            delivered,
                            error = ?handled.err(),
                            "delivery limit reached; diverting to dead-letter channel"
                        );
                        let headers = crate::headers::headers_for(&record);
                        let diverted = match jetstream
                            .publish_with_headers(
                                dlq_subject.clone(),
                                headers,
                                record.payload.clone(),
                            )
                            .await
                        {
                            Ok(ack) => ack.await.is_ok(),
                            Err(_) => false,
                        };

                        if diverted {
                            let checkpoint = Checkpoint::at(key.clone(), sequence);
                            if let Err(error) = checkpoints.save(&checkpoint).await {
                                error!(channel = %channel, error = %error, "checkpoint save failed after diversion");
                                let _ = message.ack_with(AckKind::Nak(None)).await;
                                continue;
                            }
                            last_sequence = sequence;
                            metrics.inc_dead_lettered().await;
                            if let Err(error) = message.ack().await {
                                warn!(channel = %channel, error = %error, "failed to ack diverted record");
                            }
                        } else {
                            warn!(channel = %channel, sequence, "dead-letter publish failed; will retry");
                            let _ = message.ack_with(AckKind::Nak(None)).await;
                        }
                    }
                    ConsumeAction::Redeliver => {
                        debug!(
                            channel = %channel,
                            sequence,
                            delivered,
                            error = ?handled.err(),
                            "handler rejected envelope; requesting redelivery"
                        );
                        if let Err(error) = message.ack_with(AckKind::Nak(None)).await {
                            warn!(channel = %channel, error = %error, "failed to nak");
                        }
                    }
                }
            }
            info!(channel = %channel, "listener stopped");
        });

        Ok(ListenerHandle::new(cancel, task))
    }
}
