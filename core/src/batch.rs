//! Partition-grouped batched send protocol.
//!
//! Envelopes are grouped by partition key and packed into broker-native
//! batches, splitting transparently when a batch fills. The contract
//! balances throughput (maximize batch fill) against ordering (envelopes
//! sharing a key are sent in supply order within one call) against failure
//! isolation (one oversize message must not fail its siblings).
//!
//! Hard transport failures follow §at-least-once rules: every envelope of
//! the submitted batch is reported failed through the callback, with no
//! partial-success assumption, and duplicates on redelivery are the
//! consumer's problem to tolerate.

use crate::envelope::Envelope;
use crate::error::TransportError;
use crate::port::sender::{BatchSender, DeliveryCallback, DeliveryFailure, WireBatch};
use crate::wire::{self, WireRecord};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// An ordered sequence of envelopes bound for one channel, submitted
/// atomically.
#[derive(Debug, Clone)]
pub struct OutgoingBatch {
    /// Fully-qualified destination channel.
    pub destination: String,
    /// Envelopes in supply order.
    pub envelopes: Vec<Envelope>,
}

impl OutgoingBatch {
    /// Create a batch for the given channel.
    pub fn new(destination: impl Into<String>, envelopes: Vec<Envelope>) -> Self {
        Self {
            destination: destination.into(),
            envelopes,
        }
    }

    /// Number of envelopes in the batch.
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }
}

/// Accounting for one `send_grouped` call. Every envelope of the batch is
/// also reported exactly once through the [`DeliveryCallback`], except on
/// hard transport failure where the whole batch is re-reported failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSendReport {
    /// Envelopes handed to the broker in flushed batches.
    pub delivered: usize,
    /// Envelopes reported as failures.
    pub failed: usize,
    /// Subset of failures caused by oversize messages.
    pub oversize_rejections: usize,
    /// Wire-level batches flushed.
    pub wire_batches: usize,
    /// Set when the underlying send call failed outright.
    pub transport_error: Option<String>,
}

impl BatchSendReport {
    /// Whether every envelope was delivered.
    pub fn all_delivered(&self) -> bool {
        self.failed == 0 && self.transport_error.is_none()
    }
}

/// Group record indices by partition key, preserving first-appearance
/// order of keys and supply order within each key. Records without a key
/// form their own group keyed by the empty string.
fn group_by_partition_key(records: &[WireRecord]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        let key = record.partition_key().unwrap_or("");
        match index_of.get(key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                index_of.insert(key, groups.len());
                groups.push((key.to_string(), vec![i]));
            }
        }
    }
    groups
}

/// Report every not-yet-attempted envelope as cancelled, starting at the
/// given position within the given group.
fn fail_rest_cancelled(
    batch: &OutgoingBatch,
    groups: &[(String, Vec<usize>)],
    from_group: usize,
    from_pos: usize,
    callback: &dyn DeliveryCallback,
    report: &mut BatchSendReport,
) {
    for (g, (_, indices)) in groups.iter().enumerate().skip(from_group) {
        let start = if g == from_group { from_pos } else { 0 };
        for &idx in &indices[start..] {
            callback.on_failure(&batch.envelopes[idx], &DeliveryFailure::Cancelled);
            report.failed += 1;
        }
    }
}

async fn run_groups<S: BatchSender>(
    sender: &mut S,
    batch: &OutgoingBatch,
    records: &[WireRecord],
    groups: &[(String, Vec<usize>)],
    callback: &dyn DeliveryCallback,
    cancel: &CancellationToken,
    report: &mut BatchSendReport,
) -> Result<(), TransportError> {
    for (g, (key, indices)) in groups.iter().enumerate() {
        if cancel.is_cancelled() {
            fail_rest_cancelled(batch, groups, g, 0, callback, report);
            return Ok(());
        }

        let partition_key = (!key.is_empty()).then_some(key.as_str());
        let mut wire = sender.create_batch(&batch.destination, partition_key).await?;
        let mut pending: Vec<usize> = Vec::new();

        for (p, &idx) in indices.iter().enumerate() {
            let record = &records[idx];
            if wire.try_add(record) {
                pending.push(idx);
                continue;
            }

            if !wire.is_empty() {
                // Batch full: flush, report, retry on a fresh batch.
                sender.send(&batch.destination, wire).await?;
                report.wire_batches += 1;
                for &done in &pending {
                    callback.on_success(&batch.envelopes[done]);
                }
                report.delivered += pending.len();
                pending.clear();

                if cancel.is_cancelled() {
                    fail_rest_cancelled(batch, groups, g, p, callback, report);
                    return Ok(());
                }

                wire = sender.create_batch(&batch.destination, partition_key).await?;
                if wire.try_add(record) {
                    pending.push(idx);
                    continue;
                }
            }

            // An empty batch refused the record: oversize. Isolate the
            // envelope and keep going with its siblings.
            let failure = DeliveryFailure::Oversize {
                size: record.size_hint(),
                limit: wire.capacity(),
            };
            warn!(
                channel = %batch.destination,
                message_id = %batch.envelopes[idx].message_id,
                size = record.size_hint(),
                limit = wire.capacity(),
                "envelope exceeds batch capacity; failing it in isolation"
            );
            callback.on_failure(&batch.envelopes[idx], &failure);
            report.failed += 1;
            report.oversize_rejections += 1;
        }

        if !wire.is_empty() {
            sender.send(&batch.destination, wire).await?;
            report.wire_batches += 1;
            for &done in &pending {
                callback.on_success(&batch.envelopes[done]);
            }
            report.delivered += pending.len();
        }
    }
    Ok(())
}

/// Send a batch, grouped by partition key, reporting each envelope through
/// the callback exactly once (twice only when a hard transport failure
/// re-reports the whole batch as failed). The sender is closed on every
/// exit path.
pub async fn send_grouped<S: BatchSender>(
    sender: &mut S,
    batch: &OutgoingBatch,
    callback: &dyn DeliveryCallback,
    cancel: &CancellationToken,
) -> BatchSendReport {
    let mut report = BatchSendReport::default();
    if batch.is_empty() {
        sender.close().await;
        return report;
    }

    let records: Vec<WireRecord> = batch.envelopes.iter().map(wire::to_wire).collect();
    let groups = group_by_partition_key(&records);
    debug!(
        channel = %batch.destination,
        envelopes = batch.len(),
        groups = groups.len(),
        "sending partition-grouped batch"
    );

    match run_groups(sender, batch, &records, &groups, callback, cancel, &mut report).await {
        Ok(()) => {}
        Err(error) => {
            // Hard transport failure: no partial-success assumption. The
            // entire submitted batch reports as failed.
            warn!(
                channel = %batch.destination,
                error = %error,
                "batch send failed; reporting every envelope in the batch as failed"
            );
            let failure = DeliveryFailure::Transport(error.to_string());
            for envelope in &batch.envelopes {
                callback.on_failure(envelope, &failure);
            }
            report.delivered = 0;
            report.oversize_rejections = 0;
            report.failed = batch.len();
            report.transport_error = Some(error.to_string());
        }
    }

    sender.close().await;
    report
}
