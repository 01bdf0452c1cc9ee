//! Delivery callback that records every per-envelope outcome.

use bidali_core::envelope::Envelope;
use bidali_core::port::sender::{DeliveryCallback, DeliveryFailure};
use parking_lot::Mutex;
use uuid::Uuid;

/// Records successes and failures for assertions.
#[derive(Debug, Default)]
pub struct CollectingCallback {
    successes: Mutex<Vec<Uuid>>,
    failures: Mutex<Vec<(Uuid, DeliveryFailure)>>,
}

impl CollectingCallback {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Message ids reported successful, in order.
    pub fn successes(&self) -> Vec<Uuid> {
        self.successes.lock().clone()
    }

    /// Message ids and reasons reported failed, in order.
    pub fn failures(&self) -> Vec<(Uuid, DeliveryFailure)> {
        self.failures.lock().clone()
    }

    /// Total number of reports.
    pub fn reported_total(&self) -> usize {
        self.successes.lock().len() + self.failures.lock().len()
    }
}

impl DeliveryCallback for CollectingCallback {
    fn on_success(&self, envelope: &Envelope) {
        self.successes.lock().push(envelope.message_id);
    }

    fn on_failure(&self, envelope: &Envelope, failure: &DeliveryFailure) {
        self.failures.lock().push((envelope.message_id, failure.clone()));
    }
}
