//! Inbound ports: the handler callback the dispatch runtime supplies, the
//! listener registration surface, and the handle used to stop a running
//! listener.

use crate::envelope::Envelope;
use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A handler rejected an envelope. The envelope is redelivered until the
/// configured delivery limit, then diverted to the dead-letter channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("envelope rejected by handler: {reason}")]
pub struct HandlerError {
    /// Human-readable rejection reason.
    pub reason: String,
}

impl HandlerError {
    /// A rejection with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// The dispatch runtime's acceptance callback. Checkpoint advancement only
/// happens after this returns `Ok`.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    /// Accept one consumed envelope.
    async fn handle(&self, envelope: Envelope) -> Result<(), HandlerError>;
}

/// Subscription registration surface.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Start consuming a channel on behalf of a consumer group, yielding
    /// envelopes to the handler. Resumes from the last durable checkpoint.
    async fn listen(
        &self,
        channel: &str,
        consumer_group: &str,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Result<ListenerHandle, TransportError>;
}

/// Handle to a running listener task.
#[derive(Debug)]
pub struct ListenerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Wrap a spawned listener task and its cancellation token.
    pub fn new(cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { cancel, task }
    }

    /// Whether the listener task has stopped on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Request shutdown and wait for the listener to drain.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
