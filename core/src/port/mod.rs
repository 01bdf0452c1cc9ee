//! Ports for broker adapters.
//!
//! The core crate has zero broker dependencies; adapters (NATS, in-memory
//! test doubles) implement these traits.

pub mod checkpoint;
pub mod listener;
pub mod publisher;
pub mod sender;

pub use checkpoint::{Checkpoint, CheckpointKey, CheckpointStore};
pub use listener::{EnvelopeHandler, EventListener, HandlerError, ListenerHandle};
pub use publisher::EventPublisher;
pub use sender::{BatchSender, DeliveryCallback, DeliveryFailure, InlineSender, WireBatch};
