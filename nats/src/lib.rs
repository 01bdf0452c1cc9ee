//! # bidali-nats
//!
//! NATS JetStream adapter for the bidali event transport.
//!
//! # Features
//!
//! - **Durable Consumers**: one pull consumer per channel and consumer
//!   group, surviving restarts
//! - **External Checkpoints**: consumption position lives in a JetStream
//!   KV bucket and advances only after the dispatch runtime accepts
//! - **At-Least-Once Delivery**: unacknowledged records redeliver; poison
//!   records divert to a dead-letter subject after the delivery limit
//! - **Partition-Grouped Batching**: wire batches are byte-budgeted
//!   against the server's maximum payload
//!
//! # Subject Mapping
//!
//! Channel names map one-to-one onto subjects
//! (`dev.ecommerce.public.orders`), each backed by a stream whose name is
//! the upper-snake form of the channel. The channel's dead-letter subject
//! (`{channel}.dlq`) is bound to the same stream.

pub mod batch_sender;
pub mod checkpoint;
pub mod config;
pub mod headers;
pub mod inline;
pub mod listener;
pub mod provision;
pub mod publisher;

pub use batch_sender::{NatsBatchSender, NatsWireBatch};
pub use checkpoint::{KvCheckpointStore, DEFAULT_BUCKET};
pub use config::NatsTransportConfig;
pub use inline::NatsInlineSender;
pub use listener::NatsListener;
pub use provision::{dead_letter_subject, ensure_stream, provision_channels, stream_name_for};
pub use publisher::NatsEventPublisher;
