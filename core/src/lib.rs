//! # bidali-core
//!
//! Partition-aware event transport core with zero broker dependencies.
//!
//! ## Architecture
//!
//! This crate defines the transport's domain types, the partition-grouped
//! batch protocol, and the ports that broker adapters implement. It never
//! touches the network: `bidali-nats` binds it to NATS JetStream and
//! `bidali-testing` provides in-memory doubles.
//!
//! ## Modules
//!
//! - [`envelope`]: [`Envelope`], the transport-agnostic message unit
//! - [`descriptor`]: [`EventDescriptor`] and the startup-built [`EventRegistry`]
//! - [`classifier`]: publish/subscribe set computation
//! - [`topic`]: deterministic channel name resolution
//! - [`partition_key`]: compile-once-per-type key extractors
//! - [`route`]: the publish route table
//! - [`batch`]: the partition-grouped batched send protocol
//! - [`wire`]: envelope↔wire record mapping
//! - [`port`]: ports for broker adapters
//! - [`config`]: configuration surface with startup validation
//! - [`error`]: the transport error taxonomy
//!
//! ## Usage
//!
//! ```rust
//! use bidali_core::classifier::classify;
//! use bidali_core::descriptor::{EventDescriptor, EventRegistry, PartitionKeyField};
//! use bidali_core::partition_key::KeyExtractorFactory;
//! use bidali_core::route::Router;
//! use bidali_core::topic::TopicResolver;
//!
//! let mut registry = EventRegistry::new();
//! registry
//!     .register(
//!         EventDescriptor::new("OrderCreated", "shop.orders.IntegrationEvents")
//!             .with_topic("orders")
//!             .with_domain("ecommerce")
//!             .with_key_field(PartitionKeyField::new("StoreId").with_order(0))
//!             .with_key_field(PartitionKeyField::new("CustomerId").with_order(1)),
//!     )
//!     .unwrap();
//!
//! let resolver = TopicResolver::new("dev");
//! let factory = KeyExtractorFactory::new();
//! let classification = classify(&registry, &[]);
//! let router = Router::build(&registry, &resolver, &factory, &classification, "checkout");
//!
//! let routed = router
//!     .envelope_for("OrderCreated", &serde_json::json!({ "StoreId": "s1", "CustomerId": "c1" }))
//!     .unwrap();
//! assert_eq!(routed.channel, "dev.ecommerce.public.orders");
//! assert_eq!(routed.envelope.partition_key.as_deref(), Some("s1-c1"));
//! ```

pub mod batch;
pub mod classifier;
pub mod config;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod partition_key;
pub mod port;
pub mod route;
pub mod topic;
pub mod wire;

pub use batch::{send_grouped, BatchSendReport, OutgoingBatch};
pub use classifier::{
    classify, is_event_namespace, is_handler_method, Classification, HandlerRegistration,
    EVENT_NAMESPACE_SUFFIXES,
};
pub use config::{
    BrokerConnection, CheckpointStoreConnection, ConfigError, ConsumerTuning, ProducerTuning,
    TransportConfig,
};
pub use descriptor::{
    CustomKeyFn, EventDescriptor, EventModule, EventRegistry, PartitionKeyField, RegistryError,
    Visibility,
};
pub use envelope::{Envelope, DEFAULT_CONTENT_TYPE};
pub use error::{Result, TransportError};
pub use metrics::TransportMetrics;
pub use partition_key::{KeyExtractor, KeyExtractorFactory};
pub use port::{
    BatchSender, Checkpoint, CheckpointKey, CheckpointStore, DeliveryCallback, DeliveryFailure,
    EnvelopeHandler, EventListener, EventPublisher, HandlerError, InlineSender, ListenerHandle,
    WireBatch,
};
pub use route::{PublishRoute, RoutedEnvelope, Router};
pub use topic::TopicResolver;
pub use wire::{from_wire, reserved_keys, to_wire, WireRecord};
