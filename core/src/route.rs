//! Publish route table.
//!
//! Built once from the classification result: each publishable event gets
//! its resolved channel and, when the type declares one, its compiled
//! partition-key extractor. The router stamps envelopes exactly once; the
//! partition key is never recomputed downstream.

use crate::classifier::Classification;
use crate::descriptor::EventRegistry;
use crate::envelope::Envelope;
use crate::error::TransportError;
use crate::partition_key::{KeyExtractor, KeyExtractorFactory};
use crate::topic::TopicResolver;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

/// The wiring for one publishable event type.
#[derive(Clone)]
pub struct PublishRoute {
    channel: String,
    extractor: Option<KeyExtractor>,
}

impl std::fmt::Debug for PublishRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishRoute")
            .field("channel", &self.channel)
            .field("extractor", &self.extractor.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl PublishRoute {
    /// Destination channel for the event type.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the event type carries a partition key.
    pub fn has_partition_key(&self) -> bool {
        self.extractor.is_some()
    }
}

/// An envelope stamped with its destination channel.
#[derive(Debug, Clone)]
pub struct RoutedEnvelope {
    /// Destination channel.
    pub channel: String,
    /// The stamped envelope.
    pub envelope: Envelope,
}

/// Routes outgoing events onto channels with partition keys attached.
#[derive(Debug)]
pub struct Router {
    routes: HashMap<String, PublishRoute>,
    source: String,
}

impl Router {
    /// Build the route table for the classification's publish set.
    ///
    /// Events whose channel cannot be resolved are skipped with a warning,
    /// mirroring the lenient classification policy.
    pub fn build(
        registry: &EventRegistry,
        resolver: &TopicResolver,
        factory: &KeyExtractorFactory,
        classification: &Classification,
        source: impl Into<String>,
    ) -> Self {
        let mut routes = HashMap::new();
        for event_name in &classification.publish_set {
            let Some(descriptor) = registry.get(event_name) else {
                warn!(event = %event_name, "publish set references an unregistered event type");
                continue;
            };
            let Some(channel) = resolver.resolve(registry, descriptor) else {
                warn!(event = %event_name, "cannot resolve a channel; skipping route");
                continue;
            };
            let extractor = factory.extractor_for(descriptor);
            routes.insert(event_name.clone(), PublishRoute { channel, extractor });
        }
        info!(routes = routes.len(), "publish route table ready");
        Self {
            routes,
            source: source.into(),
        }
    }

    /// The route for an event type, if it is publishable.
    pub fn route(&self, event_name: &str) -> Option<&PublishRoute> {
        self.routes.get(event_name)
    }

    /// Distinct destination channels, for provisioning.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .routes
            .values()
            .map(|r| r.channel.clone())
            .collect();
        channels.sort();
        channels.dedup();
        channels
    }

    /// Stamp a new envelope for an event: destination channel, source,
    /// sent timestamp and the partition key, computed exactly once here.
    pub fn envelope_for(
        &self,
        event_name: &str,
        payload: &Value,
    ) -> Result<RoutedEnvelope, TransportError> {
        let route = self
            .routes
            .get(event_name)
            .ok_or_else(|| TransportError::UnknownEvent(event_name.to_string()))?;

        let body = serde_json::to_vec(payload).map_err(|e| TransportError::Mapping {
            key: "payload".to_string(),
            reason: e.to_string(),
        })?;

        let mut envelope = Envelope::new(event_name, Bytes::from(body))
            .with_source(self.source.clone())
            .with_sent_at(Utc::now());

        if let Some(extractor) = &route.extractor {
            if let Some(key) = extractor(payload).filter(|k| !k.is_empty()) {
                envelope = envelope.with_partition_key(key);
            }
        }

        Ok(RoutedEnvelope {
            channel: route.channel.clone(),
            envelope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::descriptor::{EventDescriptor, PartitionKeyField};
    use serde_json::json;

    fn wiring() -> (EventRegistry, TopicResolver, KeyExtractorFactory) {
        let mut registry = EventRegistry::new();
        registry
            .register(
                EventDescriptor::new("OrderCreated", "shop.orders.IntegrationEvents")
                    .with_topic("orders")
                    .with_domain("ecommerce")
                    .with_key_field(PartitionKeyField::new("CustomerId").with_order(1))
                    .with_key_field(PartitionKeyField::new("StoreId").with_order(0)),
            )
            .unwrap();
        registry
            .register(
                EventDescriptor::new("Heartbeat", "shop.ops.DomainEvents").with_topic("heartbeats"),
            )
            .unwrap();
        (registry, TopicResolver::new("dev"), KeyExtractorFactory::new())
    }

    #[test]
    fn test_router_stamps_channel_and_key_once() {
        let (registry, resolver, factory) = wiring();
        let classification = classify(&registry, &[]);
        let router = Router::build(&registry, &resolver, &factory, &classification, "checkout");

        let routed = router
            .envelope_for("OrderCreated", &json!({ "CustomerId": "c1", "StoreId": "s1" }))
            .unwrap();
        assert_eq!(routed.channel, "dev.ecommerce.public.orders");
        assert_eq!(routed.envelope.partition_key.as_deref(), Some("s1-c1"));
        assert_eq!(routed.envelope.source, "checkout");
        assert!(routed.envelope.sent_at.is_some());
    }

    #[test]
    fn test_router_without_key_fields_leaves_key_unset() {
        let (registry, resolver, factory) = wiring();
        let classification = classify(&registry, &[]);
        let router = Router::build(&registry, &resolver, &factory, &classification, "checkout");

        let routed = router.envelope_for("Heartbeat", &json!({})).unwrap();
        assert!(routed.envelope.partition_key.is_none());
    }

    #[test]
    fn test_unknown_event_is_a_typed_error() {
        let (registry, resolver, factory) = wiring();
        let classification = classify(&registry, &[]);
        let router = Router::build(&registry, &resolver, &factory, &classification, "checkout");

        let error = router.envelope_for("Ghost", &json!({})).unwrap_err();
        assert!(matches!(error, TransportError::UnknownEvent(_)));
    }

    #[test]
    fn test_channels_are_distinct_and_sorted() {
        let (registry, resolver, factory) = wiring();
        let classification = classify(&registry, &[]);
        let router = Router::build(&registry, &resolver, &factory, &classification, "checkout");
        assert_eq!(
            router.channels(),
            vec![
                "dev.ecommerce.public.orders".to_string(),
                "dev.shop.public.heartbeats".to_string(),
            ]
        );
    }
}
