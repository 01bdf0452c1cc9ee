//! Partition key extraction, compiled once per event type.
//!
//! Extraction runs on every publish call, so the factory builds a
//! field-access plan exactly once per distinct event type and caches the
//! resulting closure. Repeat calls are a cache lookup plus field reads and
//! a string join. The cache is read-heavy and write-once-per-type; a
//! concurrent compile for the same type produces an equivalent closure
//! that is discarded without corrupting the cache.

use crate::descriptor::EventDescriptor;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A compiled partition-key extractor: serialized payload in, key out.
pub type KeyExtractor = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Builds and caches one extractor per event type.
#[derive(Default)]
pub struct KeyExtractorFactory {
    cache: DashMap<String, Option<KeyExtractor>>,
    compiled: AtomicU64,
}

impl std::fmt::Debug for KeyExtractorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyExtractorFactory")
            .field("cached_types", &self.cache.len())
            .field("compiled_total", &self.compiled.load(Ordering::Relaxed))
            .finish()
    }
}

impl KeyExtractorFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The extractor for an event type, or `None` when the type declares
    /// no partition-key source (broker default routing applies).
    pub fn extractor_for(&self, descriptor: &EventDescriptor) -> Option<KeyExtractor> {
        if let Some(cached) = self.cache.get(descriptor.event_name()) {
            return cached.value().clone();
        }
        let built = self.compile(descriptor);
        self.cache
            .entry(descriptor.event_name().to_string())
            .or_insert(built)
            .value()
            .clone()
    }

    /// How many extractors have been compiled since startup. First call
    /// per type pays this cost exactly once.
    pub fn compiled_total(&self) -> u64 {
        self.compiled.load(Ordering::Relaxed)
    }

    fn compile(&self, descriptor: &EventDescriptor) -> Option<KeyExtractor> {
        self.compiled.fetch_add(1, Ordering::Relaxed);

        // A custom key function on the type takes precedence entirely.
        if let Some(custom) = descriptor.custom_key() {
            return Some(custom.clone());
        }

        if descriptor.partition_key_fields().is_empty() {
            return None;
        }

        let mut plan: Vec<_> = descriptor.partition_key_fields().to_vec();
        plan.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        let field_names: Vec<String> = plan.into_iter().map(|f| f.name).collect();

        Some(Arc::new(move |payload: &Value| {
            let parts: Vec<String> = field_names
                .iter()
                .map(|name| stringify_field(payload.get(name)))
                .collect();
            Some(parts.join("-"))
        }))
    }
}

/// String form of a payload field for key construction. Missing and null
/// fields contribute an empty segment.
fn stringify_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PartitionKeyField;
    use serde_json::json;

    #[test]
    fn test_explicit_order_wins_over_declaration_order() {
        let descriptor = EventDescriptor::new("OrderCreated", "shop.IntegrationEvents")
            .with_topic("orders")
            .with_key_field(PartitionKeyField::new("CustomerId").with_order(1))
            .with_key_field(PartitionKeyField::new("StoreId").with_order(0));

        let factory = KeyExtractorFactory::new();
        let extractor = factory.extractor_for(&descriptor).unwrap();
        let key = extractor(&json!({ "CustomerId": "c1", "StoreId": "s1" }));
        assert_eq!(key.as_deref(), Some("s1-c1"));
    }

    #[test]
    fn test_alphabetical_fallback_without_explicit_order() {
        let descriptor = EventDescriptor::new("StockAdjusted", "shop.IntegrationEvents")
            .with_topic("stock")
            .with_key_field(PartitionKeyField::new("Sku"))
            .with_key_field(PartitionKeyField::new("Location"));

        let factory = KeyExtractorFactory::new();
        let extractor = factory.extractor_for(&descriptor).unwrap();
        let key = extractor(&json!({ "Sku": "sku-9", "Location": "mad" }));
        assert_eq!(key.as_deref(), Some("mad-sku-9"));
    }

    #[test]
    fn test_single_field_is_stringified_raw() {
        let descriptor = EventDescriptor::new("PaymentTaken", "shop.IntegrationEvents")
            .with_topic("payments")
            .with_key_field(PartitionKeyField::new("OrderId"));

        let factory = KeyExtractorFactory::new();
        let extractor = factory.extractor_for(&descriptor).unwrap();
        assert_eq!(
            extractor(&json!({ "OrderId": "ord-7" })).as_deref(),
            Some("ord-7")
        );
        assert_eq!(extractor(&json!({ "OrderId": 42 })).as_deref(), Some("42"));
    }

    #[test]
    fn test_missing_and_null_fields_yield_empty_segments() {
        let descriptor = EventDescriptor::new("E", "shop.IntegrationEvents")
            .with_topic("t")
            .with_key_field(PartitionKeyField::new("A").with_order(0))
            .with_key_field(PartitionKeyField::new("B").with_order(1));

        let factory = KeyExtractorFactory::new();
        let extractor = factory.extractor_for(&descriptor).unwrap();
        assert_eq!(
            extractor(&json!({ "A": null, "B": "b" })).as_deref(),
            Some("-b")
        );
    }

    #[test]
    fn test_no_key_fields_means_no_extractor() {
        let descriptor =
            EventDescriptor::new("Heartbeat", "shop.IntegrationEvents").with_topic("heartbeats");
        let factory = KeyExtractorFactory::new();
        assert!(factory.extractor_for(&descriptor).is_none());
        // The answer is cached too.
        assert!(factory.extractor_for(&descriptor).is_none());
        assert_eq!(factory.compiled_total(), 1);
    }

    #[test]
    fn test_compilation_happens_once_per_type() {
        let descriptor = EventDescriptor::new("OrderCreated", "shop.IntegrationEvents")
            .with_topic("orders")
            .with_key_field(PartitionKeyField::new("OrderId"));

        let factory = KeyExtractorFactory::new();
        for _ in 0..10 {
            factory.extractor_for(&descriptor).unwrap();
        }
        assert_eq!(factory.compiled_total(), 1);

        let other = EventDescriptor::new("OrderShipped", "shop.IntegrationEvents")
            .with_topic("orders")
            .with_key_field(PartitionKeyField::new("OrderId"));
        factory.extractor_for(&other).unwrap();
        assert_eq!(factory.compiled_total(), 2);
    }

    #[test]
    fn test_custom_key_function_takes_precedence() {
        let descriptor = EventDescriptor::new("OrderCreated", "shop.IntegrationEvents")
            .with_topic("orders")
            .with_key_field(PartitionKeyField::new("CustomerId"))
            .with_custom_key(Arc::new(|payload| {
                payload
                    .get("TenantId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }));

        let factory = KeyExtractorFactory::new();
        let extractor = factory.extractor_for(&descriptor).unwrap();
        let key = extractor(&json!({ "CustomerId": "c1", "TenantId": "tenant-3" }));
        assert_eq!(key.as_deref(), Some("tenant-3"));
    }
}
