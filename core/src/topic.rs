//! Deterministic channel name resolution.
//!
//! Publishers and independently-deployed subscribers must derive the same
//! channel name without coordination, so resolution is a pure function of
//! the descriptor, the registry's domain metadata and the configured
//! environment: `{environment}.{domain}.{scope}.{topic}[.{version}]`,
//! lowercased.

use crate::descriptor::{EventDescriptor, EventRegistry};

/// Resolves event descriptors to fully-qualified channel names.
#[derive(Debug, Clone)]
pub struct TopicResolver {
    environment: String,
}

impl TopicResolver {
    /// A resolver for the given deployment environment.
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    /// The environment segment this resolver stamps on channel names.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Resolve the channel name for a descriptor. Returns `None` when the
    /// descriptor carries no routing metadata.
    pub fn resolve(&self, registry: &EventRegistry, descriptor: &EventDescriptor) -> Option<String> {
        if !descriptor.is_routable() {
            return None;
        }
        let topic = descriptor.topic()?;
        let domain = registry.domain_for(descriptor);
        let scope = descriptor.visibility().scope();
        let topic = if descriptor.pluralize() {
            pluralize(topic)
        } else {
            topic.to_string()
        };

        let mut channel = format!("{}.{}.{}.{}", self.environment, domain, scope, topic);
        if let Some(version) = descriptor.version() {
            channel.push('.');
            channel.push_str(version);
        }
        Some(channel.to_lowercase())
    }
}

/// English pluralization for topic names.
fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{word}es")
    } else if let Some(stem) = word.strip_suffix('y') {
        let preceded_by_vowel = stem
            .chars()
            .last()
            .is_some_and(|c| "aeiou".contains(c.to_ascii_lowercase()));
        if preceded_by_vowel {
            format!("{word}s")
        } else {
            format!("{stem}ies")
        }
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EventDescriptor, EventModule};

    fn registry() -> EventRegistry {
        let mut registry = EventRegistry::new();
        registry.register_module(EventModule::new("shop.orders.IntegrationEvents"));
        registry
    }

    fn order_created() -> EventDescriptor {
        EventDescriptor::new("OrderCreated", "shop.orders.IntegrationEvents")
            .with_topic("orders")
            .with_domain("ecommerce")
    }

    #[test]
    fn test_resolution_matches_expected_shape() {
        let registry = registry();
        let resolver = TopicResolver::new("dev");
        let channel = resolver.resolve(&registry, &order_created()).unwrap();
        assert_eq!(channel, "dev.ecommerce.public.orders");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let registry = registry();
        let resolver = TopicResolver::new("dev");
        let descriptor = order_created();
        let first = resolver.resolve(&registry, &descriptor);
        let second = resolver.resolve(&registry, &descriptor);
        assert_eq!(first, second);
    }

    #[test]
    fn test_internal_scope_and_version_suffix() {
        let registry = registry();
        let resolver = TopicResolver::new("staging");
        let descriptor = EventDescriptor::new("StockAdjusted", "shop.orders.IntegrationEvents")
            .with_topic("Stock")
            .with_domain("Warehouse")
            .internal()
            .with_version("v2");
        assert_eq!(
            resolver.resolve(&registry, &descriptor).unwrap(),
            "staging.warehouse.internal.stock.v2"
        );
    }

    #[test]
    fn test_pluralization_opt_in() {
        let registry = registry();
        let resolver = TopicResolver::new("dev");

        let order = EventDescriptor::new("A", "shop.orders.IntegrationEvents")
            .with_topic("order")
            .with_domain("ecommerce")
            .pluralized();
        assert_eq!(
            resolver.resolve(&registry, &order).unwrap(),
            "dev.ecommerce.public.orders"
        );

        let dispatch = EventDescriptor::new("B", "shop.orders.IntegrationEvents")
            .with_topic("dispatch")
            .with_domain("ecommerce")
            .pluralized();
        assert_eq!(
            resolver.resolve(&registry, &dispatch).unwrap(),
            "dev.ecommerce.public.dispatches"
        );

        let delivery = EventDescriptor::new("C", "shop.orders.IntegrationEvents")
            .with_topic("delivery")
            .with_domain("ecommerce")
            .pluralized();
        assert_eq!(
            resolver.resolve(&registry, &delivery).unwrap(),
            "dev.ecommerce.public.deliveries"
        );
    }

    #[test]
    fn test_unroutable_descriptor_resolves_to_none() {
        let registry = registry();
        let resolver = TopicResolver::new("dev");
        let descriptor = EventDescriptor::new("Ghost", "shop.orders.IntegrationEvents");
        assert!(resolver.resolve(&registry, &descriptor).is_none());
    }

    #[test]
    fn test_domain_falls_back_to_module_segment() {
        let mut registry = EventRegistry::new();
        registry
            .register(
                EventDescriptor::new("OrderCreated", "shop.orders.IntegrationEvents")
                    .with_topic("orders"),
            )
            .unwrap();
        let resolver = TopicResolver::new("dev");
        let descriptor = registry.get("OrderCreated").unwrap().clone();
        assert_eq!(
            resolver.resolve(&registry, &descriptor).unwrap(),
            "dev.shop.public.orders"
        );
    }
}
