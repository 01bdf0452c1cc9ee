//! Event type descriptors and the registry that replaces runtime
//! reflection.
//!
//! The source of truth for routing is an [`EventRegistry`] built once at
//! service startup: each module registers its default domain, each event
//! type registers a descriptor. Descriptors are immutable after
//! registration; their topic names and partition-key field order are
//! stable for the lifetime of the process.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Declared visibility of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Visible to any subscriber.
    Public,
    /// Restricted to the owning service's deployment boundary.
    Internal,
}

impl Visibility {
    /// The channel-name scope segment for this visibility.
    pub fn scope(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Internal => "internal",
        }
    }
}

/// A field that contributes to the partition key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionKeyField {
    /// Field name as it appears in the serialized payload.
    pub name: String,
    /// Explicit zero-based position. Fields without one sort as position
    /// zero; ties break on the field name, which gives the alphabetical
    /// fallback.
    pub order: Option<u32>,
}

impl PartitionKeyField {
    /// A field with no explicit ordering hint.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), order: None }
    }

    /// Set the explicit position.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    /// Effective sort key: explicit order first, then name.
    pub(crate) fn sort_key(&self) -> (u32, &str) {
        (self.order.unwrap_or(0), self.name.as_str())
    }
}

/// Custom partition-key function. Takes precedence over field-derived
/// extraction entirely.
pub type CustomKeyFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Immutable routing metadata for one event type.
#[derive(Clone)]
pub struct EventDescriptor {
    event_name: String,
    module: String,
    topic: Option<String>,
    domain: Option<String>,
    visibility: Visibility,
    pluralize: bool,
    version: Option<String>,
    partition_key_fields: Vec<PartitionKeyField>,
    custom_key: Option<CustomKeyFn>,
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("event_name", &self.event_name)
            .field("module", &self.module)
            .field("topic", &self.topic)
            .field("domain", &self.domain)
            .field("visibility", &self.visibility)
            .field("pluralize", &self.pluralize)
            .field("version", &self.version)
            .field("partition_key_fields", &self.partition_key_fields)
            .field("custom_key", &self.custom_key.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl EventDescriptor {
    /// Create a descriptor for an event declared in the given module
    /// namespace (e.g. `"acme.billing.IntegrationEvents"`).
    pub fn new(event_name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            module: module.into(),
            topic: None,
            domain: None,
            visibility: Visibility::Public,
            pluralize: false,
            version: None,
            partition_key_fields: Vec::new(),
            custom_key: None,
        }
    }

    /// Set the topic base name. An event without a topic carries no
    /// routing metadata and is excluded from transport wiring.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Override the domain for this event only.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Mark the event internal-only.
    pub fn internal(mut self) -> Self {
        self.visibility = Visibility::Internal;
        self
    }

    /// Opt the topic into pluralization.
    pub fn pluralized(mut self) -> Self {
        self.pluralize = true;
        self
    }

    /// Set the version tag, emitted as a trailing channel-name segment.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Append a partition-key field in declaration order.
    pub fn with_key_field(mut self, field: PartitionKeyField) -> Self {
        self.partition_key_fields.push(field);
        self
    }

    /// Install a custom partition-key function.
    pub fn with_custom_key(mut self, key_fn: CustomKeyFn) -> Self {
        self.custom_key = Some(key_fn);
        self
    }

    /// Logical event name.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Owning module namespace.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Topic base name, if the event carries routing metadata.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Per-event domain override.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Declared visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the topic pluralizes.
    pub fn pluralize(&self) -> bool {
        self.pluralize
    }

    /// Version tag, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Partition-key fields in declaration order.
    pub fn partition_key_fields(&self) -> &[PartitionKeyField] {
        &self.partition_key_fields
    }

    /// Custom partition-key function, if installed.
    pub fn custom_key(&self) -> Option<&CustomKeyFn> {
        self.custom_key.as_ref()
    }

    /// Whether the event carries routing metadata.
    pub fn is_routable(&self) -> bool {
        self.topic.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// A module namespace and its default domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventModule {
    /// Dot-delimited module namespace.
    pub name: String,
    /// Domain applied to the module's events when they declare none.
    pub default_domain: Option<String>,
}

impl EventModule {
    /// A module with no default domain.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), default_domain: None }
    }

    /// Set the module default domain.
    pub fn with_default_domain(mut self, domain: impl Into<String>) -> Self {
        self.default_domain = Some(domain.into());
        self
    }
}

/// Errors raised during registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The event name was already registered.
    #[error("event type '{0}' is already registered")]
    DuplicateEvent(String),
}

/// The statically-built event registry.
///
/// One owned instance per service, created at startup and passed by
/// reference to the transport components.
#[derive(Debug, Default)]
pub struct EventRegistry {
    modules: HashMap<String, EventModule>,
    events: HashMap<String, EventDescriptor>,
}

impl EventRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module namespace. Re-registering a module replaces its
    /// default domain.
    pub fn register_module(&mut self, module: EventModule) {
        self.modules.insert(module.name.clone(), module);
    }

    /// Register an event descriptor. Each event type registers exactly
    /// once.
    pub fn register(&mut self, descriptor: EventDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.event_name().to_string();
        if self.events.contains_key(&name) {
            return Err(RegistryError::DuplicateEvent(name));
        }
        self.events.insert(name, descriptor);
        Ok(())
    }

    /// Look up a descriptor by event name.
    pub fn get(&self, event_name: &str) -> Option<&EventDescriptor> {
        self.events.get(event_name)
    }

    /// All registered descriptors, in arbitrary order.
    pub fn descriptors(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.events.values()
    }

    /// Number of registered event types.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The default domain declared for a module, if any.
    pub fn module_default_domain(&self, module: &str) -> Option<&str> {
        self.modules
            .get(module)
            .and_then(|m| m.default_domain.as_deref())
    }

    /// Resolve the effective domain for a descriptor: per-event override,
    /// then module default, then the first dot-delimited segment of the
    /// module name.
    pub fn domain_for(&self, descriptor: &EventDescriptor) -> String {
        if let Some(domain) = descriptor.domain() {
            return domain.to_string();
        }
        if let Some(domain) = self.module_default_domain(descriptor.module()) {
            return domain.to_string();
        }
        descriptor
            .module()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(descriptor: EventDescriptor) -> EventRegistry {
        let mut registry = EventRegistry::new();
        registry.register(descriptor).unwrap();
        registry
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = registry_with(EventDescriptor::new("OrderCreated", "shop.IntegrationEvents"));
        let result = registry.register(EventDescriptor::new("OrderCreated", "shop.IntegrationEvents"));
        assert_eq!(
            result,
            Err(RegistryError::DuplicateEvent("OrderCreated".to_string()))
        );
    }

    #[test]
    fn test_domain_resolution_prefers_event_override() {
        let mut registry = EventRegistry::new();
        registry.register_module(
            EventModule::new("shop.orders.IntegrationEvents").with_default_domain("commerce"),
        );
        registry
            .register(
                EventDescriptor::new("OrderCreated", "shop.orders.IntegrationEvents")
                    .with_domain("ecommerce"),
            )
            .unwrap();

        let descriptor = registry.get("OrderCreated").unwrap();
        assert_eq!(registry.domain_for(descriptor), "ecommerce");
    }

    #[test]
    fn test_domain_resolution_falls_back_to_module_default() {
        let mut registry = EventRegistry::new();
        registry.register_module(
            EventModule::new("shop.orders.IntegrationEvents").with_default_domain("commerce"),
        );
        registry
            .register(EventDescriptor::new("OrderCreated", "shop.orders.IntegrationEvents"))
            .unwrap();

        let descriptor = registry.get("OrderCreated").unwrap();
        assert_eq!(registry.domain_for(descriptor), "commerce");
    }

    #[test]
    fn test_domain_resolution_falls_back_to_module_segment() {
        let registry =
            registry_with(EventDescriptor::new("OrderCreated", "shop.orders.IntegrationEvents"));
        let descriptor = registry.get("OrderCreated").unwrap();
        assert_eq!(registry.domain_for(descriptor), "shop");
    }

    #[test]
    fn test_routability_requires_nonempty_topic() {
        let with_topic = EventDescriptor::new("A", "m.DomainEvents").with_topic("orders");
        let blank_topic = EventDescriptor::new("B", "m.DomainEvents").with_topic("  ");
        let no_topic = EventDescriptor::new("C", "m.DomainEvents");
        assert!(with_topic.is_routable());
        assert!(!blank_topic.is_routable());
        assert!(!no_topic.is_routable());
    }
}
