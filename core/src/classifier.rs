//! Event classification: which registered types this service publishes,
//! and which it must subscribe to.
//!
//! The subscribe set is computed from explicit handler registrations
//! supplied by the dispatch runtime; recognition of handler methods stays
//! name-based so independently-built services agree on the wiring.
//! Classification never fails: unroutable event types are excluded with a
//! warning rather than aborting startup over one malformed declaration.

use crate::descriptor::{EventDescriptor, EventRegistry};
use std::collections::BTreeSet;
use tracing::warn;

/// Module-namespace suffixes that mark a type as an event.
pub const EVENT_NAMESPACE_SUFFIXES: &[&str] = &["IntegrationEvents", "DomainEvents"];

/// Recognized handler method names, compared case-insensitively.
const HANDLER_METHOD_NAMES: &[&str] = &[
    "handle",
    "handleasync",
    "handles",
    "handlesasync",
    "consume",
    "consumeasync",
    "consumes",
    "consumesasync",
];

/// One handler method registered with the dispatch runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRegistration {
    /// Method name as declared by the handler.
    pub method_name: String,
    /// Event type the method takes as its parameter.
    pub event_name: String,
}

impl HandlerRegistration {
    /// Create a registration record.
    pub fn new(method_name: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            event_name: event_name.into(),
        }
    }
}

/// The outcome of classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Event types this service may emit.
    pub publish_set: BTreeSet<String>,
    /// Event types this service must receive.
    pub subscribe_set: BTreeSet<String>,
}

/// Whether a module namespace marks its types as events.
pub fn is_event_namespace(module: &str) -> bool {
    EVENT_NAMESPACE_SUFFIXES
        .iter()
        .any(|suffix| module.ends_with(suffix))
}

/// Whether a method name is recognized as an event handler.
pub fn is_handler_method(name: &str) -> bool {
    HANDLER_METHOD_NAMES
        .iter()
        .any(|candidate| name.eq_ignore_ascii_case(candidate))
}

fn qualifies(descriptor: &EventDescriptor) -> bool {
    if !is_event_namespace(descriptor.module()) {
        return false;
    }
    if !descriptor.is_routable() {
        warn!(
            event = %descriptor.event_name(),
            module = %descriptor.module(),
            "event type has no routing metadata; excluding it from transport wiring"
        );
        return false;
    }
    true
}

/// Compute the publish and subscribe sets.
///
/// The publish set contains every qualifying event type in the registry.
/// The subscribe set is the subset that appears as the parameter of at
/// least one recognized handler method.
pub fn classify(registry: &EventRegistry, handlers: &[HandlerRegistration]) -> Classification {
    let mut classification = Classification::default();

    for descriptor in registry.descriptors() {
        if qualifies(descriptor) {
            classification
                .publish_set
                .insert(descriptor.event_name().to_string());
        }
    }

    for handler in handlers {
        if !is_handler_method(&handler.method_name) {
            continue;
        }
        if classification.publish_set.contains(&handler.event_name) {
            classification
                .subscribe_set
                .insert(handler.event_name.clone());
        }
    }

    classification
}
