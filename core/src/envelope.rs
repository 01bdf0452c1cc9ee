//! Transport-agnostic message envelope.
//!
//! An [`Envelope`] wraps a serialized payload together with the identity,
//! correlation and routing metadata the transport needs. It is owned by
//! exactly one pipeline stage at a time; once a partition key has been
//! stamped on it, downstream stages never recompute it.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Default content type for envelopes produced by this transport.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// The transport-agnostic message unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Unique message identifier.
    pub message_id: Uuid,

    /// Logical message type name (e.g. "OrderCreated").
    pub message_type: String,

    /// Raw payload bytes.
    pub payload: Bytes,

    /// MIME content type of the payload.
    pub content_type: String,

    /// Partition key used for broker-side ordering, if any.
    pub partition_key: Option<String>,

    /// Correlation identifier for distributed tracing.
    pub correlation_id: Option<String>,

    /// Conversation identifier grouping related exchanges.
    pub conversation_id: Option<String>,

    /// Identifier of the message that caused this one.
    pub parent_id: Option<String>,

    /// Identifier of the publishing service.
    pub source: String,

    /// When the envelope was handed to the transport.
    pub sent_at: Option<DateTime<Utc>>,

    /// Application headers. Insertion order is not significant.
    pub headers: HashMap<String, String>,
}

impl Envelope {
    /// Create a new envelope with a fresh message id.
    pub fn new(message_type: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            message_type: message_type.into(),
            payload: payload.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            partition_key: None,
            correlation_id: None,
            conversation_id: None,
            parent_id: None,
            source: String::new(),
            sent_at: None,
            headers: HashMap::new(),
        }
    }

    /// Set the partition key.
    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Set the correlation id.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the conversation id.
    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// Set the parent message id.
    pub fn with_parent_id(mut self, id: impl Into<String>) -> Self {
        self.parent_id = Some(id.into());
        self
    }

    /// Set the publishing service identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the payload content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set the sent timestamp.
    pub fn with_sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    /// Add an application header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Payload size in bytes.
    pub fn body_len(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_defaults() {
        let envelope = Envelope::new("OrderCreated", Bytes::from_static(b"{}"));
        assert_eq!(envelope.message_type, "OrderCreated");
        assert_eq!(envelope.content_type, DEFAULT_CONTENT_TYPE);
        assert!(envelope.partition_key.is_none());
        assert!(envelope.sent_at.is_none());
        assert!(envelope.headers.is_empty());
        assert_eq!(envelope.body_len(), 2);
    }

    #[test]
    fn test_envelope_builder_chain() {
        let envelope = Envelope::new("OrderCreated", Bytes::from_static(b"{}"))
            .with_partition_key("s1-c1")
            .with_correlation_id("corr-1")
            .with_source("checkout")
            .with_header("tenant", "acme");

        assert_eq!(envelope.partition_key.as_deref(), Some("s1-c1"));
        assert_eq!(envelope.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(envelope.source, "checkout");
        assert_eq!(envelope.headers.get("tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_envelope_ids_are_unique() {
        let a = Envelope::new("E", Bytes::new());
        let b = Envelope::new("E", Bytes::new());
        assert_ne!(a.message_id, b.message_id);
    }
}
