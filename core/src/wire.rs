//! Envelope↔wire mapping.
//!
//! Envelopes translate to a broker-neutral [`WireRecord`]: payload bytes
//! plus a flat property map under a fixed, documented key set. Application
//! headers are namespaced with a `header-` prefix to avoid collisions with
//! the reserved keys. Inbound mapping is tolerant: every field parses
//! independently, so one malformed property never poisons the rest of the
//! envelope.

use crate::envelope::Envelope;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Wire property key for the message id.
pub const MESSAGE_ID: &str = "message-id";
/// Wire property key for the logical message type.
pub const MESSAGE_TYPE: &str = "message-type";
/// Wire property key for the payload content type.
pub const CONTENT_TYPE: &str = "content-type";
/// Wire property key for the sent timestamp (ISO-8601).
pub const SENT_AT: &str = "sent-at";
/// Wire property key for the publishing service.
pub const SOURCE: &str = "source";
/// Wire property key for the correlation id.
pub const CORRELATION_ID: &str = "correlation-id";
/// Wire property key for the conversation id.
pub const CONVERSATION_ID: &str = "conversation-id";
/// Wire property key for the parent message id.
pub const PARENT_ID: &str = "parent-id";
/// Wire property key carrying the partition key when the broker API does
/// not expose it as first-class routing metadata.
pub const PARTITION_KEY: &str = "partition-key";

/// Prefix for application headers.
pub const HEADER_PREFIX: &str = "header-";

/// Per-record overhead charged against batch capacity for each property.
const PROPERTY_OVERHEAD: usize = 8;

/// The fixed reserved property-key set, for introspection and
/// documentation.
pub fn reserved_keys() -> &'static [&'static str] {
    &[
        MESSAGE_ID,
        MESSAGE_TYPE,
        CONTENT_TYPE,
        SENT_AT,
        SOURCE,
        CORRELATION_ID,
        CONVERSATION_ID,
        PARENT_ID,
        PARTITION_KEY,
    ]
}

/// A broker-neutral record: payload plus flat string properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireRecord {
    /// Property map, keyed by the reserved set plus `header-*` entries.
    pub properties: HashMap<String, String>,
    /// Payload bytes.
    pub payload: Bytes,
}

impl WireRecord {
    /// The partition key carried on this record, if any.
    pub fn partition_key(&self) -> Option<&str> {
        self.properties.get(PARTITION_KEY).map(String::as_str)
    }

    /// Approximate wire size, used for batch capacity accounting.
    pub fn size_hint(&self) -> usize {
        let properties: usize = self
            .properties
            .iter()
            .map(|(k, v)| k.len() + v.len() + PROPERTY_OVERHEAD)
            .sum();
        self.payload.len() + properties
    }
}

/// Map an envelope onto a wire record.
pub fn to_wire(envelope: &Envelope) -> WireRecord {
    let mut properties = HashMap::new();
    properties.insert(MESSAGE_ID.to_string(), envelope.message_id.to_string());
    properties.insert(MESSAGE_TYPE.to_string(), envelope.message_type.clone());
    properties.insert(CONTENT_TYPE.to_string(), envelope.content_type.clone());
    properties.insert(SOURCE.to_string(), envelope.source.clone());

    if let Some(sent_at) = envelope.sent_at {
        properties.insert(SENT_AT.to_string(), sent_at.to_rfc3339());
    }
    if let Some(correlation_id) = &envelope.correlation_id {
        properties.insert(CORRELATION_ID.to_string(), correlation_id.clone());
    }
    if let Some(conversation_id) = &envelope.conversation_id {
        properties.insert(CONVERSATION_ID.to_string(), conversation_id.clone());
    }
    if let Some(parent_id) = &envelope.parent_id {
        properties.insert(PARENT_ID.to_string(), parent_id.clone());
    }
    if let Some(partition_key) = &envelope.partition_key {
        properties.insert(PARTITION_KEY.to_string(), partition_key.clone());
    }

    for (key, value) in &envelope.headers {
        properties.insert(format!("{HEADER_PREFIX}{key}"), value.clone());
    }

    WireRecord {
        properties,
        payload: envelope.payload.clone(),
    }
}

/// Map a wire record back onto an envelope.
///
/// Each field parses independently. A malformed `message-id` leaves the
/// nil UUID, a malformed `sent-at` leaves the timestamp unset; neither
/// aborts the rest of the mapping.
pub fn from_wire(record: &WireRecord) -> Envelope {
    let properties = &record.properties;

    let message_id = properties
        .get(MESSAGE_ID)
        .and_then(|raw| match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(error) => {
                debug!(%raw, %error, "ignoring malformed message-id property");
                None
            }
        })
        .unwrap_or(Uuid::nil());

    let sent_at = properties
        .get(SENT_AT)
        .and_then(|raw| match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(error) => {
                debug!(%raw, %error, "ignoring malformed sent-at property");
                None
            }
        });

    let mut headers = HashMap::new();
    for (key, value) in properties {
        if let Some(name) = key.strip_prefix(HEADER_PREFIX) {
            headers.insert(name.to_string(), value.clone());
        }
    }

    Envelope {
        message_id,
        message_type: properties.get(MESSAGE_TYPE).cloned().unwrap_or_default(),
        payload: record.payload.clone(),
        content_type: properties.get(CONTENT_TYPE).cloned().unwrap_or_default(),
        partition_key: properties.get(PARTITION_KEY).cloned(),
        correlation_id: properties.get(CORRELATION_ID).cloned(),
        conversation_id: properties.get(CONVERSATION_ID).cloned(),
        parent_id: properties.get(PARENT_ID).cloned(),
        source: properties.get(SOURCE).cloned().unwrap_or_default(),
        sent_at,
        headers,
    }
}
