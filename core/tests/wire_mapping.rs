//! Envelope↔wire mapping round trips and per-field fault tolerance.

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use bidali_core::envelope::Envelope;
use bidali_core::wire::{self, from_wire, reserved_keys, to_wire, WireRecord};

fn full_envelope() -> Envelope {
    Envelope::new("OrderCreated", Bytes::from_static(b"{\"OrderId\":\"o-1\"}"))
        .with_partition_key("s1-c1")
        .with_correlation_id("corr-1")
        .with_conversation_id("conv-1")
        .with_parent_id("parent-1")
        .with_source("checkout")
        .with_sent_at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 45).unwrap())
        .with_header("tenant", "acme")
        .with_header("trace", "abc123")
}

#[test]
fn test_round_trip_preserves_every_field() {
    let original = full_envelope();
    let restored = from_wire(&to_wire(&original));

    assert_eq!(restored.message_id, original.message_id);
    assert_eq!(restored.message_type, original.message_type);
    assert_eq!(restored.payload, original.payload);
    assert_eq!(restored.content_type, original.content_type);
    assert_eq!(restored.partition_key, original.partition_key);
    assert_eq!(restored.correlation_id, original.correlation_id);
    assert_eq!(restored.conversation_id, original.conversation_id);
    assert_eq!(restored.parent_id, original.parent_id);
    assert_eq!(restored.source, original.source);
    assert_eq!(restored.sent_at, original.sent_at);
    assert_eq!(restored.headers, original.headers);
}

#[test]
fn test_wire_record_uses_documented_property_keys() {
    let record = to_wire(&full_envelope());

    for key in [
        wire::MESSAGE_ID,
        wire::MESSAGE_TYPE,
        wire::CONTENT_TYPE,
        wire::SENT_AT,
        wire::SOURCE,
        wire::CORRELATION_ID,
        wire::CONVERSATION_ID,
        wire::PARENT_ID,
        wire::PARTITION_KEY,
    ] {
        assert!(record.properties.contains_key(key), "missing key {key}");
    }
    assert!(record.properties.contains_key("header-tenant"));
    assert!(record.properties.contains_key("header-trace"));
}

#[test]
fn test_sent_at_is_iso8601() {
    let envelope = full_envelope();
    let record = to_wire(&envelope);
    let raw = &record.properties[wire::SENT_AT];
    assert_eq!(raw, &envelope.sent_at.unwrap().to_rfc3339());
    assert!(raw.starts_with("2025-06-01T12:30:45"));
}

#[test]
fn test_optional_fields_are_omitted_on_the_wire() {
    let envelope = Envelope::new("Ping", Bytes::new());
    let record = to_wire(&envelope);
    assert!(!record.properties.contains_key(wire::SENT_AT));
    assert!(!record.properties.contains_key(wire::CORRELATION_ID));
    assert!(!record.properties.contains_key(wire::PARTITION_KEY));
}

#[test]
fn test_malformed_sent_at_does_not_poison_the_envelope() {
    let mut record = to_wire(&full_envelope());
    record
        .properties
        .insert(wire::SENT_AT.to_string(), "not-a-timestamp".to_string());

    let restored = from_wire(&record);
    assert!(restored.sent_at.is_none(), "unparsable timestamp stays unset");
    assert_eq!(restored.message_type, "OrderCreated");
    assert_eq!(restored.partition_key.as_deref(), Some("s1-c1"));
    assert_eq!(restored.headers.get("tenant").map(String::as_str), Some("acme"));
}

#[test]
fn test_malformed_message_id_falls_back_to_nil() {
    let mut record = to_wire(&full_envelope());
    record
        .properties
        .insert(wire::MESSAGE_ID.to_string(), "not-a-uuid".to_string());

    let restored = from_wire(&record);
    assert_eq!(restored.message_id, Uuid::nil());
    assert_eq!(restored.source, "checkout");
}

#[test]
fn test_empty_record_maps_to_defaults() {
    let restored = from_wire(&WireRecord::default());
    assert_eq!(restored.message_id, Uuid::nil());
    assert!(restored.message_type.is_empty());
    assert!(restored.sent_at.is_none());
    assert!(restored.headers.is_empty());
}

#[test]
fn test_reserved_key_set_is_complete() {
    let keys = reserved_keys();
    assert_eq!(keys.len(), 9);
    for key in [
        "message-id",
        "message-type",
        "content-type",
        "sent-at",
        "source",
        "correlation-id",
        "conversation-id",
        "parent-id",
        "partition-key",
    ] {
        assert!(keys.contains(&key), "missing reserved key {key}");
    }
}
