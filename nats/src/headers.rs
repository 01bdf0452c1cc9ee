//! Wire record ↔ NATS header translation.

use async_nats::HeaderMap;
use bidali_core::wire::WireRecord;
use bytes::Bytes;
use std::collections::HashMap;

/// Build the NATS headers for a wire record.
pub fn headers_for(record: &WireRecord) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (key, value) in &record.properties {
        headers.insert(key.as_str(), value.as_str());
    }
    headers
}

/// Rebuild a wire record from a received message's headers and payload.
pub fn record_from(headers: Option<&HeaderMap>, payload: Bytes) -> WireRecord {
    let mut properties = HashMap::new();
    if let Some(headers) = headers {
        for (key, values) in headers.iter() {
            if let Some(value) = values.first() {
                properties.insert(key.to_string(), value.to_string());
            }
        }
    }
    WireRecord { properties, payload }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidali_core::envelope::Envelope;
    use bidali_core::wire::{from_wire, to_wire};

    #[test]
    fn test_headers_round_trip_through_nats_shape() {
        let envelope = Envelope::new("OrderCreated", Bytes::from_static(b"{}"))
            .with_partition_key("s1-c1")
            .with_header("tenant", "acme");
        let record = to_wire(&envelope);

        let headers = headers_for(&record);
        let rebuilt = record_from(Some(&headers), record.payload.clone());
        let restored = from_wire(&rebuilt);

        assert_eq!(restored.message_id, envelope.message_id);
        assert_eq!(restored.partition_key.as_deref(), Some("s1-c1"));
        assert_eq!(
            restored.headers.get("tenant").map(String::as_str),
            Some("acme")
        );
    }
}
