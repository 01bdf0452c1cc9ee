//! JetStream stream provisioning.
//!
//! Streams are created idempotently during startup, one per channel, with
//! the channel subject plus its dead-letter subject bound to the same
//! stream. Auto-provisioning is validated against the environment before
//! anything is created; production refuses it.

use async_nats::jetstream;
use async_nats::jetstream::stream::{Config as StreamConfig, StorageType};
use bidali_core::config::TransportConfig;
use bidali_core::error::TransportError;
use tracing::{info, warn};

/// Default message cap per channel stream.
const MAX_MESSAGES: i64 = 1_000_000;

/// Default byte cap per channel stream (1GB).
const MAX_BYTES: i64 = 1024 * 1024 * 1024;

/// JetStream stream name for a channel. Stream names cannot contain the
/// subject token separators, so channel dots become underscores.
pub fn stream_name_for(channel: &str) -> String {
    channel
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// The dead-letter subject paired with a channel.
pub fn dead_letter_subject(channel: &str) -> String {
    format!("{channel}.dlq")
}

/// Ensure the stream backing a channel exists.
///
/// Returns `Ok(true)` if the stream was created, `Ok(false)` if it already
/// existed.
pub async fn ensure_stream(
    jetstream: &jetstream::Context,
    channel: &str,
) -> Result<bool, TransportError> {
    let stream_name = stream_name_for(channel);

    match jetstream.get_stream(stream_name.as_str()).await {
        Ok(_) => {
            info!(stream = %stream_name, channel = %channel, "✓ Stream already exists");
            Ok(false)
        }
        Err(_) => {
            info!(stream = %stream_name, channel = %channel, "Creating stream...");
            let stream_config = StreamConfig {
                name: stream_name.clone(),
                subjects: vec![channel.to_string().into(), dead_letter_subject(channel).into()],
                description: Some(format!("bidali transport stream for {channel}")),
                max_messages: MAX_MESSAGES,
                max_bytes: MAX_BYTES,
                storage: StorageType::File,
                ..Default::default()
            };
            jetstream
                .create_stream(stream_config)
                .await
                .map_err(|e| TransportError::Connectivity(e.to_string()))?;
            Ok(true)
        }
    }
}

/// Provision every channel the route table publishes or subscribes to.
///
/// A no-op when auto-provisioning is disabled; the configuration layer has
/// already refused the toggle in production.
pub async fn provision_channels(
    jetstream: &jetstream::Context,
    channels: &[String],
    config: &TransportConfig,
) -> Result<(), TransportError> {
    if !config.auto_provision {
        info!("auto-provision disabled; expecting streams to exist already");
        return Ok(());
    }
    config.validate()?;

    info!(channels = channels.len(), "🔧 Initializing JetStream streams...");
    let mut created = 0usize;
    for channel in channels {
        match ensure_stream(jetstream, channel).await {
            Ok(true) => created += 1,
            Ok(false) => {}
            Err(error) => {
                warn!(channel = %channel, error = %error, "failed to create or verify stream");
                return Err(error);
            }
        }
    }
    info!(created, existing = channels.len() - created, "✅ Streams ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_name_sanitizes_channel() {
        assert_eq!(
            stream_name_for("dev.ecommerce.public.orders"),
            "DEV_ECOMMERCE_PUBLIC_ORDERS"
        );
        assert_eq!(stream_name_for("dev.shop.orders.v2"), "DEV_SHOP_ORDERS_V2");
    }

    #[test]
    fn test_dead_letter_subject() {
        assert_eq!(
            dead_letter_subject("dev.shop.public.orders"),
            "dev.shop.public.orders.dlq"
        );
    }
}
