//! NATS connection configuration.
//!
//! Structured configuration with production defaults, derived from the
//! transport's broker connection setting.

use async_nats::{Client, ConnectOptions};
use bidali_core::config::{BrokerConnection, ConfigError, TransportConfig};
use bidali_core::error::TransportError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// NATS connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsTransportConfig {
    /// NATS server URLs.
    #[serde(default = "default_urls")]
    pub urls: Vec<String>,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connection_timeout_secs: u64,
    /// Request timeout in seconds (None = no timeout).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: Option<u64>,
    /// Max reconnection attempts (None = infinite).
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: Option<usize>,
    /// Credentials file path (optional).
    #[serde(default)]
    pub credentials_file: Option<String>,
    /// Client connection name.
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for NatsTransportConfig {
    fn default() -> Self {
        Self {
            urls: default_urls(),
            connection_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            max_reconnects: default_max_reconnects(),
            credentials_file: None,
            name: None,
        }
    }
}

fn default_urls() -> Vec<String> {
    vec!["nats://localhost:4222".to_string()]
}

const fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> Option<u64> {
    Some(30)
}

fn default_max_reconnects() -> Option<usize> {
    Some(5)
}

impl NatsTransportConfig {
    /// Derive the NATS configuration from the transport's broker
    /// connection setting.
    pub fn from_transport(config: &TransportConfig) -> Result<Self, ConfigError> {
        let broker = config
            .broker
            .as_ref()
            .ok_or(ConfigError::MissingBrokerConnection)?;
        let mut nats = Self {
            name: Some(config.service_prefix.clone()),
            ..Self::default()
        };
        match broker {
            BrokerConnection::ConnectionString(urls) => {
                nats.urls = urls.split(',').map(|u| u.trim().to_string()).collect();
            }
            BrokerConnection::Namespace { namespace, credential } => {
                nats.urls = vec![format!("nats://{namespace}:4222")];
                nats.credentials_file = Some(credential.clone());
            }
        }
        Ok(nats)
    }

    /// The primary URL for connection.
    pub fn primary_url(&self) -> &str {
        self.urls
            .first()
            .map(|s| s.as_str())
            .unwrap_or("nats://localhost:4222")
    }

    /// Connect to NATS with these settings.
    pub async fn connect(&self) -> Result<Client, TransportError> {
        let mut connect_options = ConnectOptions::default()
            .connection_timeout(Duration::from_secs(self.connection_timeout_secs));

        if let Some(timeout_secs) = self.request_timeout_secs {
            connect_options =
                connect_options.request_timeout(Some(Duration::from_secs(timeout_secs)));
        }

        if let Some(name) = &self.name {
            connect_options = connect_options.name(name);
        }

        if let Some(max_reconnects) = self.max_reconnects {
            connect_options = connect_options.max_reconnects(max_reconnects);
        }

        let connect_options = if let Some(creds_file) = &self.credentials_file {
            connect_options
                .credentials_file(creds_file)
                .await
                .map_err(|e| TransportError::Connectivity(e.to_string()))?
        } else {
            connect_options
        };

        let client = async_nats::connect_with_options(self.primary_url(), connect_options)
            .await
            .map_err(|e| TransportError::Connectivity(e.to_string()))?;

        info!(url = self.primary_url(), "connected to NATS");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NatsTransportConfig::default();
        assert_eq!(config.primary_url(), "nats://localhost:4222");
        assert_eq!(config.connection_timeout_secs, 5);
        assert_eq!(config.max_reconnects, Some(5));
        assert!(config.credentials_file.is_none());
    }

    #[test]
    fn test_from_transport_connection_string() {
        let mut transport = TransportConfig::for_local("billing");
        transport.broker = Some(BrokerConnection::ConnectionString(
            "nats://a:4222, nats://b:4222".to_string(),
        ));
        let config = NatsTransportConfig::from_transport(&transport).unwrap();
        assert_eq!(config.urls, vec!["nats://a:4222", "nats://b:4222"]);
        assert_eq!(config.name.as_deref(), Some("billing"));
    }

    #[test]
    fn test_from_transport_namespace_and_credential() {
        let mut transport = TransportConfig::for_local("billing");
        transport.broker = Some(BrokerConnection::Namespace {
            namespace: "events.example.com".to_string(),
            credential: "/etc/nats/billing.creds".to_string(),
        });
        let config = NatsTransportConfig::from_transport(&transport).unwrap();
        assert_eq!(config.urls, vec!["nats://events.example.com:4222"]);
        assert_eq!(
            config.credentials_file.as_deref(),
            Some("/etc/nats/billing.creds")
        );
    }

    #[test]
    fn test_from_transport_requires_broker() {
        let mut transport = TransportConfig::for_local("billing");
        transport.broker = None;
        assert_eq!(
            NatsTransportConfig::from_transport(&transport).unwrap_err(),
            ConfigError::MissingBrokerConnection
        );
    }
}
