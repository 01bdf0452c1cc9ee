//! Transport configuration.
//!
//! Plain data with serde defaults, validated once at startup. A service
//! must not come up half-configured: [`TransportConfig::validate`] returns
//! a typed error for any missing connection information.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised during configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No broker connection information was supplied.
    #[error("broker connection is not configured: provide a connection string or namespace + credential")]
    MissingBrokerConnection,

    /// No checkpoint store information was supplied for a consuming service.
    #[error("checkpoint store is not configured: provide a connection string or container URI + credential")]
    MissingCheckpointStore,

    /// The service prefix is required to derive consumer group names.
    #[error("service prefix must not be empty")]
    MissingServicePrefix,

    /// The environment name is required for channel naming.
    #[error("environment must not be empty")]
    MissingEnvironment,

    /// Channel auto-creation is only allowed outside production.
    #[error("auto-provision is not permitted in the '{0}' environment")]
    AutoProvisionForbidden(String),
}

/// How to reach the broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BrokerConnection {
    /// A full connection string, as handed out by the operator.
    ConnectionString(String),
    /// A namespace plus credential material (e.g. a credentials file path).
    Namespace { namespace: String, credential: String },
}

/// How to reach the checkpoint store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CheckpointStoreConnection {
    /// A full connection string.
    ConnectionString(String),
    /// A container URI plus credential material.
    Container { uri: String, credential: String },
}

/// Producer-side tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerTuning {
    /// Retry attempts for transient publish failures.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Maximum time to wait for a broker acknowledgment, in seconds.
    #[serde(default = "default_producer_max_wait")]
    pub max_wait_secs: u64,
    /// Upper bound for one wire-level batch, in bytes. Adapters clamp this
    /// to the broker's advertised maximum.
    #[serde(default = "default_batch_limit_bytes")]
    pub batch_limit_bytes: usize,
}

impl Default for ProducerTuning {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            max_wait_secs: default_producer_max_wait(),
            batch_limit_bytes: default_batch_limit_bytes(),
        }
    }
}

impl ProducerTuning {
    /// Maximum wait as a [`Duration`].
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

/// Consumer-side tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerTuning {
    /// How many records to pull per fetch.
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: usize,
    /// Maximum time to wait for a fetch, in seconds.
    #[serde(default = "default_consumer_max_wait")]
    pub max_wait_secs: u64,
    /// Delivery attempts before a record is diverted to the dead-letter
    /// channel and the checkpoint advances past it.
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,
}

impl Default for ConsumerTuning {
    fn default() -> Self {
        Self {
            fetch_batch_size: default_fetch_batch_size(),
            max_wait_secs: default_consumer_max_wait(),
            max_delivery_attempts: default_max_delivery_attempts(),
        }
    }
}

impl ConsumerTuning {
    /// Maximum wait as a [`Duration`].
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

const fn default_retry_limit() -> u32 {
    3
}

const fn default_producer_max_wait() -> u64 {
    30
}

const fn default_batch_limit_bytes() -> usize {
    1024 * 1024
}

const fn default_fetch_batch_size() -> usize {
    50
}

const fn default_consumer_max_wait() -> u64 {
    5
}

const fn default_max_delivery_attempts() -> u32 {
    5
}

fn default_environment() -> String {
    "dev".to_string()
}

/// Recognized transport configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Broker connection information.
    #[serde(default)]
    pub broker: Option<BrokerConnection>,

    /// Checkpoint store connection information. Required only for
    /// consuming services; see [`TransportConfig::validate_for_consumption`].
    #[serde(default)]
    pub checkpoint_store: Option<CheckpointStoreConnection>,

    /// Short service identifier used in consumer group names.
    pub service_prefix: String,

    /// Deployment environment, the first channel-name segment.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Consumer group override. Derived as `{service_prefix}-{environment}`
    /// when unset.
    #[serde(default)]
    pub consumer_group: Option<String>,

    /// Whether missing channels may be created on startup. Refused in
    /// production.
    #[serde(default)]
    pub auto_provision: bool,

    /// Producer tuning.
    #[serde(default)]
    pub producer: ProducerTuning,

    /// Consumer tuning.
    #[serde(default)]
    pub consumer: ConsumerTuning,
}

impl TransportConfig {
    /// Minimal configuration for local development against defaults.
    pub fn for_local(service_prefix: impl Into<String>) -> Self {
        Self {
            broker: Some(BrokerConnection::ConnectionString(
                "nats://localhost:4222".to_string(),
            )),
            checkpoint_store: None,
            service_prefix: service_prefix.into(),
            environment: default_environment(),
            consumer_group: None,
            auto_provision: true,
            producer: ProducerTuning::default(),
            consumer: ConsumerTuning::default(),
        }
    }

    /// Whether this configuration targets a production environment.
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_ascii_lowercase();
        env == "production" || env == "prod"
    }

    /// The effective consumer group name.
    pub fn consumer_group(&self) -> String {
        match &self.consumer_group {
            Some(group) => group.clone(),
            None => format!("{}-{}", self.service_prefix, self.environment),
        }
    }

    /// Validate the publish-side configuration. Fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_prefix.trim().is_empty() {
            return Err(ConfigError::MissingServicePrefix);
        }
        if self.environment.trim().is_empty() {
            return Err(ConfigError::MissingEnvironment);
        }
        if self.broker.is_none() {
            return Err(ConfigError::MissingBrokerConnection);
        }
        if self.auto_provision && self.is_production() {
            return Err(ConfigError::AutoProvisionForbidden(self.environment.clone()));
        }
        Ok(())
    }

    /// Validate the consume-side configuration, which additionally needs a
    /// checkpoint store.
    pub fn validate_for_consumption(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.checkpoint_store.is_none() {
            return Err(ConfigError::MissingCheckpointStore);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_group_is_derived_when_unset() {
        let config = TransportConfig::for_local("billing");
        assert_eq!(config.consumer_group(), "billing-dev");
    }

    #[test]
    fn test_consumer_group_override_wins() {
        let mut config = TransportConfig::for_local("billing");
        config.consumer_group = Some("billing-custom".to_string());
        assert_eq!(config.consumer_group(), "billing-custom");
    }

    #[test]
    fn test_missing_broker_is_fatal() {
        let mut config = TransportConfig::for_local("billing");
        config.broker = None;
        assert_eq!(config.validate(), Err(ConfigError::MissingBrokerConnection));
    }

    #[test]
    fn test_auto_provision_refused_in_production() {
        let mut config = TransportConfig::for_local("billing");
        config.environment = "production".to_string();
        config.auto_provision = true;
        assert_eq!(
            config.validate(),
            Err(ConfigError::AutoProvisionForbidden("production".to_string()))
        );

        config.auto_provision = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_consumption_requires_checkpoint_store() {
        let config = TransportConfig::for_local("billing");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.validate_for_consumption(),
            Err(ConfigError::MissingCheckpointStore)
        );
    }

    #[test]
    fn test_tuning_defaults() {
        let producer = ProducerTuning::default();
        assert_eq!(producer.retry_limit, 3);
        assert_eq!(producer.batch_limit_bytes, 1024 * 1024);

        let consumer = ConsumerTuning::default();
        assert_eq!(consumer.fetch_batch_size, 50);
        assert_eq!(consumer.max_delivery_attempts, 5);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: TransportConfig = serde_json::from_str(
            r#"{ "service_prefix": "billing", "broker": "nats://localhost:4222" }"#,
        )
        .unwrap();
        assert_eq!(config.environment, "dev");
        assert_eq!(
            config.broker,
            Some(BrokerConnection::ConnectionString(
                "nats://localhost:4222".to_string()
            ))
        );
        assert!(!config.auto_provision);
    }
}
