use crate::config::{AdminConfig, TopicSpec};
use crate::error::{Error, Result};
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use std::time::Duration;
use tracing::info;

/// Outcome of a successful `ensure_topic` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCreation {
    Created,
    AlreadyExists,
}

/// Creates topics ahead of traffic.
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    /// Create the topic unless it already exists.
    ///
    /// An existing topic is reported as [`TopicCreation::AlreadyExists`], never
    /// as an error, so calling this repeatedly is safe.
    async fn ensure_topic(&self, spec: &TopicSpec) -> Result<TopicCreation>;
}

/// Topic provisioner backed by the Kafka admin API
pub struct TopicProvisioner {
    admin: AdminClient<DefaultClientContext>,
    operation_timeout: Duration,
}

impl TopicProvisioner {
    pub fn new(config: &AdminConfig) -> Result<Self> {
        let admin: AdminClient<DefaultClientContext> = config
            .client_config()
            .create()
            .map_err(|e| Error::Provisioning(format!("Failed to create admin client: {e}")))?;

        Ok(Self {
            admin,
            operation_timeout: config.operation_timeout,
        })
    }
}

#[async_trait]
impl TopicAdmin for TopicProvisioner {
    async fn ensure_topic(&self, spec: &TopicSpec) -> Result<TopicCreation> {
        validate_topic_name(&spec.name)?;

        let new_topic = NewTopic::new(
            &spec.name,
            spec.partitions,
            TopicReplication::Fixed(spec.replication),
        );
        let opts = AdminOptions::new().operation_timeout(Some(self.operation_timeout));

        let results = self
            .admin
            .create_topics(&[new_topic], &opts)
            .await
            .map_err(|e| Error::Provisioning(format!("Failed to create topics: {e}")))?;

        let mut outcome = None;
        for result in results {
            outcome = Some(interpret_topic_result(result)?);
        }
        outcome.ok_or_else(|| {
            Error::Provisioning(format!(
                "Broker returned no result for topic '{}'",
                spec.name
            ))
        })
    }
}

/// Map a per-topic admin result, treating "already exists" as success.
pub(crate) fn interpret_topic_result(result: TopicResult) -> Result<TopicCreation> {
    match result {
        Ok(topic_name) => {
            info!("Topic '{topic_name}' created successfully");
            Ok(TopicCreation::Created)
        }
        Err((topic_name, RDKafkaErrorCode::TopicAlreadyExists)) => {
            info!("Topic '{topic_name}' already exists");
            Ok(TopicCreation::AlreadyExists)
        }
        Err((topic_name, err)) => Err(Error::Provisioning(format!(
            "Failed to create topic {topic_name}: {err}"
        ))),
    }
}

pub(crate) fn validate_topic_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidConfig("Topic name must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created() {
        let outcome = interpret_topic_result(Ok("test-topic".to_string())).unwrap();
        assert_eq!(outcome, TopicCreation::Created);
    }

    #[test]
    fn test_already_exists_is_success() {
        let outcome = interpret_topic_result(Err((
            "test-topic".to_string(),
            RDKafkaErrorCode::TopicAlreadyExists,
        )))
        .unwrap();
        assert_eq!(outcome, TopicCreation::AlreadyExists);
    }

    #[test]
    fn test_other_failures_are_provisioning_errors() {
        let err = interpret_topic_result(Err((
            "test-topic".to_string(),
            RDKafkaErrorCode::InvalidReplicationFactor,
        )))
        .unwrap_err();
        assert!(matches!(err, Error::Provisioning(_)));
        assert!(err.to_string().contains("test-topic"));
    }

    #[test]
    fn test_empty_topic_name_rejected() {
        assert!(validate_topic_name("").is_err());
        assert!(validate_topic_name("  ").is_err());
        assert!(validate_topic_name("test-topic").is_ok());
    }
}
