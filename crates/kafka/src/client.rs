use crate::admin::{TopicAdmin, TopicProvisioner};
use crate::config::{AdminConfig, ConsumerConfig, ProducerConfig};
use crate::consumer::{KafkaRecordSource, Subscriber};
use crate::error::Result;
use crate::producer::{MessageSink, Publisher};

/// Factory for the broker-facing components of a relay.
///
/// Construction is split so callers control ordering: topics are provisioned
/// before any publisher or subscriber exists.
pub trait Backend: Send + Sync {
    type Admin: TopicAdmin;
    type Sink: MessageSink;

    fn admin(&self) -> Result<Self::Admin>;

    fn publisher(&self) -> Result<Self::Sink>;

    /// Start a subscriber delivering the topic's messages into its queue.
    fn subscribe(&self, topic: &str) -> Result<Subscriber>;
}

/// Kafka client holding the admin, producer and consumer settings
#[derive(Debug, Clone, Default)]
pub struct Client {
    admin: AdminConfig,
    producer: ProducerConfig,
    consumer: ConsumerConfig,
}

impl Client {
    pub fn new(admin: AdminConfig, producer: ProducerConfig, consumer: ConsumerConfig) -> Self {
        Self {
            admin,
            producer,
            consumer,
        }
    }

    /// Client with default settings pointed at one broker list for everything
    pub fn from_brokers(brokers: &str) -> Self {
        Self {
            admin: AdminConfig {
                address: brokers.to_string(),
                ..Default::default()
            },
            producer: ProducerConfig {
                brokers: brokers.to_string(),
                ..Default::default()
            },
            consumer: ConsumerConfig {
                brokers: brokers.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn admin_config(&self) -> &AdminConfig {
        &self.admin
    }

    pub fn producer_config(&self) -> &ProducerConfig {
        &self.producer
    }

    pub fn consumer_config(&self) -> &ConsumerConfig {
        &self.consumer
    }
}

impl Backend for Client {
    type Admin = TopicProvisioner;
    type Sink = Publisher;

    fn admin(&self) -> Result<TopicProvisioner> {
        TopicProvisioner::new(&self.admin)
    }

    fn publisher(&self) -> Result<Publisher> {
        Publisher::new(&self.producer)
    }

    fn subscribe(&self, topic: &str) -> Result<Subscriber> {
        let source = KafkaRecordSource::new(&self.consumer, topic)?;
        Ok(Subscriber::spawn(source))
    }
}
