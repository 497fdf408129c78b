//! Relay configuration from command-line flags and environment variables.

pub mod duration;

pub use duration::parse_duration;

use crate::relay::RelaySettings;
use clap::Args;
use relay_kafka::{
    AdminConfig, Client, ConsumerConfig, ProducerConfig, StartOffset, DEFAULT_GROUP_ID,
};
use std::time::Duration;

/// Connection and behaviour options for a relay run.
#[derive(Args, Clone, Debug)]
pub struct RelayOpts {
    /// Topic to provision, publish to and consume from
    #[arg(long, env = "KAFKA_TOPIC", default_value = "test-topic")]
    pub topic: String,

    /// Key attached to every published message (empty = no key)
    #[arg(long, env = "KAFKA_MESSAGE_KEY", default_value = "si.key")]
    pub message_key: String,

    /// Kafka brokers (comma-separated, e.g., "localhost:9092")
    #[arg(long, env = "KAFKA_BROKER_ADDRESS", default_value = "localhost:9092")]
    pub broker_address: String,

    /// Address used for topic creation (defaults to the broker address)
    #[arg(long, env = "KAFKA_ADMIN_ADDRESS")]
    pub admin_address: Option<String>,

    /// Consumer group the subscriber joins
    #[arg(long, env = "KAFKA_GROUP_ID", default_value = DEFAULT_GROUP_ID)]
    pub group_id: String,

    /// Where to start reading partition 0: earliest, latest, stored or an offset
    #[arg(long, env = "KAFKA_START_OFFSET", default_value = "earliest")]
    pub start_offset: StartOffset,

    /// Number of messages to publish
    #[arg(long, default_value_t = 10)]
    pub message_count: usize,

    /// Payload prefix; the message index is appended
    #[arg(long, default_value = "foo")]
    pub payload_prefix: String,

    /// How long to wait for each received message before finishing
    #[arg(
        long,
        env = "RELAY_RECEIVE_TIMEOUT",
        default_value = "10000",
        value_parser = parse_duration
    )]
    pub receive_timeout: Duration,

    /// Upper bound for topic creation
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub admin_timeout: Duration,

    /// Upper bound for flushing the producer on shutdown
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub flush_timeout: Duration,
}

impl RelayOpts {
    /// Kafka client configured from these options
    pub fn client(&self) -> Client {
        let admin = AdminConfig {
            address: self
                .admin_address
                .clone()
                .unwrap_or_else(|| self.broker_address.clone()),
            operation_timeout: self.admin_timeout,
        };
        let producer = ProducerConfig {
            brokers: self.broker_address.clone(),
            flush_timeout: self.flush_timeout,
            ..Default::default()
        };
        let consumer = ConsumerConfig {
            brokers: self.broker_address.clone(),
            group_id: self.group_id.clone(),
            start_offset: self.start_offset,
            ..Default::default()
        };
        Client::new(admin, producer, consumer)
    }

    pub fn settings(&self) -> RelaySettings {
        RelaySettings {
            topic: self.topic.clone(),
            message_key: self.message_key.clone(),
            message_count: self.message_count,
            payload_prefix: self.payload_prefix.clone(),
            receive_timeout: self.receive_timeout,
            ..Default::default()
        }
    }
}
