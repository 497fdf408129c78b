//! Connection settings for the admin client, producer and consumer.

use crate::error::{Error, Result};
use rdkafka::config::ClientConfig;
use rdkafka::Offset;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Consumer group every relay subscriber joins unless told otherwise.
pub const DEFAULT_GROUP_ID: &str = "siTestGroup";

/// A topic to be created if absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication: i32,
}

impl TopicSpec {
    /// A single-partition, single-replica topic.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: 1,
            replication: 1,
        }
    }

    pub fn with_partitions(mut self, partitions: i32) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_replication(mut self, replication: i32) -> Self {
        self.replication = replication;
        self
    }
}

/// Where a subscriber starts reading its partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartOffset {
    /// The oldest retained record
    #[default]
    Earliest,
    /// Only records produced after the subscriber starts
    Latest,
    /// The consumer group's committed offset
    Stored,
    /// An absolute offset within the partition
    At(i64),
}

impl StartOffset {
    pub fn to_offset(self) -> Offset {
        match self {
            StartOffset::Earliest => Offset::Beginning,
            StartOffset::Latest => Offset::End,
            StartOffset::Stored => Offset::Stored,
            StartOffset::At(offset) => Offset::Offset(offset),
        }
    }
}

impl FromStr for StartOffset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earliest" | "beginning" => Ok(StartOffset::Earliest),
            "latest" | "end" => Ok(StartOffset::Latest),
            "stored" | "committed" => Ok(StartOffset::Stored),
            other => match other.parse::<i64>() {
                Ok(offset) if offset >= 0 => Ok(StartOffset::At(offset)),
                _ => Err(Error::InvalidConfig(format!(
                    "Invalid start offset '{s}': expected earliest, latest, stored or a non-negative number"
                ))),
            },
        }
    }
}

impl fmt::Display for StartOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartOffset::Earliest => write!(f, "earliest"),
            StartOffset::Latest => write!(f, "latest"),
            StartOffset::Stored => write!(f, "stored"),
            StartOffset::At(offset) => write!(f, "{offset}"),
        }
    }
}

/// Configuration for the admin client used to provision topics
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Metadata service address (comma-separated broker list)
    pub address: String,
    /// Upper bound for a create-topics request
    pub operation_timeout: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            address: "localhost:9092".to_string(),
            operation_timeout: Duration::from_secs(5),
        }
    }
}

impl AdminConfig {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.address);
        config
    }
}

/// Configuration for the string producer
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// How long librdkafka keeps trying to deliver a record
    pub message_timeout_ms: String,
    /// Upper bound for flushing outstanding records on close
    pub flush_timeout: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            message_timeout_ms: "5000".to_string(),
            flush_timeout: Duration::from_secs(5),
        }
    }
}

impl ProducerConfig {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("message.timeout.ms", &self.message_timeout_ms);
        config
    }
}

/// Configuration for the string consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Partition of the topic the subscriber is assigned
    pub partition: i32,
    /// Where to start reading the assigned partition
    pub start_offset: StartOffset,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
    /// Commit consumed offsets in the background
    ///
    /// The relay does no manual offset management, so this is on by default.
    /// A crash between auto-commits may redeliver or skip messages.
    pub enable_auto_commit: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: DEFAULT_GROUP_ID.to_string(),
            partition: 0,
            start_offset: StartOffset::Earliest,
            session_timeout_ms: "6000".to_string(),
            enable_auto_commit: true,
        }
    }
}

impl ConsumerConfig {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", self.enable_auto_commit.to_string())
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", &self.session_timeout_ms)
            .set("enable.partition.eof", "false");
        config
    }
}
