//! Kafka plumbing for `kafka-relay`: make sure a topic exists, publish string
//! messages to it, and collect what a consumer group reads back into a local
//! queue.
//!
//! Features:
//!
//! - Idempotent topic provisioning: "already exists" is a success
//! - Fire-and-forget publishing: delivery results are logged, not awaited
//! - Partition-assigned subscriber: a background task feeds a holding queue
//!   that readers pop with a timeout
//! - An in-memory broker behind the `testing` feature

/// Topic provisioning through the admin API
pub mod admin;

/// High-level factory for the admin, producer and subscriber
///
/// Owns the connection settings and constructs each component on demand, so
/// callers can provision topics before anything publishes or subscribes.
pub mod client;
pub mod config;

/// Subscriber with a background receive loop
pub mod consumer;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod message;
pub mod producer;
pub mod queue;

// Re-export main types for easy access
pub use admin::{TopicAdmin, TopicCreation, TopicProvisioner};
pub use client::{Backend, Client};
pub use config::{
    AdminConfig, ConsumerConfig, ProducerConfig, StartOffset, TopicSpec, DEFAULT_GROUP_ID,
};
pub use consumer::{KafkaRecordSource, RecordSource, Subscriber};
pub use error::{Error, Result};
pub use message::{Message, Record};
pub use producer::{MessageSink, Publisher};
pub use queue::HoldingQueue;
