use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Topic creation failed for a reason other than the topic already existing.
    #[error("Topic provisioning error: {0}")]
    Provisioning(String),

    #[error("Send error: {0}")]
    Send(String),

    /// A consumed record could not be turned into a string message.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Consumer error: {0}")]
    Consumer(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
