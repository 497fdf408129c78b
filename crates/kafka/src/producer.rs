use crate::admin::validate_topic_name;
use crate::config::ProducerConfig;
use crate::error::{Error, Result};
use crate::message::Message;
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Destination for outgoing messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Hand a message over for delivery.
    ///
    /// Returns once the message is accepted for delivery; it does not wait for
    /// the broker's acknowledgement. Failures are not retried.
    async fn send(&self, message: Message) -> Result<()>;

    /// Flush anything still in flight.
    async fn close(&self) -> Result<()>;
}

/// Fire-and-forget string producer
pub struct Publisher {
    producer: FutureProducer,
    flush_timeout: Duration,
}

impl Publisher {
    pub fn new(config: &ProducerConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .client_config()
            .create()
            .map_err(|e| Error::Send(format!("Failed to create Kafka producer: {e}")))?;

        Ok(Self {
            producer,
            flush_timeout: config.flush_timeout,
        })
    }
}

#[async_trait]
impl MessageSink for Publisher {
    async fn send(&self, message: Message) -> Result<()> {
        validate_topic_name(message.topic())?;

        let mut record = FutureRecord::to(message.topic()).payload(message.payload());
        if let Some(key) = message.key() {
            record = record.key(key);
        }

        let delivery = match self.producer.send_result(record) {
            Ok(delivery) => delivery,
            Err((err, _)) => {
                error!(
                    "Failed to enqueue message for topic {}: {err}",
                    message.topic()
                );
                return Err(Error::Send(format!(
                    "Failed to send message to {}: {err}",
                    message.topic()
                )));
            }
        };

        let payload = message.payload().to_string();
        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok(_)) => debug!("Delivered message: {payload}"),
                Ok(Err((err, _))) => warn!("Delivery of message {payload} failed: {err}"),
                Err(_) => warn!("Delivery of message {payload} was cancelled"),
            }
        });

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.producer
            .flush(self.flush_timeout)
            .map_err(|e| Error::Send(format!("Failed to flush producer: {e}")))?;
        debug!("Producer flushed");
        Ok(())
    }
}
