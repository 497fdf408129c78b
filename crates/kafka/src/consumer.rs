use crate::admin::validate_topic_name;
use crate::config::ConsumerConfig;
use crate::error::{Error, Result};
use crate::message::Record;
use crate::queue::HoldingQueue;
use async_trait::async_trait;
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer};
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use rdkafka::TopicPartitionList;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pause between polls after the source reports an error.
const POLL_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Anything the subscriber's receive loop can pull records from.
#[async_trait]
pub trait RecordSource: Send + 'static {
    /// Wait for the next record.
    ///
    /// `None` means the source is exhausted and the loop should stop.
    async fn next_record(&mut self) -> Option<Result<Record>>;
}

/// Kafka consumer assigned to a single topic partition
pub struct KafkaRecordSource {
    consumer: RdkafkaStreamConsumer,
}

impl KafkaRecordSource {
    /// Create a consumer in the configured group and assign it the topic's
    /// partition at the configured start offset.
    pub fn new(config: &ConsumerConfig, topic: &str) -> Result<Self> {
        validate_topic_name(topic)?;

        let consumer: RdkafkaStreamConsumer = config
            .client_config()
            .create()
            .map_err(|e| Error::Consumer(format!("Failed to create consumer: {e}")))?;

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, config.partition, config.start_offset.to_offset())
            .map_err(|e| Error::Consumer(format!("Failed to add partition offset: {e}")))?;

        consumer
            .assign(&tpl)
            .map_err(|e| Error::Consumer(format!("Failed to assign partition: {e}")))?;

        info!(
            "Consumer in group {} assigned {topic}/{} starting at {}",
            config.group_id, config.partition, config.start_offset
        );

        Ok(Self { consumer })
    }

    /// Get the underlying consumer (for advanced use cases)
    pub fn inner(&self) -> &RdkafkaStreamConsumer {
        &self.consumer
    }
}

#[async_trait]
impl RecordSource for KafkaRecordSource {
    async fn next_record(&mut self) -> Option<Result<Record>> {
        let record = self
            .consumer
            .recv()
            .await
            .map(|msg| to_record(&msg))
            .map_err(|e| Error::Consumer(format!("Error receiving message: {e}")));
        Some(record)
    }
}

fn to_record(msg: &RdkafkaBorrowedMessage) -> Record {
    Record {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        key: msg.key().map(|k| k.to_vec()),
        payload: msg.payload().map(|p| p.to_vec()),
        timestamp: msg.timestamp().to_millis(),
    }
}

/// Background receive loop feeding a [`HoldingQueue`].
///
/// The loop owns the record source; the queue is shared with whoever drains
/// it. Dropping the subscriber stops the loop.
pub struct Subscriber {
    queue: HoldingQueue,
    handle: Option<JoinHandle<()>>,
}

impl Subscriber {
    /// Start the receive loop on its own task.
    pub fn spawn<S: RecordSource>(source: S) -> Self {
        let queue = HoldingQueue::new();
        let handle = tokio::spawn(receive_loop(source, queue.clone()));
        Self {
            queue,
            handle: Some(handle),
        }
    }

    /// Queue the receive loop delivers into
    pub fn queue(&self) -> &HoldingQueue {
        &self.queue
    }

    /// Whether the receive loop is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the receive loop and wait for it to wind down.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            match handle.await {
                Ok(()) => debug!("Receive loop had already finished"),
                Err(e) if e.is_cancelled() => debug!("Receive loop stopped"),
                Err(e) => warn!("Receive loop ended abnormally: {e}"),
            }
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn receive_loop<S: RecordSource>(mut source: S, queue: HoldingQueue) {
    while let Some(next) = source.next_record().await {
        let record = match next {
            Ok(record) => record,
            Err(e) => {
                warn!("{e}; polling again");
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                continue;
            }
        };

        match record.decode() {
            Ok(message) => {
                debug!("Received message: {message}");
                queue.push(message).await;
            }
            Err(e) => warn!("Dropping record: {e}"),
        }
    }
    debug!("Record source exhausted, receive loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed script of poll results, then ends.
    struct ScriptedSource {
        script: VecDeque<Result<Record>>,
    }

    #[async_trait]
    impl RecordSource for ScriptedSource {
        async fn next_record(&mut self) -> Option<Result<Record>> {
            self.script.pop_front()
        }
    }

    fn record(offset: i64, payload: &[u8]) -> Result<Record> {
        Ok(Record {
            topic: "test-topic".to_string(),
            partition: 0,
            offset,
            key: Some(b"si.key".to_vec()),
            payload: Some(payload.to_vec()),
            timestamp: None,
        })
    }

    async fn drain(queue: &HoldingQueue) -> Vec<String> {
        let mut payloads = Vec::new();
        while let Some(message) = queue.pop(Duration::from_millis(100)).await {
            payloads.push(message.payload().to_string());
        }
        payloads
    }

    #[tokio::test]
    async fn test_records_are_queued_in_order() {
        let script = (0..5)
            .map(|i| record(i, format!("foo{i}").as_bytes()))
            .collect();
        let subscriber = Subscriber::spawn(ScriptedSource { script });

        let payloads = drain(subscriber.queue()).await;
        assert_eq!(payloads, vec!["foo0", "foo1", "foo2", "foo3", "foo4"]);
        subscriber.shutdown().await;
    }

    #[tokio::test]
    async fn test_undecodable_records_are_dropped() {
        let script = VecDeque::from(vec![
            record(0, b"foo0"),
            record(1, &[0xff, 0xfe, 0xfd]),
            record(2, b"foo2"),
        ]);
        let subscriber = Subscriber::spawn(ScriptedSource { script });

        let payloads = drain(subscriber.queue()).await;
        assert_eq!(payloads, vec!["foo0", "foo2"]);
    }

    #[tokio::test]
    async fn test_poll_errors_do_not_stop_the_loop() {
        let script = VecDeque::from(vec![
            Err(Error::Consumer("broker transport failure".to_string())),
            record(0, b"foo0"),
        ]);
        let subscriber = Subscriber::spawn(ScriptedSource { script });

        let message = subscriber
            .queue()
            .pop(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(message.payload(), "foo0");
    }

    #[tokio::test]
    async fn test_loop_exits_when_source_ends() {
        let subscriber = Subscriber::spawn(ScriptedSource {
            script: VecDeque::new(),
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!subscriber.is_running());
        subscriber.shutdown().await;
    }
}
