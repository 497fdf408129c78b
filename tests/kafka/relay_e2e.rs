//! Kafka relay E2E test
//!
//! Test flow:
//! 1. Provision a fresh, uniquely named topic through the admin API
//! 2. Publish ten string messages with the relay's publisher
//! 3. Drain the holding queue of a subscriber in a unique consumer group
//! 4. Verify order, keys and that provisioning the topic again is a no-op

use kafka_relay::{RelayDriver, RelaySettings};
use relay_kafka::{
    AdminConfig, Backend, Client, ConsumerConfig, ProducerConfig, TopicAdmin, TopicCreation,
    TopicSpec,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn broker_address() -> String {
    std::env::var("KAFKA_BROKER_ADDRESS").unwrap_or_else(|_| "kafka:9092".to_string())
}

fn generate_test_id() -> u64 {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64;
    timestamp.wrapping_add(TEST_COUNTER.fetch_add(1, Ordering::SeqCst))
}

#[tokio::test]
#[ignore = "requires a running Kafka broker"]
async fn test_kafka_relay_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("kafka_relay=debug,relay_kafka=debug")
        .try_init()
        .ok();

    let test_id = generate_test_id();
    let topic = format!("test-topic-{test_id}");
    let brokers = broker_address();
    tracing::info!("Using topic {topic} on {brokers}");

    let client = Client::new(
        AdminConfig {
            address: brokers.clone(),
            ..Default::default()
        },
        ProducerConfig {
            brokers: brokers.clone(),
            ..Default::default()
        },
        ConsumerConfig {
            brokers,
            group_id: format!("siTestGroup-{test_id}"),
            ..Default::default()
        },
    );

    let settings = RelaySettings {
        topic: topic.clone(),
        receive_timeout: Duration::from_secs(10),
        ..Default::default()
    };
    let mut driver = RelayDriver::new(client.clone(), settings);
    let mut out = Vec::new();
    let report = driver.run(&mut out).await?;

    assert_eq!(report.topic_creation, TopicCreation::Created);
    let received: Vec<&str> = report.received.iter().map(|m| m.payload()).collect();
    assert_eq!(received, report.sent);
    assert!(report
        .received
        .iter()
        .all(|m| m.key() == Some("si.key") && m.partition() == Some(0)));

    let output = String::from_utf8(out)?;
    assert!(output.starts_with("Send to Kafka: foo0\n"));
    assert!(output.contains("Message [payload=foo9, key=si.key"));

    // Provisioning again must not fail
    let again = client.admin()?.ensure_topic(&TopicSpec::new(&topic)).await?;
    assert_eq!(again, TopicCreation::AlreadyExists);

    Ok(())
}
