//! Relay driver tests against the in-memory broker
//!
//! Each test builds its own broker, so topics and committed offsets never leak
//! between tests.

use kafka_relay::{RelayDriver, RelaySettings, RelayState};
use relay_kafka::memory::MemoryBroker;
use relay_kafka::{Backend, StartOffset, TopicAdmin, TopicCreation, TopicSpec};
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

const RECEIVE_TIMEOUT: Duration = Duration::from_millis(200);

fn settings() -> RelaySettings {
    RelaySettings {
        receive_timeout: RECEIVE_TIMEOUT,
        ..Default::default()
    }
}

fn lines(out: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(out)
        .lines()
        .map(str::to_string)
        .collect()
}

fn payloads(messages: &[relay_kafka::Message]) -> Vec<&str> {
    messages.iter().map(|m| m.payload()).collect()
}

fn expected_payloads(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("foo{i}")).collect()
}

#[tokio::test]
async fn test_relay_fresh_topic_end_to_end() {
    let broker = MemoryBroker::new();
    let mut driver = RelayDriver::new(broker.clone(), settings());
    let mut out = Vec::new();

    let report = assert_ok!(driver.run(&mut out).await);

    assert_eq!(driver.state(), RelayState::Closed);
    assert_eq!(report.topic_creation, TopicCreation::Created);
    assert_eq!(broker.topic_spec("test-topic"), Some(TopicSpec::new("test-topic")));

    let lines = lines(&out);
    assert_eq!(lines.len(), 20);
    for (i, line) in lines.iter().take(10).enumerate() {
        assert_eq!(line, &format!("Send to Kafka: foo{i}"));
    }
    for (i, line) in lines.iter().skip(10).enumerate() {
        assert_eq!(
            line,
            &format!(
                "Message [payload=foo{i}, key=si.key, topic=test-topic, partition=0, offset={i}]"
            )
        );
    }
}

#[tokio::test]
async fn test_sends_exactly_the_configured_payloads_in_order() {
    let broker = MemoryBroker::new();
    let mut driver = RelayDriver::new(broker.clone(), settings());

    let report = assert_ok!(driver.run(&mut Vec::new()).await);

    assert_eq!(report.sent, expected_payloads(10));
    let published: Vec<Vec<u8>> = broker
        .records("test-topic")
        .into_iter()
        .filter_map(|r| r.payload)
        .collect();
    let expected: Vec<Vec<u8>> = expected_payloads(10)
        .into_iter()
        .map(String::into_bytes)
        .collect();
    assert_eq!(published, expected);
}

#[tokio::test]
async fn test_received_in_send_order() {
    let broker = MemoryBroker::new();
    let mut driver = RelayDriver::new(
        broker,
        RelaySettings {
            message_count: 50,
            ..settings()
        },
    );

    let report = assert_ok!(driver.run(&mut Vec::new()).await);

    assert_eq!(payloads(&report.received), report.sent);
    let offsets: Vec<i64> = report.received.iter().filter_map(|m| m.offset()).collect();
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_second_run_reuses_existing_topic() {
    let broker = MemoryBroker::new();

    let first = assert_ok!(RelayDriver::new(broker.clone(), settings()).run(&mut Vec::new()).await);
    assert_eq!(first.topic_creation, TopicCreation::Created);

    // Earliest start offset replays the first run's messages as well
    let second = assert_ok!(RelayDriver::new(broker.clone(), settings()).run(&mut Vec::new()).await);
    assert_eq!(second.topic_creation, TopicCreation::AlreadyExists);
    assert_eq!(second.received.len(), 20);
    assert_eq!(broker.records("test-topic").len(), 20);
}

#[tokio::test]
async fn test_stored_offset_resumes_after_previous_run() {
    let broker = MemoryBroker::new();
    assert_ok!(RelayDriver::new(broker.clone(), settings()).run(&mut Vec::new()).await);
    assert_eq!(broker.committed_offset("test-topic"), Some(10));

    let resumed = broker.clone().with_start_offset(StartOffset::Stored);
    let report = assert_ok!(RelayDriver::new(resumed, settings()).run(&mut Vec::new()).await);

    assert_eq!(report.received.len(), 10);
    assert_eq!(report.received.first().and_then(|m| m.offset()), Some(10));
}

#[tokio::test]
async fn test_latest_offset_skips_existing_records() {
    let broker = MemoryBroker::new();
    let admin = broker.admin().unwrap();
    assert_ok!(admin.ensure_topic(&TopicSpec::new("test-topic")).await);
    broker
        .append_raw("test-topic", None, Some(b"before".to_vec()))
        .unwrap();

    let latest = broker.clone().with_start_offset(StartOffset::Latest);
    let report = assert_ok!(RelayDriver::new(latest, settings()).run(&mut Vec::new()).await);

    assert_eq!(report.topic_creation, TopicCreation::AlreadyExists);
    assert_eq!(payloads(&report.received), expected_payloads(10));
}

#[tokio::test]
async fn test_empty_topic_drains_after_one_timeout() {
    let broker = MemoryBroker::new();
    let mut driver = RelayDriver::new(
        broker,
        RelaySettings {
            message_count: 0,
            ..settings()
        },
    );
    let mut out = Vec::new();

    let started = Instant::now();
    let report = assert_ok!(driver.run(&mut out).await);
    let elapsed = started.elapsed();

    assert!(report.sent.is_empty());
    assert!(report.received.is_empty());
    assert!(out.is_empty());
    assert!(elapsed >= RECEIVE_TIMEOUT);
    assert!(elapsed < RECEIVE_TIMEOUT * 10);
}

#[tokio::test]
async fn test_undecodable_records_are_skipped() {
    let broker = MemoryBroker::new();
    let admin = broker.admin().unwrap();
    assert_ok!(admin.ensure_topic(&TopicSpec::new("test-topic")).await);
    broker
        .append_raw("test-topic", None, Some(vec![0xff, 0xfe]))
        .unwrap();
    broker.append_raw("test-topic", Some(b"si.key".to_vec()), None).unwrap();

    let report = assert_ok!(RelayDriver::new(broker, settings()).run(&mut Vec::new()).await);

    assert_eq!(payloads(&report.received), expected_payloads(10));
    assert_eq!(report.received.first().and_then(|m| m.offset()), Some(2));
}

#[tokio::test]
async fn test_provisioning_failure_aborts_before_publishing() {
    let broker = MemoryBroker::new();
    broker.fail_provisioning("broker unreachable");
    let mut driver = RelayDriver::new(broker.clone(), settings());
    let mut out = Vec::new();

    let err = assert_err!(driver.run(&mut out).await);

    assert!(format!("{err:#}").contains("broker unreachable"));
    assert_eq!(driver.state(), RelayState::Closed);
    assert!(out.is_empty());
    assert!(broker.records("test-topic").is_empty());
}

#[tokio::test]
async fn test_send_failure_is_surfaced() {
    let broker = MemoryBroker::new();
    broker.fail_sends("queue full");
    let mut driver = RelayDriver::new(broker, settings());
    let mut out = Vec::new();

    let err = assert_err!(driver.run(&mut out).await);

    assert!(format!("{err:#}").contains("queue full"));
    assert_eq!(driver.state(), RelayState::Closed);
    assert_eq!(lines(&out), vec!["Send to Kafka: foo0".to_string()]);
}

#[tokio::test]
async fn test_driver_runs_once() {
    let mut driver = RelayDriver::new(MemoryBroker::new(), settings());
    assert_ok!(driver.run(&mut Vec::new()).await);

    assert_err!(driver.run(&mut Vec::new()).await);
}

#[tokio::test]
async fn test_empty_key_publishes_keyless_messages() {
    let broker = MemoryBroker::new();
    let mut driver = RelayDriver::new(
        broker.clone(),
        RelaySettings {
            message_key: String::new(),
            message_count: 2,
            ..settings()
        },
    );
    let mut out = Vec::new();

    assert_ok!(driver.run(&mut out).await);

    assert!(broker.records("test-topic").iter().all(|r| r.key.is_none()));
    assert_eq!(
        lines(&out).last().map(String::as_str),
        Some("Message [payload=foo1, topic=test-topic, partition=0, offset=1]")
    );
}
