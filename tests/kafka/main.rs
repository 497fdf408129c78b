//! Kafka relay E2E tests
//!
//! These need a reachable broker (`KAFKA_BROKER_ADDRESS`, default `kafka:9092`)
//! and are ignored by default. Run them with `cargo test -- --ignored`.

mod relay_e2e;
