//! kafka-relay library
//!
//! Makes sure a Kafka topic exists, publishes a batch of string messages to
//! it, and prints whatever a consumer group reads back until the topic goes
//! quiet for a receive timeout.
//!
//! # Components
//!
//! - [`relay_kafka`] - topic provisioner, publisher, subscriber and holding queue
//! - [`relay`] - the driver sequencing provisioning, publishing and draining
//! - [`config`] - command-line / environment options
//!
//! # CLI Usage
//!
//! ```bash
//! # Relay ten messages through a local broker
//! kafka-relay --broker-address localhost:9092 --topic test-topic
//!
//! # Start from the group's committed offset and give up after 2 quiet seconds
//! kafka-relay --start-offset stored --receive-timeout 2s
//! ```

pub mod config;
pub mod relay;

pub use config::RelayOpts;
pub use relay::{RelayDriver, RelayReport, RelaySettings, RelayState};

use std::io::Write;

/// Run one relay against the Kafka cluster described by `opts`.
pub async fn run<W: Write>(opts: &RelayOpts, out: &mut W) -> anyhow::Result<RelayReport> {
    let mut driver = RelayDriver::new(opts.client(), opts.settings());
    driver.run(out).await
}
