//! Command-line interface for kafka-relay
//!
//! # Usage Examples
//!
//! ```bash
//! # Defaults: topic test-topic on localhost:9092, ten messages foo0..foo9
//! kafka-relay
//!
//! # Separate admin endpoint and a keyless run
//! kafka-relay \
//!   --broker-address kafka:9092 \
//!   --admin-address kafka-admin:9092 \
//!   --message-key ""
//!
//! # Everything can also come from the environment
//! KAFKA_TOPIC=orders KAFKA_BROKER_ADDRESS=kafka:9092 kafka-relay
//! ```

use clap::Parser;
use kafka_relay::RelayOpts;
use tracing::info;

#[derive(Parser)]
#[command(name = "kafka-relay")]
#[command(about = "Provision a Kafka topic, publish a batch of messages and print what comes back")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: RelayOpts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing; stdout is reserved for relay output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut stdout = std::io::stdout();
    let report = kafka_relay::run(&cli.opts, &mut stdout).await?;

    info!(
        "Relay finished: sent {} messages, received {}",
        report.sent.len(),
        report.received.len()
    );
    Ok(())
}
