//! Relay driver: provision the topic, publish a batch, drain what comes back.
//!
//! The driver walks a fixed sequence of states:
//!
//! ```text
//! Idle -> Provisioning -> Publishing -> Draining -> Closed
//! ```
//!
//! Provisioning runs to completion before the publisher or subscriber are
//! created. Draining ends the first time the holding queue stays empty for a
//! whole receive timeout. `Closed` is reached on every path; the subscriber
//! and publisher are shut down before any error is returned.

use anyhow::{Context, Result};
use relay_kafka::{
    Backend, Message, MessageSink, Subscriber, TopicAdmin, TopicCreation, TopicSpec,
};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a relay run publishes and how long it waits for replies.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub topic: String,
    /// Routing key for every message; empty means no key
    pub message_key: String,
    pub message_count: usize,
    pub payload_prefix: String,
    /// Wait bound for each pop from the holding queue
    pub receive_timeout: Duration,
    pub partitions: i32,
    pub replication: i32,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            topic: "test-topic".to_string(),
            message_key: "si.key".to_string(),
            message_count: 10,
            payload_prefix: "foo".to_string(),
            receive_timeout: Duration::from_millis(10_000),
            partitions: 1,
            replication: 1,
        }
    }
}

impl RelaySettings {
    /// Payloads in the order they are published
    pub fn payloads(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.message_count).map(move |i| format!("{}{i}", self.payload_prefix))
    }

    fn topic_spec(&self) -> TopicSpec {
        TopicSpec::new(&self.topic)
            .with_partitions(self.partitions)
            .with_replication(self.replication)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Provisioning,
    Publishing,
    Draining,
    Closed,
}

impl RelayState {
    /// Whether the driver may move from `self` to `next`.
    pub fn can_advance_to(self, next: RelayState) -> bool {
        use RelayState::*;
        matches!(
            (self, next),
            (Idle, Provisioning) | (Provisioning, Publishing) | (Publishing, Draining) | (_, Closed)
        )
    }
}

/// Summary of a completed relay run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub topic_creation: TopicCreation,
    /// Payloads handed to the publisher, in send order
    pub sent: Vec<String>,
    /// Messages popped from the holding queue, in arrival order
    pub received: Vec<Message>,
}

pub struct RelayDriver<B: Backend> {
    backend: B,
    settings: RelaySettings,
    state: RelayState,
}

impl<B: Backend> RelayDriver<B> {
    pub fn new(backend: B, settings: RelaySettings) -> Self {
        Self {
            backend,
            settings,
            state: RelayState::Idle,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Run the relay once, writing console lines to `out`.
    pub async fn run<W: Write>(&mut self, out: &mut W) -> Result<RelayReport> {
        if self.state != RelayState::Idle {
            anyhow::bail!("Relay already ran (state {:?})", self.state);
        }

        let outcome = self.provision_and_relay(out).await;
        self.advance(RelayState::Closed);
        outcome
    }

    async fn provision_and_relay<W: Write>(&mut self, out: &mut W) -> Result<RelayReport> {
        self.advance(RelayState::Provisioning);
        let topic_creation = self.provision().await?;

        let (sink, subscriber) = self.connect().await?;
        let mut report = RelayReport {
            topic_creation,
            sent: Vec::new(),
            received: Vec::new(),
        };

        let relayed = self.relay(&sink, &subscriber, out, &mut report).await;
        let closed = teardown(sink, subscriber).await;
        relayed.and(closed).map(|()| report)
    }

    async fn provision(&self) -> Result<TopicCreation> {
        let spec = self.settings.topic_spec();
        let admin = self
            .backend
            .admin()
            .context("Failed to create topic provisioner")?;

        let creation = admin
            .ensure_topic(&spec)
            .await
            .with_context(|| format!("Failed to provision topic '{}'", spec.name))?;

        info!(
            "Topic '{}' ready ({creation:?}, {} partition(s), replication {})",
            spec.name, spec.partitions, spec.replication
        );
        Ok(creation)
    }

    async fn connect(&self) -> Result<(B::Sink, Subscriber)> {
        let sink = self
            .backend
            .publisher()
            .context("Failed to create publisher")?;

        match self.backend.subscribe(&self.settings.topic) {
            Ok(subscriber) => Ok((sink, subscriber)),
            Err(e) => {
                if let Err(close_err) = sink.close().await {
                    warn!("Failed to close publisher: {close_err}");
                }
                Err(e).with_context(|| {
                    format!("Failed to subscribe to topic '{}'", self.settings.topic)
                })
            }
        }
    }

    async fn relay<W: Write>(
        &mut self,
        sink: &B::Sink,
        subscriber: &Subscriber,
        out: &mut W,
        report: &mut RelayReport,
    ) -> Result<()> {
        self.advance(RelayState::Publishing);
        let payloads: Vec<String> = self.settings.payloads().collect();
        for payload in payloads {
            writeln!(out, "Send to Kafka: {payload}")?;
            let message =
                Message::new(&self.settings.topic, &self.settings.message_key, &payload);
            sink.send(message)
                .await
                .with_context(|| format!("Failed to send '{payload}'"))?;
            report.sent.push(payload);
        }
        info!(
            "Sent {} messages to topic '{}'",
            report.sent.len(),
            self.settings.topic
        );

        self.advance(RelayState::Draining);
        let timeout = self.settings.receive_timeout;
        while let Some(message) = subscriber.queue().pop(timeout).await {
            writeln!(out, "{message}")?;
            report.received.push(message);
        }
        info!(
            "No message within {timeout:?}; received {} messages",
            report.received.len()
        );

        Ok(())
    }

    fn advance(&mut self, next: RelayState) {
        if !self.state.can_advance_to(next) {
            warn!("Unexpected relay transition {:?} -> {next:?}", self.state);
        }
        debug!("Relay state {:?} -> {next:?}", self.state);
        self.state = next;
    }
}

async fn teardown<S: MessageSink>(sink: S, subscriber: Subscriber) -> Result<()> {
    subscriber.shutdown().await;
    sink.close().await.context("Failed to close publisher")
}
