//! Single-process broker implementing the same seams as [`Client`](crate::Client).
//!
//! Every topic is one append-only partition. Subscribers resolve their start
//! offset when they are created and auto-commit as they read, so `stored`
//! offsets behave like a consumer group's committed position. Faults can be
//! injected into provisioning and publishing.

use crate::admin::{validate_topic_name, TopicAdmin, TopicCreation};
use crate::client::Backend;
use crate::config::{StartOffset, TopicSpec, DEFAULT_GROUP_ID};
use crate::consumer::{RecordSource, Subscriber};
use crate::error::{Error, Result};
use crate::message::{Message, Record};
use crate::producer::MessageSink;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug)]
struct MemoryTopic {
    spec: TopicSpec,
    log: Vec<Record>,
}

#[derive(Debug, Default)]
struct Faults {
    provisioning: Option<String>,
    send: Option<String>,
}

#[derive(Debug)]
struct State {
    topics: Mutex<HashMap<String, MemoryTopic>>,
    /// Next offset to read, per (group, topic)
    committed: Mutex<HashMap<(String, String), i64>>,
    faults: Mutex<Faults>,
    closed: Mutex<bool>,
    /// Bumped on every append and on close
    version: watch::Sender<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl State {
    fn append(&self, topic: &str, key: Option<Vec<u8>>, payload: Option<Vec<u8>>) -> Result<i64> {
        let offset = {
            let mut topics = lock(&self.topics);
            let entry = topics
                .get_mut(topic)
                .ok_or_else(|| Error::Send(format!("Unknown topic: {topic}")))?;
            let offset = entry.log.len() as i64;
            entry.log.push(Record {
                topic: topic.to_string(),
                partition: 0,
                offset,
                key,
                payload,
                timestamp: now_millis(),
            });
            offset
        };
        self.version.send_modify(|v| *v += 1);
        Ok(offset)
    }
}

fn now_millis() -> Option<i64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
}

/// In-memory broker handle. Clones share the same topics.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    state: Arc<State>,
    group_id: String,
    start_offset: StartOffset,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Arc::new(State {
                topics: Mutex::new(HashMap::new()),
                committed: Mutex::new(HashMap::new()),
                faults: Mutex::new(Faults::default()),
                closed: Mutex::new(false),
                version,
            }),
            group_id: DEFAULT_GROUP_ID.to_string(),
            start_offset: StartOffset::Earliest,
        }
    }

    /// Handle whose subscribers join `group_id`
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    /// Handle whose subscribers start at `start_offset`
    pub fn with_start_offset(mut self, start_offset: StartOffset) -> Self {
        self.start_offset = start_offset;
        self
    }

    /// Make every topic creation fail with `reason`.
    pub fn fail_provisioning(&self, reason: impl Into<String>) {
        lock(&self.state.faults).provisioning = Some(reason.into());
    }

    /// Make every send fail with `reason`.
    pub fn fail_sends(&self, reason: impl Into<String>) {
        lock(&self.state.faults).send = Some(reason.into());
    }

    /// Append a raw record, bypassing string encoding.
    pub fn append_raw(
        &self,
        topic: &str,
        key: Option<Vec<u8>>,
        payload: Option<Vec<u8>>,
    ) -> Result<i64> {
        self.state.append(topic, key, payload)
    }

    pub fn topic_spec(&self, topic: &str) -> Option<TopicSpec> {
        lock(&self.state.topics).get(topic).map(|t| t.spec.clone())
    }

    /// All records appended to the topic so far.
    pub fn records(&self, topic: &str) -> Vec<Record> {
        lock(&self.state.topics)
            .get(topic)
            .map(|t| t.log.clone())
            .unwrap_or_default()
    }

    /// Committed position of this handle's group on the topic.
    pub fn committed_offset(&self, topic: &str) -> Option<i64> {
        lock(&self.state.committed)
            .get(&(self.group_id.clone(), topic.to_string()))
            .copied()
    }

    /// End all subscriptions once they have read everything appended so far.
    pub fn close(&self) {
        *lock(&self.state.closed) = true;
        self.state.version.send_modify(|v| *v += 1);
    }

    fn resolve_start(&self, topic: &str) -> i64 {
        match self.start_offset {
            StartOffset::Earliest => 0,
            StartOffset::Latest => lock(&self.state.topics)
                .get(topic)
                .map_or(0, |t| t.log.len() as i64),
            StartOffset::Stored => self.committed_offset(topic).unwrap_or(0),
            StartOffset::At(offset) => offset,
        }
    }
}

/// Admin handle of a [`MemoryBroker`]
pub struct MemoryAdmin {
    state: Arc<State>,
}

#[async_trait]
impl TopicAdmin for MemoryAdmin {
    async fn ensure_topic(&self, spec: &TopicSpec) -> Result<TopicCreation> {
        validate_topic_name(&spec.name)?;
        if let Some(reason) = &lock(&self.state.faults).provisioning {
            return Err(Error::Provisioning(format!(
                "Failed to create topic {}: {reason}",
                spec.name
            )));
        }

        let mut topics = lock(&self.state.topics);
        if topics.contains_key(&spec.name) {
            debug!("Topic '{}' already exists", spec.name);
            return Ok(TopicCreation::AlreadyExists);
        }
        topics.insert(
            spec.name.clone(),
            MemoryTopic {
                spec: spec.clone(),
                log: Vec::new(),
            },
        );
        debug!("Topic '{}' created", spec.name);
        Ok(TopicCreation::Created)
    }
}

/// Producer handle of a [`MemoryBroker`]
pub struct MemorySink {
    state: Arc<State>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&self, message: Message) -> Result<()> {
        validate_topic_name(message.topic())?;
        if let Some(reason) = &lock(&self.state.faults).send {
            return Err(Error::Send(format!(
                "Failed to send message to {}: {reason}",
                message.topic()
            )));
        }

        self.state.append(
            message.topic(),
            message.key().map(|k| k.as_bytes().to_vec()),
            Some(message.payload().as_bytes().to_vec()),
        )?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Subscription to one topic of a [`MemoryBroker`]
pub struct MemorySource {
    state: Arc<State>,
    group_id: String,
    topic: String,
    position: i64,
    version: watch::Receiver<u64>,
}

impl MemorySource {
    fn commit(&self) {
        lock(&self.state.committed)
            .insert((self.group_id.clone(), self.topic.clone()), self.position);
    }

    fn poll(&mut self) -> Option<Record> {
        let topics = lock(&self.state.topics);
        let record = topics
            .get(&self.topic)
            .and_then(|t| usize::try_from(self.position).ok().and_then(|i| t.log.get(i)))
            .cloned()?;
        drop(topics);

        self.position = record.offset + 1;
        self.commit();
        Some(record)
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn next_record(&mut self) -> Option<Result<Record>> {
        loop {
            self.version.mark_unchanged();
            if let Some(record) = self.poll() {
                return Some(Ok(record));
            }
            let closed = *lock(&self.state.closed);
            if closed {
                return None;
            }
            if self.version.changed().await.is_err() {
                return None;
            }
        }
    }
}

impl Backend for MemoryBroker {
    type Admin = MemoryAdmin;
    type Sink = MemorySink;

    fn admin(&self) -> Result<MemoryAdmin> {
        Ok(MemoryAdmin {
            state: Arc::clone(&self.state),
        })
    }

    fn publisher(&self) -> Result<MemorySink> {
        Ok(MemorySink {
            state: Arc::clone(&self.state),
        })
    }

    fn subscribe(&self, topic: &str) -> Result<Subscriber> {
        validate_topic_name(topic)?;
        let source = MemorySource {
            state: Arc::clone(&self.state),
            group_id: self.group_id.clone(),
            topic: topic.to_string(),
            position: self.resolve_start(topic),
            version: self.state.version.subscribe(),
        };
        Ok(Subscriber::spawn(source))
    }
}
