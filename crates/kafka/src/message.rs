//! String messages and the raw records they are decoded from.

use crate::error::{Error, Result};
use std::fmt;

/// A string message travelling through the relay.
///
/// Outgoing messages only carry a topic, an optional key and a payload.
/// Messages decoded from consumed records also carry the partition, offset
/// and timestamp the broker reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    topic: String,
    key: Option<String>,
    payload: String,
    partition: Option<i32>,
    offset: Option<i64>,
    timestamp: Option<i64>,
}

impl Message {
    /// Create an outgoing message. An empty key means "no key".
    pub fn new(
        topic: impl Into<String>,
        key: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self {
            topic: topic.into(),
            key: (!key.is_empty()).then_some(key),
            payload: payload.into(),
            partition: None,
            offset: None,
            timestamp: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn partition(&self) -> Option<i32> {
        self.partition
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Message timestamp (milliseconds since epoch)
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message [payload={}", self.payload)?;
        if let Some(key) = &self.key {
            write!(f, ", key={key}")?;
        }
        write!(f, ", topic={}", self.topic)?;
        if let Some(partition) = self.partition {
            write!(f, ", partition={partition}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, ", offset={offset}")?;
        }
        write!(f, "]")
    }
}

/// An undecoded record as read from a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    /// Record timestamp (milliseconds since epoch)
    pub timestamp: Option<i64>,
}

impl Record {
    /// Decode key and payload as UTF-8 strings.
    ///
    /// Records without a payload (tombstones) cannot be represented as a
    /// string message and are rejected.
    pub fn decode(self) -> Result<Message> {
        let key = match self.key {
            Some(bytes) => Some(String::from_utf8(bytes).map_err(|e| {
                Error::Deserialization(format!(
                    "key at {}/{}@{} is not valid UTF-8: {e}",
                    self.topic, self.partition, self.offset
                ))
            })?),
            None => None,
        };

        let payload = self.payload.ok_or_else(|| {
            Error::Deserialization(format!(
                "record at {}/{}@{} has no payload",
                self.topic, self.partition, self.offset
            ))
        })?;
        let payload = String::from_utf8(payload).map_err(|e| {
            Error::Deserialization(format!(
                "payload at {}/{}@{} is not valid UTF-8: {e}",
                self.topic, self.partition, self.offset
            ))
        })?;

        Ok(Message {
            topic: self.topic,
            key,
            payload,
            partition: Some(self.partition),
            offset: Some(self.offset),
            timestamp: self.timestamp,
        })
    }
}
