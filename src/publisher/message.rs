//! Message types handed to the publisher and to sinks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::parser::Direction;

/// One message produced by a content parser, not yet sequenced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    pub body: String,
    /// Instant the record was logged at, when known.
    pub timestamp: Option<DateTime<Utc>>,
    pub properties: BTreeMap<String, String>,
}

impl ParsedMessage {
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Size of the body in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Identifies a message within its stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageId {
    pub alias: String,
    pub group: String,
    pub direction: Direction,
    /// Strictly increasing per publisher, starting at 1.
    pub sequence: u64,
}

/// A sequenced message inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub id: MessageId,
    pub send_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    pub body: String,
}
