//! Stream identities and extracted records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sub-channel of an alias.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    First,
    Second,
}

impl Direction {
    /// Name used in configuration and message ids.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "FIRST",
            Self::Second => "SECOND",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alias and direction of one output stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamIdentity {
    alias: String,
    direction: Direction,
}

impl StreamIdentity {
    #[must_use]
    pub fn new(alias: impl Into<String>, direction: Direction) -> Self {
        Self {
            alias: alias.into(),
            direction,
        }
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.alias, self.direction)
    }
}

/// Content extracted from one raw line for one stream.
///
/// An empty body means the line carries nothing for the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    body: Vec<String>,
    raw_timestamp: Option<String>,
    parsed_timestamp: Option<DateTime<Utc>>,
    direction: Direction,
    group: String,
}

impl LogRecord {
    /// Record without content.
    #[must_use]
    pub fn empty(direction: Direction, group: impl Into<String>) -> Self {
        RecordBuilder::default().build(direction, group)
    }

    #[must_use]
    pub fn body(&self) -> &[String] {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Vec<String> {
        self.body
    }

    /// Timestamp text as found in the line.
    #[must_use]
    pub fn raw_timestamp(&self) -> Option<&str> {
        self.raw_timestamp.as_deref()
    }

    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.parsed_timestamp
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Group label of the alias.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Accumulates the parts of a [`LogRecord`] during a single parse.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    body: Vec<String>,
    raw_timestamp: Option<String>,
    parsed_timestamp: Option<DateTime<Utc>>,
}

impl RecordBuilder {
    pub fn push_body(&mut self, item: impl Into<String>) {
        self.body.push(item.into());
    }

    pub fn set_raw_timestamp(&mut self, raw: impl Into<String>) {
        self.raw_timestamp = Some(raw.into());
    }

    pub fn set_parsed_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.parsed_timestamp = Some(timestamp);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Finish the record.
    #[must_use]
    pub fn build(self, direction: Direction, group: impl Into<String>) -> LogRecord {
        LogRecord {
            body: self.body,
            raw_timestamp: self.raw_timestamp,
            parsed_timestamp: self.parsed_timestamp,
            direction,
            group: group.into(),
        }
    }
}
