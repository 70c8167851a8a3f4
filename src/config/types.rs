//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::{CompiledAlias, Direction};
use crate::publisher::BatchLimits;

use super::ConfigError;

/// Representation of outgoing message bodies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Body is the extracted text.
    #[default]
    Raw,
    /// Body is a JSON document with the text and its timestamps.
    Json,
}

/// Limits of a single batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    #[serde(default = "default_lines_limit")]
    pub lines_limit: usize,
    /// Accumulated body bytes.
    #[serde(default = "default_characters_limit")]
    pub characters_limit: usize,
}

fn default_lines_limit() -> usize {
    100
}

fn default_characters_limit() -> usize {
    100_000_000
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            lines_limit: default_lines_limit(),
            characters_limit: default_characters_limit(),
        }
    }
}

impl BatchConfig {
    #[must_use]
    pub fn limits(&self) -> BatchLimits {
        BatchLimits {
            lines: self.lines_limit,
            characters: self.characters_limit,
        }
    }
}

/// One configured log stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasConfig {
    /// Main extraction pattern.
    pub regexp: String,
    /// Pattern the whole file name must match.
    pub path_filter: String,
    /// Filter per direction. Empty means a single `FIRST` direction.
    #[serde(default)]
    pub direction_regexps: BTreeMap<Direction, String>,
    /// Group indices to extract. Empty means the whole match and all groups.
    #[serde(default)]
    pub groups: Vec<usize>,
    pub timestamp_regexp: Option<String>,
    pub timestamp_format: Option<String>,
    /// Zone of timestamps without an offset. Absent means the local zone.
    pub timestamp_zone: Option<String>,
    /// Records stamped earlier than this are dropped.
    pub skip_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub join_groups: bool,
    #[serde(default = "default_delimiter")]
    pub groups_join_delimiter: String,
    /// Header name to template, rendered in name order.
    #[serde(default)]
    pub headers_format: BTreeMap<String, String>,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Group label of the records. Defaults to the alias name.
    pub group: Option<String>,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            regexp: String::new(),
            path_filter: String::new(),
            direction_regexps: BTreeMap::new(),
            groups: Vec::new(),
            timestamp_regexp: None,
            timestamp_format: None,
            timestamp_zone: None,
            skip_before: None,
            join_groups: false,
            groups_join_delimiter: default_delimiter(),
            headers_format: BTreeMap::new(),
            charset: default_charset(),
            group: None,
        }
    }
}

/// Top-level reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderConfig {
    pub log_directory: PathBuf,
    #[serde(default = "default_pulling_interval", with = "interval")]
    pub pulling_interval: Duration,
    #[serde(default)]
    pub wire_format: WireFormat,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub aliases: BTreeMap<String, AliasConfig>,
}

fn default_pulling_interval() -> Duration {
    Duration::from_secs(5)
}

/// Durations written as humantime strings such as `"250ms"` or `"5s"`.
mod interval {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

impl ReaderConfig {
    /// Configuration with defaults for everything but the directory.
    #[must_use]
    pub fn new(log_directory: impl Into<PathBuf>) -> Self {
        Self {
            log_directory: log_directory.into(),
            pulling_interval: default_pulling_interval(),
            wire_format: WireFormat::default(),
            batch: BatchConfig::default(),
            aliases: BTreeMap::new(),
        }
    }

    /// Check limits and compile every alias.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.lines_limit == 0 {
            return Err(ConfigError::InvalidBatchLimit {
                field: "linesLimit",
            });
        }
        if self.batch.characters_limit == 0 {
            return Err(ConfigError::InvalidBatchLimit {
                field: "charactersLimit",
            });
        }
        if self.aliases.is_empty() {
            return Err(ConfigError::NoAliases);
        }
        for (name, alias) in &self.aliases {
            CompiledAlias::compile(name, alias)?;
        }
        Ok(())
    }
}
