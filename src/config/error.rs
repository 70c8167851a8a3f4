//! Configuration error types.

use std::path::PathBuf;

/// Errors raised while loading or validating configuration.
///
/// All of them are fatal: the reader does not start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// None of the search paths holds a config file.
    #[error("No config file found in {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("No aliases configured")]
    NoAliases,

    /// A batch limit is zero.
    #[error("Batch limit '{field}' must be positive")]
    InvalidBatchLimit { field: &'static str },

    /// A pattern of an alias does not compile.
    #[error("Alias '{alias}': invalid {field} '{pattern}': {source}")]
    InvalidRegex {
        alias: String,
        field: &'static str,
        pattern: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Join mode is enabled without headers.
    #[error("Alias '{alias}': joinGroups requires a non-empty headersFormat")]
    MissingHeaders { alias: String },

    /// The join delimiter is not exactly one character.
    #[error("Alias '{alias}': groupsJoinDelimiter must be a single character, got '{delimiter}'")]
    InvalidDelimiter { alias: String, delimiter: String },

    /// A header template references a group the pattern does not define.
    #[error("Alias '{alias}': header '{header}' references unknown group '{reference}'")]
    UnknownGroupReference {
        alias: String,
        header: String,
        reference: String,
    },

    /// A configured group index exceeds the groups of the pattern.
    #[error("Alias '{alias}': group {index} does not exist, the pattern has {available} groups")]
    GroupIndex {
        alias: String,
        index: usize,
        available: usize,
    },

    #[error("Alias '{alias}': {reason}")]
    UnknownZone { alias: String, reason: String },

    #[error("Alias '{alias}': {reason}")]
    UnknownCharset { alias: String, reason: String },

    /// The timestamp format cannot be compiled.
    #[error("Alias '{alias}': timestampFormat: {reason}")]
    TimestampFormat { alias: String, reason: String },

    /// A timestamp setting is missing the setting it builds on.
    #[error("Alias '{alias}': {setting} requires {requires}")]
    MissingTimestampSetting {
        alias: String,
        setting: &'static str,
        requires: &'static str,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
