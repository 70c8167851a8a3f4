//! Extraction error types.

/// Errors raised while extracting a record from a line.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// No alias with this name is configured.
    #[error("Unknown alias '{0}'. No configuration found")]
    UnknownAlias(String),

    /// The timestamp pattern found nothing in the line.
    #[error("The pattern '{pattern}' cannot extract the timestamp from the string '{line}'")]
    TimestampNotFound { pattern: String, line: String },

    /// The extracted timestamp does not conform to the format.
    #[error("The timestamp '{raw}' cannot be parsed using the '{format}' format: {reason}")]
    TimestampParse {
        raw: String,
        format: String,
        reason: String,
    },

    /// A pattern gave up while matching, e.g. on the backtracking limit.
    #[error("Pattern '{pattern}' failed to match: {source}")]
    Regex {
        pattern: String,
        source: fancy_regex::Error,
    },
}
