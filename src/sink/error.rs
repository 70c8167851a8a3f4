//! Sink error types.

/// Errors raised while delivering a batch.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Writing to the destination failed.
    #[error("Failed to write batch: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be serialized.
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The destination refused the batch.
    #[error("Batch for {stream} rejected: {reason}")]
    Rejected { stream: String, reason: String },
}
