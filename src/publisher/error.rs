//! Publisher error types.

use crate::sink::SinkError;

/// Errors raised by a batch publisher.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// A batch limit is zero.
    #[error("Invalid batch limits: lines {lines}, characters {characters}; both must be positive")]
    InvalidConfiguration { lines: usize, characters: usize },

    /// A single line does not fit into any batch.
    #[error("Line of {length} bytes for {stream} exceeds the batch limit of {limit} bytes")]
    LineTooLarge {
        stream: String,
        limit: usize,
        length: usize,
    },

    /// The sink did not accept a batch.
    #[error("Failed to deliver batch: {0}")]
    Sink(#[from] SinkError),
}
