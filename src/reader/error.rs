//! Reader error types.

use crate::config::ConfigError;
use crate::publisher::PublishError;
use crate::watcher::WatcherError;

/// Errors that stop a processing tick.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Configuration is invalid; the reader cannot start.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The log directory cannot be watched.
    #[error("Cannot watch log directory: {0}")]
    Watcher(#[from] WatcherError),

    /// Records cannot be published.
    #[error("Cannot publish records: {0}")]
    Publish(#[from] PublishError),
}

impl ReaderError {
    /// Whether the reader must stop.
    ///
    /// Sink failures are retried on the next tick; everything else points
    /// at a misconfiguration.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Publish(PublishError::Sink(_)))
    }
}
