//! Destinations for batches and pipeline events.
//!
//! The reader pushes completed batches into a [`BatchSink`] and reports
//! problems to an [`EventSink`]. Delivery and retry policies belong to the
//! implementations.

mod collecting;
mod error;
mod json_lines;
mod logging;

use std::error::Error;
use std::path::Path;

pub use collecting::{CollectingSink, SinkEvent};
pub use error::SinkError;
pub use json_lines::JsonLinesSink;
pub use logging::TracingEventSink;

use crate::parser::StreamIdentity;
use crate::publisher::OutgoingMessage;

/// Receives completed batches.
pub trait BatchSink: Send + Sync {
    /// Deliver one batch of `stream`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch was not delivered. The publisher keeps
    /// the batch and retries on its next flush.
    fn on_stream_data(
        &self,
        stream: &StreamIdentity,
        batch: &[OutgoingMessage],
    ) -> Result<(), SinkError>;
}

/// Receives non-fatal problems.
pub trait EventSink: Send + Sync {
    /// A processing error, with the stream it concerns if known.
    fn on_error(
        &self,
        stream: Option<&StreamIdentity>,
        message: &str,
        cause: &(dyn Error + 'static),
    );

    /// A file could not be read as expected and was skipped.
    fn on_source_corrupted(
        &self,
        stream: &StreamIdentity,
        path: &Path,
        cause: &(dyn Error + 'static),
    );
}
