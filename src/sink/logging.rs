//! Event sink that reports through `tracing`.

use std::error::Error;
use std::path::Path;

use super::EventSink;
use crate::parser::StreamIdentity;

/// Logs errors and corrupted sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn on_error(
        &self,
        stream: Option<&StreamIdentity>,
        message: &str,
        cause: &(dyn Error + 'static),
    ) {
        match stream {
            Some(stream) => tracing::error!(stream = %stream, error = %cause, "{message}"),
            None => tracing::error!(error = %cause, "{message}"),
        }
    }

    fn on_source_corrupted(
        &self,
        stream: &StreamIdentity,
        path: &Path,
        cause: &(dyn Error + 'static),
    ) {
        tracing::warn!(
            stream = %stream,
            path = %path.display(),
            error = %cause,
            "Source corrupted, skipping file"
        );
    }
}
