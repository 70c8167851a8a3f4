//! In-memory sink.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{BatchSink, EventSink, SinkError};
use crate::parser::StreamIdentity;
use crate::publisher::OutgoingMessage;

/// Event recorded by a [`CollectingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Error {
        stream: Option<StreamIdentity>,
        message: String,
        cause: String,
    },
    Corrupted {
        stream: StreamIdentity,
        path: PathBuf,
        cause: String,
    },
}

/// Keeps every batch and event in memory.
///
/// Can be switched to reject batches to exercise failure paths.
#[derive(Debug, Default)]
pub struct CollectingSink {
    batches: Mutex<Vec<(StreamIdentity, Vec<OutgoingMessage>)>>,
    events: Mutex<Vec<SinkEvent>>,
    failing: AtomicBool,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every following batch while `failing` is set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delivered batches in order.
    #[must_use]
    pub fn batches(&self) -> Vec<(StreamIdentity, Vec<OutgoingMessage>)> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bodies delivered for `stream`, across batches.
    #[must_use]
    pub fn bodies(&self, stream: &StreamIdentity) -> Vec<String> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(batch_stream, _)| batch_stream == stream)
            .flat_map(|(_, batch)| batch.iter().map(|message| message.body.clone()))
            .collect()
    }

    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl BatchSink for CollectingSink {
    fn on_stream_data(
        &self,
        stream: &StreamIdentity,
        batch: &[OutgoingMessage],
    ) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected {
                stream: stream.to_string(),
                reason: "sink is failing".to_string(),
            });
        }
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((stream.clone(), batch.to_vec()));
        Ok(())
    }
}

impl EventSink for CollectingSink {
    fn on_error(
        &self,
        stream: Option<&StreamIdentity>,
        message: &str,
        cause: &(dyn Error + 'static),
    ) {
        self.record(SinkEvent::Error {
            stream: stream.cloned(),
            message: message.to_string(),
            cause: cause.to_string(),
        });
    }

    fn on_source_corrupted(
        &self,
        stream: &StreamIdentity,
        path: &Path,
        cause: &(dyn Error + 'static),
    ) {
        self.record(SinkEvent::Corrupted {
            stream: stream.clone(),
            path: path.to_path_buf(),
            cause: cause.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Direction;

    #[test]
    fn test_failing_rejects_batches() {
        let sink = CollectingSink::new();
        let stream = StreamIdentity::new("app", Direction::First);

        sink.set_failing(true);
        assert!(sink.on_stream_data(&stream, &[]).is_err());
        sink.set_failing(false);
        sink.on_stream_data(&stream, &[]).unwrap();
        assert_eq!(sink.batches().len(), 1);
    }

    #[test]
    fn test_records_events() {
        let sink = CollectingSink::new();
        let stream = StreamIdentity::new("app", Direction::First);
        let cause = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");

        sink.on_error(None, "failed", &cause);
        sink.on_source_corrupted(&stream, Path::new("/logs/a.log"), &cause);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], SinkEvent::Error { stream: None, .. }));
        assert!(matches!(&events[1], SinkEvent::Corrupted { path, .. } if path == Path::new("/logs/a.log")));
    }
}
