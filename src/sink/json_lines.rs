//! Sink writing one JSON document per message.

use std::io::{Stdout, Write};
use std::sync::{Mutex, PoisonError};

use super::{BatchSink, SinkError};
use crate::parser::StreamIdentity;
use crate::publisher::OutgoingMessage;

/// Writes every message as a JSON line and flushes after each batch.
///
/// A batch goes out in a single write.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesSink<Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> BatchSink for JsonLinesSink<W> {
    fn on_stream_data(
        &self,
        stream: &StreamIdentity,
        batch: &[OutgoingMessage],
    ) -> Result<(), SinkError> {
        // Failed batches are resent whole; write nothing until all of it is ready.
        let mut buffer = Vec::new();
        for message in batch {
            serde_json::to_writer(&mut buffer, message)?;
            buffer.push(b'\n');
        }

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&buffer)?;
        writer.flush()?;
        tracing::trace!(stream = %stream, count = batch.len(), "Batch written");
        Ok(())
    }
}
