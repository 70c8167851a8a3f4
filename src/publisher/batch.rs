//! Accumulates messages of one stream and flushes them in bounded batches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use super::error::PublishError;
use super::message::{MessageId, OutgoingMessage, ParsedMessage};
use crate::parser::StreamIdentity;
use crate::sink::BatchSink;

/// A non-empty batch older than this is flushed.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// Bounds of a single batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Messages per batch.
    pub lines: usize,
    /// Body bytes per batch.
    pub characters: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            lines: 100,
            characters: 100_000_000,
        }
    }
}

/// Batching publisher of one stream.
///
/// Not meant for concurrent use; the reader drives it from a single task.
pub struct BatchPublisher {
    stream: StreamIdentity,
    group: String,
    limits: BatchLimits,
    flush_interval: Duration,
    sink: Arc<dyn BatchSink>,
    buffer: Vec<ParsedMessage>,
    size: usize,
    last_flush: Instant,
    /// Last sequence number handed to the sink.
    sequence: u64,
}

impl std::fmt::Debug for BatchPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPublisher")
            .field("stream", &self.stream)
            .field("limits", &self.limits)
            .field("pending", &self.buffer.len())
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl BatchPublisher {
    /// Create a publisher for `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidConfiguration`] if a limit is zero.
    pub fn new(
        stream: StreamIdentity,
        group: impl Into<String>,
        limits: BatchLimits,
        sink: Arc<dyn BatchSink>,
    ) -> Result<Self, PublishError> {
        if limits.lines == 0 || limits.characters == 0 {
            return Err(PublishError::InvalidConfiguration {
                lines: limits.lines,
                characters: limits.characters,
            });
        }
        Ok(Self {
            stream,
            group: group.into(),
            limits,
            flush_interval: FLUSH_INTERVAL,
            sink,
            buffer: Vec::new(),
            size: 0,
            last_flush: Instant::now(),
            sequence: 0,
        })
    }

    /// Replace the age after which a batch is flushed.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    #[must_use]
    pub fn stream(&self) -> &StreamIdentity {
        &self.stream
    }

    /// Messages waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Add a message, flushing when a limit is reached.
    ///
    /// Returns `true` if this call delivered a batch.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::LineTooLarge`] if the body alone exceeds the
    /// byte limit, or the sink error if a flush fails. On sink failure the
    /// message is buffered with the rest and delivered by a later flush.
    pub fn publish(&mut self, message: ParsedMessage) -> Result<bool, PublishError> {
        let length = message.len();
        if length > self.limits.characters {
            return Err(PublishError::LineTooLarge {
                stream: self.stream.to_string(),
                limit: self.limits.characters,
                length,
            });
        }

        let mut flushed = false;
        if self.size + length > self.limits.characters {
            match self.flush() {
                Ok(delivered) => flushed = delivered,
                Err(err) => {
                    self.push(message);
                    return Err(err);
                }
            }
        }

        self.push(message);
        if self.is_due() {
            flushed |= self.flush()?;
        }
        Ok(flushed)
    }

    /// Flush a batch that is full or older than the flush interval.
    ///
    /// Messages kept after a sink failure are retried here.
    ///
    /// # Errors
    ///
    /// Returns the sink error if the flush fails.
    pub fn flush_if_due(&mut self) -> Result<bool, PublishError> {
        if !self.is_due() {
            return Ok(false);
        }
        self.flush()
    }

    /// Flush whatever is pending.
    ///
    /// # Errors
    ///
    /// Returns the sink error if the final flush fails.
    pub fn close(&mut self) -> Result<(), PublishError> {
        if !self.buffer.is_empty() {
            self.flush()?;
        }
        tracing::info!(stream = %self.stream, "Publisher closed");
        Ok(())
    }

    fn push(&mut self, message: ParsedMessage) {
        self.size += message.len();
        self.buffer.push(message);
    }

    fn is_due(&self) -> bool {
        !self.buffer.is_empty()
            && (self.buffer.len() >= self.limits.lines
                || self.size > self.limits.characters
                || self.last_flush.elapsed() > self.flush_interval)
    }

    /// Deliver the whole buffer in batches within the limits.
    fn flush(&mut self) -> Result<bool, PublishError> {
        if self.buffer.is_empty() {
            tracing::trace!(stream = %self.stream, "Skip publishing empty batch");
            self.reset();
            return Ok(false);
        }
        while !self.buffer.is_empty() {
            self.send(self.next_batch_len())?;
        }
        self.reset();
        Ok(true)
    }

    /// Messages at the head of the buffer that fit into one batch.
    fn next_batch_len(&self) -> usize {
        let mut size = 0;
        let mut count = 0;
        for message in self.buffer.iter().take(self.limits.lines) {
            if count > 0 && size + message.len() > self.limits.characters {
                break;
            }
            size += message.len();
            count += 1;
        }
        count
    }

    fn send(&mut self, count: usize) -> Result<(), PublishError> {
        let send_time = Utc::now();
        let mut sequence = self.sequence;
        let batch: Vec<OutgoingMessage> = self.buffer[..count]
            .iter()
            .map(|message| {
                sequence += 1;
                OutgoingMessage {
                    id: MessageId {
                        alias: self.stream.alias().to_string(),
                        group: self.group.clone(),
                        direction: self.stream.direction(),
                        sequence,
                    },
                    send_time,
                    log_timestamp: message.timestamp,
                    properties: message.properties.clone(),
                    body: message.body.clone(),
                }
            })
            .collect();

        self.sink.on_stream_data(&self.stream, &batch)?;

        self.sequence = sequence;
        let sent: usize = self.buffer.drain(..count).map(|m| m.len()).sum();
        self.size -= sent;
        tracing::trace!(stream = %self.stream, count, last_sequence = sequence, "Batch published");
        Ok(())
    }

    fn reset(&mut self) {
        self.size = 0;
        self.last_flush = Instant::now();
    }
}
