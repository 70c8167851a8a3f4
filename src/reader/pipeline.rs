//! The reader pipeline: tail, extract, publish.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ReaderError;
use crate::config::ReaderConfig;
use crate::content::{content_parser, ContentParser};
use crate::parser::{Direction, LineExtractor, StreamIdentity};
use crate::publisher::{BatchPublisher, PublishError};
use crate::sink::{BatchSink, EventSink};
use crate::watcher::{DirectoryTailer, WatcherError};

/// Tailer and publishers of one alias.
#[derive(Debug)]
struct AliasStream {
    tailer: DirectoryTailer,
    publishers: BTreeMap<Direction, BatchPublisher>,
    /// Stream named in reports about the files of the alias.
    report_stream: StreamIdentity,
}

impl AliasStream {
    fn process(
        &mut self,
        parser: &dyn ContentParser,
        events: &dyn EventSink,
    ) -> Result<(), ReaderError> {
        loop {
            self.drain(parser, events)?;
            match self.tailer.refresh() {
                Ok(true) => tracing::debug!(stream = %self.report_stream, "New data available"),
                Ok(false) => break,
                Err(err) => {
                    self.report(&err, events);
                    break;
                }
            }
        }

        for publisher in self.publishers.values_mut() {
            publisher.flush_if_due()?;
        }
        Ok(())
    }

    /// Handle every confirmed line available right now.
    fn drain(
        &mut self,
        parser: &dyn ContentParser,
        events: &dyn EventSink,
    ) -> Result<(), ReaderError> {
        loop {
            match self.tailer.next_line() {
                Ok(Some(line)) => self.handle_line(&line, parser, events)?,
                Ok(None) => return Ok(()),
                Err(err) => {
                    let file_local = err.is_file_local();
                    self.report(&err, events);
                    if !file_local {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Hand the messages of `line` to every direction.
    ///
    /// A sink failure does not stop the remaining messages: they are
    /// buffered by their publishers and the first failure is returned once
    /// the line is fully handed over.
    fn handle_line(
        &mut self,
        line: &str,
        parser: &dyn ContentParser,
        events: &dyn EventSink,
    ) -> Result<(), ReaderError> {
        let mut failure = None;
        for publisher in self.publishers.values_mut() {
            let messages = match parser.line_to_messages(publisher.stream(), line) {
                Ok(messages) => messages,
                Err(err) => {
                    events.on_error(
                        Some(publisher.stream()),
                        "Cannot extract records from line",
                        &err,
                    );
                    continue;
                }
            };
            for message in messages {
                match publisher.publish(message) {
                    Ok(_) => {}
                    Err(err @ PublishError::Sink(_)) => {
                        failure.get_or_insert(err);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
        failure.map_or(Ok(()), |err| Err(err.into()))
    }

    /// File errors become corruption reports and the file is skipped.
    fn report(&mut self, err: &WatcherError, events: &dyn EventSink) {
        if err.is_file_local() {
            let path = self
                .tailer
                .current_file()
                .map_or_else(|| self.tailer.directory().to_path_buf(), PathBuf::from);
            events.on_source_corrupted(&self.report_stream, &path, err);
            self.tailer.skip_current_file();
        } else {
            events.on_error(
                Some(&self.report_stream),
                "Cannot read log directory",
                err,
            );
        }
    }
}

/// Reads every configured alias from the log directory and publishes the
/// extracted messages.
pub struct LogReader {
    parser: Box<dyn ContentParser>,
    streams: Vec<AliasStream>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for LogReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogReader")
            .field("streams", &self.streams)
            .finish_non_exhaustive()
    }
}

impl LogReader {
    /// Build the pipeline for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the log directory
    /// cannot be watched.
    pub fn new(
        config: &ReaderConfig,
        sink: Arc<dyn BatchSink>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, ReaderError> {
        config.validate()?;
        let extractor = Arc::new(LineExtractor::from_config(config)?);
        let limits = config.batch.limits();

        let mut streams = Vec::new();
        for alias in extractor.aliases() {
            let tailer = DirectoryTailer::new(
                config.log_directory.clone(),
                alias.path_filter().clone(),
                alias.charset(),
            )?;

            let mut publishers = BTreeMap::new();
            for direction in alias.directions() {
                let stream = StreamIdentity::new(alias.name(), direction);
                let publisher =
                    BatchPublisher::new(stream, alias.group(), limits, Arc::clone(&sink))?;
                publishers.insert(direction, publisher);
            }

            let report_direction = alias.directions().next().unwrap_or_default();
            streams.push(AliasStream {
                tailer,
                publishers,
                report_stream: StreamIdentity::new(alias.name(), report_direction),
            });
        }

        tracing::info!(
            directory = %config.log_directory.display(),
            aliases = streams.len(),
            wire_format = ?config.wire_format,
            "Log reader started"
        );
        Ok(Self {
            parser: content_parser(config.wire_format, extractor),
            streams,
            events,
        })
    }

    /// Run one processing tick over every alias.
    ///
    /// File problems are reported to the event sink and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a message cannot be published. The remaining
    /// aliases are processed on the next tick.
    pub fn process_updates(&mut self) -> Result<(), ReaderError> {
        for stream in &mut self.streams {
            stream.process(self.parser.as_ref(), self.events.as_ref())?;
        }
        Ok(())
    }

    /// Release every file and flush every publisher.
    ///
    /// # Errors
    ///
    /// Returns the first flush failure; the other publishers are still
    /// flushed.
    pub fn close(&mut self) -> Result<(), ReaderError> {
        let mut result = Ok(());
        for stream in &mut self.streams {
            stream.tailer.close();
            for publisher in stream.publishers.values_mut() {
                if let Err(err) = publisher.close() {
                    tracing::error!(stream = %publisher.stream(), error = %err, "Failed to flush on close");
                    if result.is_ok() {
                        result = Err(err.into());
                    }
                }
            }
        }
        tracing::info!("Log reader closed");
        result
    }
}
