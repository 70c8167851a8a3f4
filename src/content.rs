//! Content parsers turning raw lines into messages for one wire format.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::WireFormat;
use crate::parser::{ExtractError, LineExtractor, LogRecord, StreamIdentity};
use crate::publisher::ParsedMessage;

/// Property carrying the timestamp text found in the line.
pub const LOG_TIMESTAMP_PROPERTY: &str = "logTimestamp";

/// Maps one raw line of a stream to the messages to publish.
pub trait ContentParser: Send + Sync {
    /// # Errors
    ///
    /// Returns the extraction error for the line.
    fn line_to_messages(
        &self,
        stream: &StreamIdentity,
        line: &str,
    ) -> Result<Vec<ParsedMessage>, ExtractError>;
}

/// Select the parser for `format`.
#[must_use]
pub fn content_parser(format: WireFormat, extractor: Arc<LineExtractor>) -> Box<dyn ContentParser> {
    match format {
        WireFormat::Raw => Box::new(RawContentParser::new(extractor)),
        WireFormat::Json => Box::new(JsonContentParser::new(extractor)),
    }
}

fn extract(
    extractor: &LineExtractor,
    stream: &StreamIdentity,
    line: &str,
) -> Result<LogRecord, ExtractError> {
    let record = extractor.parse(stream, line)?;
    tracing::trace!(
        stream = %stream,
        count = record.body().len(),
        line,
        "Lines extracted"
    );
    Ok(record)
}

/// One message per extracted body entry, carrying the entry as is.
#[derive(Debug, Clone)]
pub struct RawContentParser {
    extractor: Arc<LineExtractor>,
}

impl RawContentParser {
    #[must_use]
    pub fn new(extractor: Arc<LineExtractor>) -> Self {
        Self { extractor }
    }
}

impl ContentParser for RawContentParser {
    fn line_to_messages(
        &self,
        stream: &StreamIdentity,
        line: &str,
    ) -> Result<Vec<ParsedMessage>, ExtractError> {
        let record = extract(&self.extractor, stream, line)?;
        let mut properties = BTreeMap::new();
        if let Some(raw) = record.raw_timestamp() {
            properties.insert(LOG_TIMESTAMP_PROPERTY.to_string(), raw.to_string());
        }
        let timestamp = record.parsed_timestamp();

        Ok(record
            .into_body()
            .into_iter()
            .map(|body| ParsedMessage {
                body,
                timestamp,
                properties: properties.clone(),
            })
            .collect())
    }
}

/// One message per extracted body entry, wrapped in a JSON document with
/// the timestamps of the record.
#[derive(Debug, Clone)]
pub struct JsonContentParser {
    extractor: Arc<LineExtractor>,
}

impl JsonContentParser {
    #[must_use]
    pub fn new(extractor: Arc<LineExtractor>) -> Self {
        Self { extractor }
    }
}

impl ContentParser for JsonContentParser {
    fn line_to_messages(
        &self,
        stream: &StreamIdentity,
        line: &str,
    ) -> Result<Vec<ParsedMessage>, ExtractError> {
        let record = extract(&self.extractor, stream, line)?;
        let timestamp = record.parsed_timestamp();
        let raw_timestamp = record.raw_timestamp().map(str::to_string);
        let rendered = timestamp.map(|t| t.to_rfc3339());

        Ok(record
            .into_body()
            .into_iter()
            .map(|body| ParsedMessage {
                body: serde_json::json!({
                    "body": body,
                    "logTimestamp": raw_timestamp,
                    "timestamp": rendered,
                })
                .to_string(),
                timestamp,
                properties: BTreeMap::new(),
            })
            .collect())
    }
}
