//! Regex based record extraction.

use std::collections::BTreeMap;

use fancy_regex::{Captures, Regex};

use crate::config::{ConfigError, ReaderConfig};

use super::alias::CompiledAlias;
use super::error::ExtractError;
use super::record::{LogRecord, RecordBuilder, StreamIdentity};

/// Turns raw lines into records using the settings of their alias.
#[derive(Debug, Clone)]
pub struct LineExtractor {
    aliases: BTreeMap<String, CompiledAlias>,
}

impl LineExtractor {
    /// Create an extractor over compiled aliases.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoAliases`] if `aliases` is empty.
    pub fn new(aliases: BTreeMap<String, CompiledAlias>) -> Result<Self, ConfigError> {
        if aliases.is_empty() {
            return Err(ConfigError::NoAliases);
        }
        Ok(Self { aliases })
    }

    /// Compile every alias of `config`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid alias setting.
    pub fn from_config(config: &ReaderConfig) -> Result<Self, ConfigError> {
        let aliases = config
            .aliases
            .iter()
            .map(|(name, alias)| Ok((name.clone(), CompiledAlias::compile(name, alias)?)))
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;
        Self::new(aliases)
    }

    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&CompiledAlias> {
        self.aliases.get(name)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &CompiledAlias> {
        self.aliases.values()
    }

    /// Extract the record of `stream` from `line`.
    ///
    /// An empty record means the line carries nothing for the stream: the
    /// direction filter rejected it, the pattern found nothing or the
    /// timestamp is older than the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias is unknown, or if a timestamp pattern is
    /// configured and its timestamp cannot be found or parsed.
    pub fn parse(&self, stream: &StreamIdentity, line: &str) -> Result<LogRecord, ExtractError> {
        let alias = self
            .aliases
            .get(stream.alias())
            .ok_or_else(|| ExtractError::UnknownAlias(stream.alias().to_string()))?;
        let direction = stream.direction();

        let Some(filter) = alias.directions.get(&direction) else {
            return Ok(LogRecord::empty(direction, alias.group.as_str()));
        };
        if !filter.is_match(line).map_err(|e| regex_error(filter, e))? {
            return Ok(LogRecord::empty(direction, alias.group.as_str()));
        }

        let mut builder = RecordBuilder::default();
        extract_body(alias, line, &mut builder)?;
        if builder.is_empty() {
            return Ok(builder.build(direction, alias.group.as_str()));
        }

        if let Some(pattern) = &alias.timestamp_pattern {
            let raw = pattern
                .find(line)
                .map_err(|e| regex_error(pattern, e))?
                .ok_or_else(|| ExtractError::TimestampNotFound {
                    pattern: pattern.as_str().to_string(),
                    line: line.to_string(),
                })?
                .as_str();
            builder.set_raw_timestamp(raw);

            if let Some(format) = &alias.timestamp_format {
                let parsed =
                    format
                        .parse(raw, alias.zone)
                        .map_err(|reason| ExtractError::TimestampParse {
                            raw: raw.to_string(),
                            format: format.pattern().to_string(),
                            reason,
                        })?;
                if alias.skip_before.is_some_and(|threshold| parsed < threshold) {
                    tracing::trace!(stream = %stream, timestamp = %parsed, "Record skipped by timestamp");
                    return Ok(LogRecord::empty(direction, alias.group.as_str()));
                }
                builder.set_parsed_timestamp(parsed);
            }
        }

        Ok(builder.build(direction, alias.group.as_str()))
    }
}

fn extract_body(
    alias: &CompiledAlias,
    line: &str,
    builder: &mut RecordBuilder,
) -> Result<(), ExtractError> {
    let matches = alias
        .pattern
        .captures_iter(line)
        .collect::<Result<Vec<Captures<'_>>, _>>()
        .map_err(|e| regex_error(&alias.pattern, e))?;

    if let Some(join) = &alias.join {
        if !matches.is_empty() {
            builder.push_body(join.render(&matches));
        }
        return Ok(());
    }

    for captures in &matches {
        if alias.groups.is_empty() {
            for group in captures.iter().flatten() {
                builder.push_body(group.as_str());
            }
        } else {
            for group in alias.groups.iter().filter_map(|&index| captures.get(index)) {
                builder.push_body(group.as_str());
            }
        }
    }
    Ok(())
}

fn regex_error(pattern: &Regex, source: fancy_regex::Error) -> ExtractError {
    ExtractError::Regex {
        pattern: pattern.as_str().to_string(),
        source,
    }
}
