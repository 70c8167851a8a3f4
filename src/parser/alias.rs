//! Compiled per-alias extraction settings.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use fancy_regex::Regex;

use crate::config::{AliasConfig, ConfigError};
use crate::watcher::{Charset, FileFilter};

use super::join::{GroupRef, JoinFormat};
use super::record::Direction;
use super::timestamp::{TimestampFormat, TimestampZone};

/// Filter applied when no direction is configured.
const ACCEPT_ANY: &str = ".*";

/// Alias settings with every pattern compiled.
///
/// Built once at startup and never changed afterwards.
#[derive(Debug, Clone)]
pub struct CompiledAlias {
    pub(crate) name: String,
    pub(crate) group: String,
    pub(crate) pattern: Regex,
    pub(crate) groups: Vec<usize>,
    pub(crate) directions: BTreeMap<Direction, Regex>,
    pub(crate) join: Option<JoinFormat>,
    pub(crate) timestamp_pattern: Option<Regex>,
    pub(crate) timestamp_format: Option<TimestampFormat>,
    pub(crate) zone: TimestampZone,
    pub(crate) skip_before: Option<DateTime<Utc>>,
    path_filter: FileFilter,
    charset: Charset,
}

impl CompiledAlias {
    /// Compile the settings of alias `name`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn compile(name: &str, config: &AliasConfig) -> Result<Self, ConfigError> {
        let pattern = compile_pattern(name, "regexp", &config.regexp)?;
        let path_filter =
            FileFilter::new(&config.path_filter).map_err(|e| ConfigError::InvalidRegex {
                alias: name.to_string(),
                field: "pathFilter",
                pattern: config.path_filter.clone(),
                source: Box::new(e),
            })?;

        let mut directions = BTreeMap::new();
        if config.direction_regexps.is_empty() {
            directions.insert(
                Direction::First,
                compile_pattern(name, "directionRegexps", ACCEPT_ANY)?,
            );
        }
        for (direction, filter) in &config.direction_regexps {
            directions.insert(*direction, compile_pattern(name, "directionRegexps", filter)?);
        }

        let available = pattern.captures_len() - 1;
        if let Some(&index) = config.groups.iter().find(|&&index| index > available) {
            return Err(ConfigError::GroupIndex {
                alias: name.to_string(),
                index,
                available,
            });
        }

        let join = if config.join_groups {
            Some(compile_join(name, config, &pattern)?)
        } else {
            None
        };

        let timestamp_pattern = config
            .timestamp_regexp
            .as_deref()
            .map(|p| compile_pattern(name, "timestampRegexp", p))
            .transpose()?;
        let timestamp_format = config
            .timestamp_format
            .as_deref()
            .filter(|format| !format.is_empty())
            .map(TimestampFormat::new)
            .transpose()
            .map_err(|reason| ConfigError::TimestampFormat {
                alias: name.to_string(),
                reason,
            })?;
        if timestamp_format.is_some() && timestamp_pattern.is_none() {
            return Err(ConfigError::MissingTimestampSetting {
                alias: name.to_string(),
                setting: "timestampFormat",
                requires: "timestampRegexp",
            });
        }
        if config.skip_before.is_some() && timestamp_format.is_none() {
            return Err(ConfigError::MissingTimestampSetting {
                alias: name.to_string(),
                setting: "skipBefore",
                requires: "timestampFormat",
            });
        }

        let zone = match &config.timestamp_zone {
            Some(zone) => zone.parse::<TimestampZone>().map_err(|reason| ConfigError::UnknownZone {
                alias: name.to_string(),
                reason,
            })?,
            None => TimestampZone::Local,
        };
        let charset = config
            .charset
            .parse::<Charset>()
            .map_err(|reason| ConfigError::UnknownCharset {
                alias: name.to_string(),
                reason,
            })?;

        Ok(Self {
            name: name.to_string(),
            group: config.group.clone().unwrap_or_else(|| name.to_string()),
            pattern,
            groups: config.groups.clone(),
            directions,
            join,
            timestamp_pattern,
            timestamp_format,
            zone,
            skip_before: config.skip_before,
            path_filter,
            charset,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Group label attached to records.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Configured directions in order.
    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        self.directions.keys().copied()
    }

    #[must_use]
    pub fn path_filter(&self) -> &FileFilter {
        &self.path_filter
    }

    #[must_use]
    pub fn charset(&self) -> Charset {
        self.charset
    }
}

fn compile_pattern(alias: &str, field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
        alias: alias.to_string(),
        field,
        pattern: pattern.to_string(),
        source: Box::new(e),
    })
}

fn compile_join(
    alias: &str,
    config: &AliasConfig,
    pattern: &Regex,
) -> Result<JoinFormat, ConfigError> {
    if config.headers_format.is_empty() {
        return Err(ConfigError::MissingHeaders {
            alias: alias.to_string(),
        });
    }
    let mut chars = config.groups_join_delimiter.chars();
    let delimiter = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(ConfigError::InvalidDelimiter {
                alias: alias.to_string(),
                delimiter: config.groups_join_delimiter.clone(),
            })
        }
    };

    let format = JoinFormat::new(&config.headers_format, delimiter);
    let names: HashSet<&str> = pattern.capture_names().flatten().collect();
    for (header, template) in format.columns() {
        for reference in template.references() {
            let known = match reference {
                GroupRef::Index(index) => *index < pattern.captures_len(),
                GroupRef::Name(name) => names.contains(name.as_str()),
            };
            if !known {
                return Err(ConfigError::UnknownGroupReference {
                    alias: alias.to_string(),
                    header: header.to_string(),
                    reference: match reference {
                        GroupRef::Index(index) => index.to_string(),
                        GroupRef::Name(name) => name.clone(),
                    },
                });
            }
        }
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(regexp: &str) -> AliasConfig {
        AliasConfig {
            regexp: regexp.to_string(),
            path_filter: ".*".to_string(),
            ..AliasConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let alias = CompiledAlias::compile("app", &config("(a)(b)")).unwrap();
        assert_eq!(alias.name(), "app");
        assert_eq!(alias.group(), "app");
        assert_eq!(alias.directions().collect::<Vec<_>>(), vec![Direction::First]);
        assert_eq!(alias.zone, TimestampZone::Local);
        assert_eq!(alias.charset(), Charset::Utf8);
        assert!(alias.join.is_none());
        assert!(alias.path_filter().matches("anything.log"));
    }

    #[test]
    fn test_custom_group_label() {
        let mut cfg = config(".*");
        cfg.group = Some("fix-group".to_string());
        let alias = CompiledAlias::compile("fix", &cfg).unwrap();
        assert_eq!(alias.group(), "fix-group");
    }

    #[test]
    fn test_group_index_out_of_range() {
        let mut cfg = config("(a)");
        cfg.groups = vec![0, 1, 2];
        assert!(matches!(
            CompiledAlias::compile("app", &cfg),
            Err(ConfigError::GroupIndex {
                index: 2,
                available: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_join_requires_headers() {
        let mut cfg = config("(a)");
        cfg.join_groups = true;
        assert!(matches!(
            CompiledAlias::compile("app", &cfg),
            Err(ConfigError::MissingHeaders { .. })
        ));
    }

    #[test]
    fn test_join_delimiter_must_be_one_char() {
        let mut cfg = config("(a)");
        cfg.join_groups = true;
        cfg.headers_format.insert("A".to_string(), "${1}".to_string());
        cfg.groups_join_delimiter = ";;".to_string();
        assert!(matches!(
            CompiledAlias::compile("app", &cfg),
            Err(ConfigError::InvalidDelimiter { .. })
        ));

        cfg.groups_join_delimiter = "\t".to_string();
        assert!(CompiledAlias::compile("app", &cfg).is_ok());
    }

    #[test]
    fn test_join_reference_must_exist() {
        let mut cfg = config("(?<A>a)");
        cfg.join_groups = true;
        cfg.headers_format.insert("A".to_string(), "${A}".to_string());
        assert!(CompiledAlias::compile("app", &cfg).is_ok());

        cfg.headers_format.insert("B".to_string(), "${B}".to_string());
        match CompiledAlias::compile("app", &cfg) {
            Err(ConfigError::UnknownGroupReference {
                header, reference, ..
            }) => {
                assert_eq!(header, "B");
                assert_eq!(reference, "B");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_settings() {
        let mut cfg = config(".*");
        cfg.timestamp_format = Some("yyyy-MM-dd".to_string());
        assert!(matches!(
            CompiledAlias::compile("app", &cfg),
            Err(ConfigError::MissingTimestampSetting { .. })
        ));

        cfg.timestamp_regexp = Some(r"^\S+".to_string());
        cfg.timestamp_zone = Some("Mars/Olympus".to_string());
        assert!(matches!(
            CompiledAlias::compile("app", &cfg),
            Err(ConfigError::UnknownZone { .. })
        ));

        cfg.timestamp_zone = Some("UTC".to_string());
        let alias = CompiledAlias::compile("app", &cfg).unwrap();
        assert_eq!(alias.zone, TimestampZone::utc());
    }

    #[test]
    fn test_unknown_charset() {
        let mut cfg = config(".*");
        cfg.charset = "EBCDIC".to_string();
        assert!(matches!(
            CompiledAlias::compile("app", &cfg),
            Err(ConfigError::UnknownCharset { .. })
        ));
    }

    #[test]
    fn test_invalid_path_filter() {
        let mut cfg = config(".*");
        cfg.path_filter = "(".to_string();
        assert!(matches!(
            CompiledAlias::compile("app", &cfg),
            Err(ConfigError::InvalidRegex {
                field: "pathFilter",
                ..
            })
        ));
    }
}
