//! End-to-end tests of the reader pipeline over a real log directory.

mod extraction_test;
mod rotation_test;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use readlog::config::{AliasConfig, ReaderConfig};
use readlog::reader::LogReader;
use readlog::sink::{BatchSink, CollectingSink, EventSink};

/// Alias reading `app*.log` files and publishing every `msg=` value.
pub fn app_alias() -> AliasConfig {
    AliasConfig {
        regexp: r"msg=(\w+)".to_string(),
        path_filter: r"app.*\.log".to_string(),
        groups: vec![1],
        ..AliasConfig::default()
    }
}

pub fn single_alias_config(dir: &Path, alias: AliasConfig) -> ReaderConfig {
    let mut config = ReaderConfig::new(dir);
    config.aliases.insert("app".to_string(), alias);
    config
}

pub fn start_reader(config: &ReaderConfig) -> (LogReader, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let reader = LogReader::new(
        config,
        Arc::clone(&sink) as Arc<dyn BatchSink>,
        Arc::clone(&sink) as Arc<dyn EventSink>,
    )
    .expect("Reader should start");
    (reader, sink)
}

pub fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

/// Verify the pipeline types are reachable from the library root.
#[test]
fn test_pipeline_types_exported() {
    use readlog::content::LOG_TIMESTAMP_PROPERTY;
    use readlog::parser::{Direction, StreamIdentity};
    use readlog::publisher::{BatchLimits, PublishError};
    use readlog::reader::{ReaderError, Scheduler};
    use readlog::watcher::{Charset, FileFilter};

    let _ = Scheduler::new();
    let _ = BatchLimits::default();
    let _ = Charset::default();
    let _ = StreamIdentity::new("app", Direction::Second);
    let _: fn() -> ReaderError = || PublishError::InvalidConfiguration {
        lines: 0,
        characters: 0,
    }
    .into();
    let _ = FileFilter::new(".*").unwrap();
    assert_eq!(LOG_TIMESTAMP_PROPERTY, "logTimestamp");
}
