//! Extraction and wire formats seen through the reader.

use std::collections::BTreeMap;
use std::fs;

use chrono::{TimeZone, Utc};
use readlog::config::{AliasConfig, WireFormat};
use readlog::content::LOG_TIMESTAMP_PROPERTY;
use readlog::parser::{Direction, StreamIdentity};
use readlog::sink::SinkEvent;
use tempfile::TempDir;

use super::{app_alias, single_alias_config, start_reader};

const LINES: &str = "\
2021-03-23 13:21:36 msg=early
2021-03-23 13:21:37 msg=on_time
2021-03-23 13:21:38 msg=late msg=later
";

fn timestamped_alias() -> AliasConfig {
    AliasConfig {
        timestamp_regexp: Some(r"^\S+ \S+".to_string()),
        timestamp_format: Some("yyyy-MM-dd HH:mm:ss".to_string()),
        timestamp_zone: Some("UTC".to_string()),
        ..app_alias()
    }
}

fn stream() -> StreamIdentity {
    StreamIdentity::new("app", Direction::First)
}

#[test]
fn test_raw_messages_carry_log_timestamps() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), LINES).unwrap();

    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), timestamped_alias()));
    reader.process_updates().unwrap();
    reader.close().unwrap();

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    let messages = &batches[0].1;
    let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["early", "on_time", "late", "later"]);

    let late = &messages[2];
    assert_eq!(
        late.log_timestamp,
        Some(Utc.with_ymd_and_hms(2021, 3, 23, 13, 21, 38).unwrap())
    );
    assert_eq!(
        late.properties.get(LOG_TIMESTAMP_PROPERTY).map(String::as_str),
        Some("2021-03-23 13:21:38")
    );
    assert_eq!(late.id.alias, "app");
    assert_eq!(late.id.group, "app");
}

#[test]
fn test_lines_before_skip_point_are_dropped() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), LINES).unwrap();

    let alias = AliasConfig {
        skip_before: Some(Utc.with_ymd_and_hms(2021, 3, 23, 13, 21, 37).unwrap()),
        ..timestamped_alias()
    };
    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), alias));
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["on_time", "late", "later"]);
}

#[test]
fn test_json_wire_format_wraps_bodies() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), LINES).unwrap();

    let mut config = single_alias_config(dir.path(), timestamped_alias());
    config.wire_format = WireFormat::Json;
    let (mut reader, sink) = start_reader(&config);
    reader.process_updates().unwrap();
    reader.close().unwrap();

    let bodies = sink.bodies(&stream());
    assert_eq!(bodies.len(), 4);
    let document: serde_json::Value = serde_json::from_str(&bodies[1]).unwrap();
    assert_eq!(document["body"], "on_time");
    assert_eq!(document["logTimestamp"], "2021-03-23 13:21:37");
    assert_eq!(document["timestamp"], "2021-03-23T13:21:37+00:00");

    let batches = sink.batches();
    assert!(batches[0].1.iter().all(|m| m.properties.is_empty()));
}

#[test]
fn test_lines_without_timestamp_are_reported_and_skipped() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("app.log"),
        "msg=orphan\n2021-03-23 13:21:37 msg=kept\n",
    )
    .unwrap();

    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), timestamped_alias()));
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["kept"]);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], SinkEvent::Error { stream: Some(s), .. } if *s == stream()));
}

#[test]
fn test_join_mode_publishes_one_table_per_line() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("app.log"),
        "prices a=1 b=22\nnothing here\nprices c=3\n",
    )
    .unwrap();

    let mut headers = BTreeMap::new();
    headers.insert("Name".to_string(), "${1}".to_string());
    headers.insert("Value".to_string(), "${2}".to_string());
    let alias = AliasConfig {
        regexp: r"(\w)=(\d+)".to_string(),
        path_filter: r"app.*\.log".to_string(),
        join_groups: true,
        headers_format: headers,
        ..AliasConfig::default()
    };
    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), alias));
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(
        sink.bodies(&stream()),
        vec![
            "\"Name\",\"Value\"\n\"a\",\"1\"\n\"b\",\"22\"",
            "\"Name\",\"Value\"\n\"c\",\"3\"",
        ]
    );
}

#[test]
fn test_aliases_read_their_own_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), "msg=app_line\n").unwrap();
    fs::write(dir.path().join("audit.log"), "user=alice\nuser=bob\n").unwrap();

    let mut config = single_alias_config(dir.path(), app_alias());
    config.aliases.insert(
        "audit".to_string(),
        AliasConfig {
            regexp: r"user=(\w+)".to_string(),
            path_filter: r"audit\.log".to_string(),
            groups: vec![1],
            group: Some("security".to_string()),
            ..AliasConfig::default()
        },
    );
    let (mut reader, sink) = start_reader(&config);
    reader.process_updates().unwrap();
    reader.close().unwrap();

    let audit = StreamIdentity::new("audit", Direction::First);
    assert_eq!(sink.bodies(&stream()), vec!["app_line"]);
    assert_eq!(sink.bodies(&audit), vec!["alice", "bob"]);

    let batches = sink.batches();
    let (_, audit_batch) = batches.iter().find(|(s, _)| *s == audit).unwrap();
    assert_eq!(audit_batch[0].id.group, "security");
}

#[test]
fn test_latin1_files_are_decoded() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), b"msg=caf\xe9\n").unwrap();

    let alias = AliasConfig {
        charset: "ISO-8859-1".to_string(),
        ..app_alias()
    };
    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), alias));
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["caf\u{e9}"]);
}

#[test]
fn test_batches_respect_the_lines_limit() {
    let dir = TempDir::new().unwrap();
    let lines: String = (1..=5).map(|i| format!("msg=m{i}\n")).collect();
    fs::write(dir.path().join("app.log"), lines).unwrap();

    let mut config = single_alias_config(dir.path(), app_alias());
    config.batch.lines_limit = 2;
    let (mut reader, sink) = start_reader(&config);
    reader.process_updates().unwrap();
    reader.close().unwrap();

    let sizes: Vec<usize> = sink.batches().iter().map(|(_, b)| b.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(sink.bodies(&stream()), vec!["m1", "m2", "m3", "m4", "m5"]);
}

#[test]
fn test_named_zone_timestamps() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), "2021-07-01 12:00:00 msg=summer\n").unwrap();

    let alias = AliasConfig {
        timestamp_zone: Some("Europe/London".to_string()),
        ..timestamped_alias()
    };
    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), alias));
    reader.process_updates().unwrap();
    reader.close().unwrap();

    let batches = sink.batches();
    assert_eq!(
        batches[0].1[0].log_timestamp,
        Some(Utc.with_ymd_and_hms(2021, 7, 1, 11, 0, 0).unwrap())
    );
}
