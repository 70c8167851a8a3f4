//! File discovery, rotation and truncation seen through the reader.

use std::fs::{self, File};
use std::time::{Duration, SystemTime};

use readlog::parser::{Direction, StreamIdentity};
use tempfile::TempDir;

use super::{app_alias, append, single_alias_config, start_reader};

fn stream() -> StreamIdentity {
    StreamIdentity::new("app", Direction::First)
}

fn set_age(path: &std::path::Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(secs))
        .unwrap();
}

#[test]
fn test_files_are_read_oldest_first() {
    let dir = TempDir::new().unwrap();
    let newer = dir.path().join("app-1.log");
    let older = dir.path().join("app-2.log");
    fs::write(&newer, "msg=c1\nmsg=c2\n").unwrap();
    fs::write(&older, "msg=b1\nmsg=b2\n").unwrap();
    set_age(&newer, 10);
    set_age(&older, 20);

    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), app_alias()));
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["b1", "b2", "c1", "c2"]);
    assert!(sink.events().is_empty());
}

#[test]
fn test_unmatched_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), "msg=kept\n").unwrap();
    fs::write(dir.path().join("app.log.gz"), "msg=compressed\n").unwrap();
    fs::write(dir.path().join("other.log"), "msg=other\n").unwrap();
    fs::create_dir(dir.path().join("app-dir.log")).unwrap();

    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), app_alias()));
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["kept"]);
}

#[test]
fn test_appended_lines_are_picked_up_on_later_ticks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "msg=a1\n").unwrap();

    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), app_alias()));
    reader.process_updates().unwrap();

    append(&path, "msg=a2\nmsg=a3\n");
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["a1", "a2", "a3"]);
}

#[test]
fn test_new_file_is_read_after_the_current_one() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("app-1.log");
    fs::write(&first, "msg=a1\n").unwrap();
    set_age(&first, 10);

    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), app_alias()));
    reader.process_updates().unwrap();

    fs::write(dir.path().join("app-2.log"), "msg=b1\nmsg=b2\n").unwrap();
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["a1", "b1", "b2"]);
}

#[cfg(unix)]
#[test]
fn test_renamed_file_is_drained_before_its_replacement() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("app.log");
    fs::write(&active, "msg=a1\nmsg=a2\n").unwrap();

    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), app_alias()));
    reader.process_updates().unwrap();

    let rotated = dir.path().join("app-1.log");
    fs::rename(&active, &rotated).unwrap();
    append(&rotated, "msg=a3\n");
    std::thread::sleep(Duration::from_millis(20));
    fs::write(&active, "msg=b1\n").unwrap();

    reader.process_updates().unwrap();
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["a1", "a2", "a3", "b1"]);
    assert!(sink.events().is_empty());
}

#[test]
fn test_truncated_file_is_read_from_the_start() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "msg=a1\nmsg=a2\n").unwrap();

    let (mut reader, sink) = start_reader(&single_alias_config(dir.path(), app_alias()));
    reader.process_updates().unwrap();

    std::thread::sleep(Duration::from_millis(20));
    fs::write(&path, "msg=b1\n").unwrap();
    reader.process_updates().unwrap();
    reader.process_updates().unwrap();
    reader.close().unwrap();

    assert_eq!(sink.bodies(&stream()), vec!["a1", "a2", "b1"]);
}

#[test]
fn test_sequence_numbers_continue_across_ticks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "msg=a1\nmsg=a2\n").unwrap();

    let mut config = single_alias_config(dir.path(), app_alias());
    config.batch.lines_limit = 1;
    let (mut reader, sink) = start_reader(&config);
    reader.process_updates().unwrap();

    append(&path, "msg=a3\n");
    reader.process_updates().unwrap();
    reader.process_updates().unwrap();
    reader.close().unwrap();

    let sequences: Vec<u64> = sink
        .batches()
        .iter()
        .flat_map(|(_, batch)| batch.iter().map(|m| m.id.sequence))
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}
