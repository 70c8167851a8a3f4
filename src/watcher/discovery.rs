//! Log file discovery utilities.
//!
//! Lists the files of the watched directory, orders them and merges a fresh
//! listing against the file currently being tailed.

use std::collections::VecDeque;
use std::path::Path;
use std::time::SystemTime;

use regex::Regex;

use super::error::WatcherError;
use super::file_record::FileRecord;

/// File name filter that must match the whole name.
#[derive(Debug, Clone)]
pub struct FileFilter {
    pattern: Regex,
}

impl FileFilter {
    /// Compile a file name filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regular expression.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{pattern})$"))?,
        })
    }

    /// Whether `name` matches the filter in full.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}

/// Check that `dir` exists and is a directory.
///
/// # Errors
///
/// Returns an error if the path is missing or is not a directory.
pub fn ensure_directory(dir: &Path) -> Result<(), WatcherError> {
    if !dir.exists() {
        return Err(WatcherError::DirectoryNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(WatcherError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Order files by modification time, then by file name ignoring case.
pub fn sort_files(files: &mut [FileRecord]) {
    files.sort_by(|a, b| {
        a.modified()
            .cmp(&b.modified())
            .then_with(|| a.sort_name().cmp(&b.sort_name()))
            .then_with(|| a.path().cmp(b.path()))
    });
}

/// List the files in `dir` accepted by `filter`.
///
/// Files modified before `not_older_than` are skipped. Entries that vanish
/// while listing are ignored. The result is ordered with [`sort_files`].
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_files(
    dir: &Path,
    filter: &FileFilter,
    not_older_than: Option<SystemTime>,
) -> Result<Vec<FileRecord>, WatcherError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatcherError::DirectoryNotFound(dir.to_path_buf()));
        }
        Err(e) => {
            return Err(WatcherError::ListDirectory {
                path: dir.to_path_buf(),
                source: e,
            });
        }
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let accepted = entry
            .file_name()
            .to_str()
            .is_some_and(|name| filter.matches(name));
        if !accepted {
            continue;
        }
        let path = entry.path();
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let record = FileRecord::from_metadata(&path, &metadata);
        if not_older_than.is_some_and(|bound| record.modified() < bound) {
            continue;
        }
        files.push(record);
    }

    sort_files(&mut files);
    Ok(files)
}

/// Keep the current file and every file ordered after it.
///
/// If `current` is part of `files`, the result starts with it. Otherwise the
/// result starts with the last file sharing the current modification time,
/// or with the first updated copy of the current path, followed by every
/// newer file. Files ordered strictly before that point are dropped. The
/// input is ordered with [`sort_files`] first, so its order does not matter.
#[must_use]
pub fn filter_current_and_newer(
    current: Option<&FileRecord>,
    mut files: Vec<FileRecord>,
) -> VecDeque<FileRecord> {
    sort_files(&mut files);
    let Some(current) = current else {
        return files.into();
    };
    let Some(first) = files.first() else {
        return VecDeque::new();
    };
    if !current.same_modified(first) || files.len() == 1 {
        return files.into();
    }

    let last = files.len() - 1;
    let start = (0..last)
        .find(|&i| {
            let (prev, next) = (&files[i], &files[i + 1]);
            let prev_is_updated = current.is_same_updated(prev);
            let next_is_newer = current.is_different_newer(next);
            tracing::trace!(
                prev = %prev,
                next = %next,
                prev_is_updated,
                next_is_newer,
                "Comparing files with the current one"
            );
            current == prev || prev_is_updated || next_is_newer
        })
        .unwrap_or(last);

    files.drain(..start);
    files.into()
}
