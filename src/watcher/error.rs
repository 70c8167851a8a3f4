//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while tailing a log directory.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Watched directory does not exist.
    #[error("Cannot find directory: {0}")]
    DirectoryNotFound(PathBuf),

    /// Watched path exists but is a regular file.
    #[error("Expected a directory but found a file: {0}")]
    NotADirectory(PathBuf),

    /// Watched directory exists but cannot be listed.
    #[error("Cannot list directory {path}: {source}")]
    ListDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Tailed file was deleted.
    #[error("Watched file deleted: {0}")]
    FileDeleted(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File is shorter than the position the tailer needs to restore.
    #[error("File {path} truncated: length {length} is lower than position {position}")]
    FileTruncated {
        path: PathBuf,
        position: u64,
        length: u64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatcherError {
    /// Map an I/O error raised for `path` to the most specific variant.
    pub(crate) fn for_path(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileDeleted(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(error),
        }
    }

    /// Whether the error concerns a single file rather than the directory.
    ///
    /// File-local errors are reported as source corruption and the tailer
    /// moves on to the next file.
    #[must_use]
    pub fn is_file_local(&self) -> bool {
        !matches!(
            self,
            Self::DirectoryNotFound(_) | Self::NotADirectory(_) | Self::ListDirectory { .. }
        )
    }
}
