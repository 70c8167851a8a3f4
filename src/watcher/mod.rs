//! Watcher module for rotating log directories.
//!
//! Discovers log files, orders them and tails them line by line without
//! handing out a line that may still be written.

mod charset;
mod discovery;
mod error;
mod file_record;
mod tailer;

pub use charset::Charset;
pub use discovery::{ensure_directory, filter_current_and_newer, list_files, sort_files, FileFilter};
pub use error::WatcherError;
pub use file_record::{FileId, FileRecord, LinePositions};
pub use tailer::DirectoryTailer;
