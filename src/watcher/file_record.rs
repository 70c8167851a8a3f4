//! Snapshot of a tailed file.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Device and inode of a file, stable across renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    /// Identity of the file described by `metadata`.
    ///
    /// Returns `None` on platforms without inode numbers.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;

        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// Identity of the file described by `metadata`.
    ///
    /// Returns `None` on platforms without inode numbers.
    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Byte offsets bracketing the last line read from a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinePositions {
    /// Offset of the first byte of the last line read.
    pub before: Option<u64>,
    /// Offset just past the last line read, terminator included.
    pub after: Option<u64>,
}

/// Immutable snapshot of a file in the watched directory.
///
/// Two records are equal when path, modification time and size match; the
/// read positions and the file identity do not take part in equality.
#[derive(Debug, Clone)]
pub struct FileRecord {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
    file_id: Option<FileId>,
    positions: LinePositions,
}

impl FileRecord {
    /// Create a record from explicit attributes.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, modified: SystemTime, size: u64) -> Self {
        Self {
            path: path.into(),
            modified,
            size,
            file_id: None,
            positions: LinePositions::default(),
        }
    }

    /// Snapshot `path` from its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self::from_metadata(path, &metadata))
    }

    pub(crate) fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            // Filesystems without mtime support sort first.
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
            file_id: FileId::from_metadata(metadata),
            positions: LinePositions::default(),
        }
    }

    /// Attach a file identity.
    #[must_use]
    pub fn with_file_id(mut self, file_id: FileId) -> Self {
        self.file_id = Some(file_id);
        self
    }

    /// Replace the read positions.
    #[must_use]
    pub fn with_positions(mut self, positions: LinePositions) -> Self {
        self.positions = positions;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn file_id(&self) -> Option<FileId> {
        self.file_id
    }

    #[must_use]
    pub fn positions(&self) -> LinePositions {
        self.positions
    }

    /// File name used for ordering, lower-cased.
    #[must_use]
    pub fn sort_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Whether `other` describes the same path.
    #[must_use]
    pub fn same_path(&self, other: &Self) -> bool {
        self.path == other.path
    }

    /// Whether `other` has the same modification time.
    #[must_use]
    pub fn same_modified(&self, other: &Self) -> bool {
        self.modified == other.modified
    }

    /// Whether `other` is a later snapshot of this path with new content.
    #[must_use]
    pub fn is_modified(&self, other: &Self) -> bool {
        !self.same_modified(other) || self.size != other.size
    }

    /// Whether `other` is this path with a different size.
    #[must_use]
    pub fn is_same_updated(&self, other: &Self) -> bool {
        self.same_path(other) && self.size != other.size
    }

    /// Whether `other` is a different file modified at another time.
    #[must_use]
    pub fn is_different_newer(&self, other: &Self) -> bool {
        !self.same_modified(other) && !self.same_path(other)
    }

    /// Whether both records carry identities and they differ.
    #[must_use]
    pub fn is_replaced_by(&self, other: &Self) -> bool {
        matches!((self.file_id, other.file_id), (Some(a), Some(b)) if a != b)
    }
}

impl PartialEq for FileRecord {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.modified == other.modified && self.size == other.size
    }
}

impl Eq for FileRecord {}

impl std::fmt::Display for FileRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let modified = chrono::DateTime::<chrono::Utc>::from(self.modified);
        write!(
            f,
            "{} (modified {}, {} bytes)",
            self.path.display(),
            modified.to_rfc3339(),
            self.size
        )
    }
}
