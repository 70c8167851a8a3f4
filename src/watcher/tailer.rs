//! Directory tailer that holds back the last line of a file.
//!
//! A line is handed out only once it is known to be complete: another line
//! follows it, a newer file shows up, or a refresh proves the file did not
//! change since the line was read.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::charset::Charset;
use super::discovery::{ensure_directory, filter_current_and_newer, list_files, FileFilter};
use super::error::WatcherError;
use super::file_record::{FileId, FileRecord, LinePositions};

/// Last line read from the current file.
#[derive(Debug)]
struct HeldLine {
    text: String,
    /// Already handed out after a refresh confirmed it.
    emitted: bool,
}

impl HeldLine {
    fn new(text: String) -> Self {
        Self {
            text,
            emitted: false,
        }
    }
}

#[derive(Debug)]
struct OpenFile {
    reader: BufReader<File>,
    position: u64,
}

/// Reads lines from every file in a directory matching a filter.
///
/// Files are processed in `(modification time, file name)` order. Within a
/// file, lines come out in file order, one behind the read cursor.
#[derive(Debug)]
pub struct DirectoryTailer {
    directory: PathBuf,
    filter: FileFilter,
    charset: Charset,
    /// Files waiting to be opened.
    queue: VecDeque<FileRecord>,
    /// Snapshot of the file being read, kept after it is finished so later
    /// scans never go back in time.
    current: Option<FileRecord>,
    open: Option<OpenFile>,
    held: Option<HeldLine>,
    /// Lines confirmed complete and not yet returned.
    ready: VecDeque<String>,
}

impl DirectoryTailer {
    /// Start tailing `directory`.
    ///
    /// Every file accepted by `filter` is queued; nothing is opened yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing, is not a directory or
    /// cannot be listed.
    pub fn new(
        directory: impl Into<PathBuf>,
        filter: FileFilter,
        charset: Charset,
    ) -> Result<Self, WatcherError> {
        let directory = directory.into();
        ensure_directory(&directory)?;
        let files = list_files(&directory, &filter, None)?;
        tracing::info!(
            directory = %directory.display(),
            count = files.len(),
            files = ?files.iter().map(FileRecord::path).collect::<Vec<_>>(),
            "Found files to process"
        );

        Ok(Self {
            directory,
            filter,
            charset,
            queue: files.into(),
            current: None,
            open: None,
            held: None,
            ready: VecDeque::new(),
        })
    }

    /// Directory being tailed.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file currently read, if any.
    #[must_use]
    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_ref().map(FileRecord::path)
    }

    /// Next line known to be complete.
    ///
    /// Returns `None` when no confirmed line is available right now; call
    /// [`refresh`](Self::refresh) before asking again.
    ///
    /// # Errors
    ///
    /// Returns an error if the current or the next file cannot be read.
    pub fn next_line(&mut self) -> Result<Option<String>, WatcherError> {
        self.advance()?;
        Ok(self.ready.pop_front())
    }

    /// Rescan the directory and re-check the held line.
    ///
    /// Returns `true` if the next call to [`next_line`](Self::next_line)
    /// will return a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or the current
    /// file cannot be read.
    pub fn refresh(&mut self) -> Result<bool, WatcherError> {
        tracing::debug!(directory = %self.directory.display(), "Refreshing state");
        if self.queue.is_empty() {
            self.rescan()?;
        }
        self.advance()?;
        Ok(!self.ready.is_empty())
    }

    /// Abandon the current file after an error and continue with the queue.
    ///
    /// The held line of the file is dropped.
    pub fn skip_current_file(&mut self) {
        if let Some(current) = &self.current {
            tracing::warn!(file = %current.path().display(), "Skipping file");
        }
        self.open = None;
        self.held = None;
    }

    /// Release the open file handle.
    pub fn close(&mut self) {
        if let Some(current) = &self.current {
            tracing::debug!(file = %current.path().display(), "Closing file");
        }
        self.open = None;
    }

    /// Read until a confirmed line is available or every queued file is
    /// exhausted.
    fn advance(&mut self) -> Result<(), WatcherError> {
        loop {
            self.read_ahead()?;
            if !self.ready.is_empty() {
                return Ok(());
            }
            let Some(next) = self.queue.pop_front() else {
                return Ok(());
            };
            // A newer file exists, so the writer is done with this one.
            self.release_held();
            self.open_file(next)?;
        }
    }

    fn read_ahead(&mut self) -> Result<(), WatcherError> {
        while self.ready.is_empty() {
            match self.read_line()? {
                Some(line) => self.push_read(line),
                None => break,
            }
        }
        Ok(())
    }

    fn rescan(&mut self) -> Result<(), WatcherError> {
        let not_older_than = self.current.as_ref().map(FileRecord::modified);
        let files = list_files(&self.directory, &self.filter, not_older_than)?;
        let mut filtered = filter_current_and_newer(self.current.as_ref(), files);
        tracing::debug!(
            directory = %self.directory.display(),
            count = filtered.len(),
            "Filtered new or updated files"
        );

        let Some(current) = self.current.clone() else {
            self.queue.extend(filtered);
            return Ok(());
        };

        // The open file may now be listed under another name.
        if let Some(id) = current.file_id() {
            filtered.retain(|f| f.same_path(&current) || f.file_id() != Some(id));
        }

        let settled = match filtered.iter().position(|f| f.same_path(&current)) {
            None => {
                self.finish_current()?;
                true
            }
            Some(index) if current.is_replaced_by(&filtered[index]) => {
                // The fresh entry stays queued; the old handle is drained first.
                tracing::info!(
                    file = %current.path().display(),
                    "File replaced, finishing the previous one"
                );
                true
            }
            Some(index)
                if self
                    .open
                    .as_ref()
                    .is_some_and(|open| filtered[index].size() < open.position) =>
            {
                tracing::warn!(
                    file = %current.path().display(),
                    size = filtered[index].size(),
                    "File truncated, reading it from the beginning"
                );
                self.release_held();
                self.open = None;
                true
            }
            Some(index) => match filtered.remove(index) {
                Some(fresh) => self.check_current(&current, fresh)?,
                None => true,
            },
        };

        if settled {
            self.queue.extend(filtered);
        }
        Ok(())
    }

    /// Compare the current file with a fresh snapshot of the same path.
    ///
    /// Returns `false` if the held line was rewritten and nothing follows it
    /// yet; the old snapshot is kept so the next refresh compares again.
    fn check_current(
        &mut self,
        current: &FileRecord,
        fresh: FileRecord,
    ) -> Result<bool, WatcherError> {
        if !current.is_modified(&fresh) {
            tracing::trace!(file = %current.path().display(), "File is not modified");
            self.confirm_held();
            return Ok(true);
        }

        let Some(held) = self.held.take() else {
            self.current = Some(fresh.with_positions(current.positions()));
            return Ok(true);
        };

        self.seek(current.positions().before.unwrap_or(0))?;
        match self.read_line()? {
            Some(text) if text == held.text => {
                tracing::trace!(line = %text, "Held line unchanged, the file grew after it");
                self.held = Some(held);
                self.confirm_held();
                self.current = Some(fresh.with_positions(self.positions()));
                Ok(true)
            }
            Some(text) => {
                tracing::trace!(previous = %held.text, current = %text, "Held line was rewritten");
                self.held = Some(HeldLine::new(text));
                match self.read_line()? {
                    Some(next) => {
                        self.push_read(next);
                        self.current = Some(fresh.with_positions(self.positions()));
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            None => {
                self.current = Some(fresh.with_positions(self.positions()));
                Ok(true)
            }
        }
    }

    /// Read what is left of a file that disappeared and confirm its last line.
    fn finish_current(&mut self) -> Result<(), WatcherError> {
        if self.open.is_none() {
            return Ok(());
        }
        if let Some(current) = &self.current {
            tracing::info!(file = %current.path().display(), "File is gone, reading the rest of it");
        }
        while let Some(line) = self.read_line()? {
            self.push_read(line);
        }
        self.release_held();
        self.open = None;
        Ok(())
    }

    fn open_file(&mut self, record: FileRecord) -> Result<(), WatcherError> {
        tracing::info!(file = %record, "Start processing the file");
        self.open = None;
        self.held = None;
        let path = record.path().to_path_buf();
        self.current = Some(record.with_positions(LinePositions::default()));

        let file = File::open(&path).map_err(|e| WatcherError::for_path(&path, e))?;
        let file_id = file
            .metadata()
            .ok()
            .as_ref()
            .and_then(FileId::from_metadata);
        if let Some(id) = file_id {
            self.current = self.current.take().map(|c| c.with_file_id(id));
        }
        self.open = Some(OpenFile {
            reader: BufReader::new(file),
            position: 0,
        });
        Ok(())
    }

    fn seek(&mut self, position: u64) -> Result<(), WatcherError> {
        let Some(open) = self.open.as_mut() else {
            return Ok(());
        };
        let length = open.reader.get_ref().metadata()?.len();
        if length < position {
            return Err(WatcherError::FileTruncated {
                path: self
                    .current
                    .as_ref()
                    .map(|c| c.path().to_path_buf())
                    .unwrap_or_default(),
                position,
                length,
            });
        }
        open.reader.seek(SeekFrom::Start(position))?;
        open.position = position;
        Ok(())
    }

    /// Read one raw line from the open file and record its positions.
    fn read_line(&mut self) -> Result<Option<String>, WatcherError> {
        let Some(open) = self.open.as_mut() else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        let bytes_read = open.reader.read_until(b'\n', &mut buf)?;
        if bytes_read == 0 {
            return Ok(None);
        }

        let before = open.position;
        open.position += bytes_read as u64;
        let after = open.position;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        let line = self.charset.decode(&buf);
        self.current = self.current.take().map(|c| {
            c.with_positions(LinePositions {
                before: Some(before),
                after: Some(after),
            })
        });
        Ok(Some(line))
    }

    fn positions(&self) -> LinePositions {
        self.current
            .as_ref()
            .map(FileRecord::positions)
            .unwrap_or_default()
    }

    /// Hold `line` and confirm the line it replaces.
    fn push_read(&mut self, line: String) {
        if let Some(previous) = self.held.replace(HeldLine::new(line)) {
            if !previous.emitted {
                self.ready.push_back(previous.text);
            }
        }
    }

    /// Confirm the held line but keep it for later comparison.
    fn confirm_held(&mut self) {
        if let Some(held) = self.held.as_mut() {
            if !held.emitted {
                held.emitted = true;
                self.ready.push_back(held.text.clone());
            }
        }
    }

    /// Confirm the held line and forget it.
    fn release_held(&mut self) {
        if let Some(held) = self.held.take() {
            if !held.emitted {
                self.ready.push_back(held.text);
            }
        }
    }
}
