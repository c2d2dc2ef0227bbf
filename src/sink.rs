//! Run log sink
//!
//! One append-only text file per batch. Every test case writes its
//! begin/end markers and captured output here, and the driver appends a
//! verdict line after each test. Marker writes are flushed immediately so
//! a crash mid-run still leaves a readable partial log.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::common::{timestamp, Error, Result};

/// Separator wrapping a test section and the batch banners
pub const SECTION_RULE: &str =
    "====================================================================";

/// Separator between a marker line and the captured output
pub const OUTPUT_RULE: &str =
    "--------------------------------------------------------------------";

/// An open run log
#[derive(Debug)]
pub struct LogSink {
    file: File,
    path: PathBuf,
}

impl LogSink {
    /// Open the run log for a batch
    ///
    /// With `override_path`, any existing file at that path is deleted and
    /// recreated. Otherwise a `test-log-<timestamp>.txt` name is generated
    /// inside `dir`, regenerating while the name is taken.
    pub fn open(override_path: Option<&Path>, dir: &Path) -> Result<Self> {
        let (file, path) = match override_path {
            Some(path) => {
                if path.exists() {
                    std::fs::remove_file(path).map_err(|source| Error::LogSink {
                        path: path.to_path_buf(),
                        source,
                    })?;
                }
                let file = OpenOptions::new()
                    .create_new(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| Error::LogSink {
                        path: path.to_path_buf(),
                        source,
                    })?;
                (file, path.to_path_buf())
            }
            None => create_generated(dir)?,
        };

        tracing::info!(path = %path.display(), "Logging to run log");

        let mut sink = Self { file, path };
        sink.write(&format!("BEGINNING TEST SET {}\n", timestamp()));
        sink.write(&format!("{SECTION_RULE}\n"));
        sink.flush();
        Ok(sink)
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append text
    pub fn write(&mut self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// Append raw captured output
    ///
    /// Failures are logged and swallowed: a broken log must not take the
    /// rest of the batch down with it.
    pub fn write_bytes(&mut self, data: &[u8]) {
        if let Err(e) = self.file.write_all(data) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write run log");
        }
    }

    /// Flush pending writes to disk
    pub fn flush(&mut self) {
        if let Err(e) = self.file.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to flush run log");
        }
    }

    /// Write the closing banner and release the file
    pub fn close(mut self) -> io::Result<PathBuf> {
        self.file.write_all(format!("{SECTION_RULE}\n").as_bytes())?;
        self.file
            .write_all(format!("CLOSING TEST SET {}\n", timestamp()).as_bytes())?;
        self.file.sync_all()?;
        Ok(self.path)
    }
}

/// File name for a generated run log
fn generated_name(suffix: usize) -> String {
    let stamp = chrono::Local::now().format("%Y.%m.%d.%H%M%S");
    if suffix == 0 {
        format!("test-log-{stamp}.txt")
    } else {
        format!("test-log-{stamp}-{suffix}.txt")
    }
}

/// Create a uniquely named run log in `dir`
///
/// Two batches started within the same second would get the same
/// timestamp, so a numeric suffix is added until `create_new` succeeds.
fn create_generated(dir: &Path) -> Result<(File, PathBuf)> {
    let mut suffix = 0;
    loop {
        let path = dir.join(generated_name(suffix));
        match OpenOptions::new().create_new(true).append(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), "Run log name taken, regenerating");
                suffix += 1;
            }
            Err(source) => return Err(Error::LogSink { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_banners() {
        let dir = tempdir().unwrap();
        let sink = LogSink::open(None, dir.path()).unwrap();
        let path = sink.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("BEGINNING TEST SET "));
        assert_eq!(lines[1], SECTION_RULE);
        assert_eq!(lines[2], SECTION_RULE);
        assert!(lines[3].starts_with("CLOSING TEST SET "));
    }

    #[test]
    fn test_generated_name_shape() {
        let dir = tempdir().unwrap();
        let sink = LogSink::open(None, dir.path()).unwrap();
        let name = sink.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("test-log-"));
        assert!(name.ends_with(".txt"));
        assert_eq!(sink.path().parent(), Some(dir.path()));
    }

    #[test]
    fn test_generated_names_do_not_collide() {
        let dir = tempdir().unwrap();
        let first = LogSink::open(None, dir.path()).unwrap();
        let second = LogSink::open(None, dir.path()).unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_override_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, "stale contents from a previous run\n").unwrap();

        let mut sink = LogSink::open(Some(&path), dir.path()).unwrap();
        sink.write("hello\n");
        sink.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert!(content.contains("hello\n"));
    }

    #[test]
    fn test_writes_are_visible_after_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.log");
        let mut sink = LogSink::open(Some(&path), dir.path()).unwrap();
        sink.write_bytes(b"captured output\n");
        sink.flush();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("captured output\n"));
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = LogSink::open(None, &missing).unwrap_err();
        assert!(matches!(err, Error::LogSink { .. }));
    }
}
