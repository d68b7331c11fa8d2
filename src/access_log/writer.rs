//! Size- and age-based rotating log file.
//!
//! All writes go through one mutex so lines from concurrent requests never
//! interleave. When the current file has reached the size limit or is older
//! than the age limit, the next write first renames it to
//! `<path>.<YYYYMMDD-HHMMSS>` and reopens a fresh file at `<path>`.

use crate::error::{AppError, Result};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

/// Default size limit (5 MiB)
pub const DEFAULT_MAX_SIZE: u64 = 5 * 1024 * 1024;

/// Default age limit (14 days)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// When to rotate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate once the file holds at least this many bytes
    pub max_size: u64,
    /// Rotate once the file is at least this old
    pub max_age: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

#[derive(Debug)]
struct WriterState {
    file: Option<File>,
    size: u64,
    created_at: SystemTime,
    rotations: usize,
}

impl WriterState {
    fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or(Duration::ZERO)
    }
}

/// Thread-safe rotating log writer
#[derive(Debug)]
pub struct RotatingLogWriter {
    path: PathBuf,
    policy: RotationPolicy,
    console: bool,
    state: Mutex<WriterState>,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RotatingLogWriter {
    /// Open (or create) the log file at `path`
    ///
    /// The parent directory is created if needed. An existing non-empty file
    /// keeps its modification time as its age; if that is already past
    /// `max_age` the file is rotated before the writer is returned.
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy, console: bool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = open_append(&path)?;
        let metadata = file.metadata()?;
        let size = metadata.len();
        let created_at = if size == 0 {
            SystemTime::now()
        } else {
            metadata.modified().unwrap_or_else(|_| SystemTime::now())
        };

        let writer = Self {
            path,
            policy,
            console,
            state: Mutex::new(WriterState {
                file: Some(file),
                size,
                created_at,
                rotations: 0,
            }),
        };

        {
            let mut state = writer.lock();
            if size > 0 && state.age() >= policy.max_age {
                writer.rotate(&mut state)?;
            }
        }

        Ok(writer)
    }

    /// Open with the default policy
    pub fn with_defaults(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(path, RotationPolicy::default(), false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Bytes written to the current file since it was opened or rotated
    pub fn current_size(&self) -> u64 {
        self.lock().size
    }

    /// Number of successful rotations since the writer was opened
    pub fn rotation_count(&self) -> usize {
        self.lock().rotations
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn should_rotate(&self, state: &WriterState) -> bool {
        state.size >= self.policy.max_size || state.age() >= self.policy.max_age
    }

    /// First free `<path>.<timestamp>[.N]` name
    fn rotated_path(&self) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let base = format!("{}.{}", self.path.display(), timestamp);

        let mut candidate = PathBuf::from(&base);
        let mut counter = 1;
        while candidate.exists() {
            candidate = PathBuf::from(format!("{}.{}", base, counter));
            counter += 1;
        }
        candidate
    }

    /// Rename the current file aside and reopen a fresh one
    ///
    /// On failure the state is left untouched and the caller keeps writing to
    /// the handle it already has.
    fn rotate(&self, state: &mut WriterState) -> Result<()> {
        if let Some(file) = state.file.as_mut() {
            file.flush()
                .map_err(|e| AppError::Rotation(format!("flush failed: {}", e)))?;
        }

        let rotated = self.rotated_path();
        fs::rename(&self.path, &rotated).map_err(|e| {
            AppError::Rotation(format!(
                "rename {} -> {} failed: {}",
                self.path.display(),
                rotated.display(),
                e
            ))
        })?;

        // Past this point the old handle now points at the rotated file
        let file = open_append(&self.path).map_err(|e| {
            AppError::Rotation(format!("reopen {} failed: {}", self.path.display(), e))
        })?;
        let size = file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| AppError::Rotation(format!("stat failed: {}", e)))?;

        state.file = Some(file);
        state.size = size;
        state.created_at = SystemTime::now();
        state.rotations += 1;

        tracing::info!(
            log = %self.path.display(),
            rotated_to = %rotated.display(),
            "Rotated log file"
        );
        Ok(())
    }

    /// Flush and close the current file
    ///
    /// Calling it again is a no-op. Writes after close fail with an I/O error.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.lock();
        match state.file.take() {
            Some(mut file) => {
                file.flush()?;
                file.sync_all()
            }
            None => Ok(()),
        }
    }

    fn write_locked(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();

        if state.file.is_some() && self.should_rotate(&state) {
            if let Err(e) = self.rotate(&mut state) {
                tracing::error!(error = %e, "Log rotation failed, continuing with current file");
            }
        }

        let Some(file) = state.file.as_mut() else {
            return Err(io::Error::other("log writer is closed"));
        };
        let written = file.write(buf)?;
        state.size += written as u64;

        if self.console {
            let _ = io::stdout().write_all(&buf[..written]);
        }

        Ok(written)
    }

    #[cfg(test)]
    fn backdate(&self, by: Duration) {
        let mut state = self.lock();
        state.created_at -= by;
    }
}

impl Write for &RotatingLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_locked(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock().file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Write for RotatingLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}

impl Drop for RotatingLogWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn rotated_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("access.log."))
            })
            .collect();
        files.sort();
        files
    }

    fn small_policy(max_size: u64) -> RotationPolicy {
        RotationPolicy {
            max_size,
            max_age: DEFAULT_MAX_AGE,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RotationPolicy::default();
        assert_eq!(policy.max_size, 5 * 1024 * 1024);
        assert_eq!(policy.max_age, Duration::from_secs(1_209_600));
    }

    #[test]
    fn test_open_creates_directory_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log").join("access.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "existing\n").unwrap();

        let writer = RotatingLogWriter::with_defaults(&path).unwrap();
        assert_eq!(writer.current_size(), 9);
        (&writer).write_all(b"next\n").unwrap();
        writer.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nnext\n");
    }

    #[test]
    fn test_open_creates_missing_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("logs").join("access.log");
        let writer = RotatingLogWriter::with_defaults(&path).unwrap();
        assert!(path.exists());
        assert_eq!(writer.current_size(), 0);
    }

    #[test]
    fn test_crossing_size_limit_rotates_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let max = 64;
        let writer = RotatingLogWriter::open(&path, small_policy(max), false).unwrap();

        let first = vec![b'a'; (max - 1) as usize];
        (&writer).write_all(&first).unwrap();
        (&writer).write_all(b"bb").unwrap();
        assert_eq!(writer.current_size(), max + 1);
        assert_eq!(writer.rotation_count(), 0);

        (&writer).write_all(b"c\n").unwrap();
        assert_eq!(writer.rotation_count(), 1);
        assert_eq!(writer.current_size(), 2);

        let rotated = rotated_files(dir.path());
        assert_eq!(rotated.len(), 1);
        let mut expected = first.clone();
        expected.extend_from_slice(b"bb");
        assert_eq!(fs::read(&rotated[0]).unwrap(), expected);
        assert_eq!(fs::read_to_string(&path).unwrap(), "c\n");
    }

    #[test]
    fn test_rotated_name_has_timestamp_suffix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let writer = RotatingLogWriter::open(&path, small_policy(1), false).unwrap();
        (&writer).write_all(b"x").unwrap();
        (&writer).write_all(b"y").unwrap();

        let rotated = rotated_files(dir.path());
        let name = rotated[0].file_name().unwrap().to_str().unwrap();
        let suffix = name.trim_start_matches("access.log.");
        assert_eq!(suffix.len(), 15, "unexpected suffix {}", suffix);
        assert!(chrono::NaiveDateTime::parse_from_str(suffix, "%Y%m%d-%H%M%S").is_ok());
    }

    #[test]
    fn test_same_second_rotations_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let writer = RotatingLogWriter::open(&path, small_policy(1), false).unwrap();

        for line in [b"1", b"2", b"3", b"4"] {
            (&writer).write_all(line).unwrap();
        }

        assert_eq!(writer.rotation_count(), 3);
        let rotated = rotated_files(dir.path());
        assert_eq!(rotated.len(), 3);
        let mut contents: Vec<String> = rotated
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();
        contents.sort();
        assert_eq!(contents, vec!["1", "2", "3"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "4");
    }

    #[test]
    fn test_old_file_rotates_at_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        fs::write(&path, "old line\n").unwrap();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(15 * 24 * 60 * 60))
            .unwrap();
        drop(file);

        let writer = RotatingLogWriter::with_defaults(&path).unwrap();
        assert_eq!(writer.rotation_count(), 1);
        assert_eq!(writer.current_size(), 0);

        let rotated = rotated_files(dir.path());
        assert_eq!(rotated.len(), 1);
        assert_eq!(fs::read_to_string(&rotated[0]).unwrap(), "old line\n");
    }

    #[test]
    fn test_old_empty_file_is_not_rotated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(30 * 24 * 60 * 60))
            .unwrap();
        drop(file);

        let writer = RotatingLogWriter::with_defaults(&path).unwrap();
        assert_eq!(writer.rotation_count(), 0);
        (&writer).write_all(b"fresh\n").unwrap();
        assert_eq!(writer.rotation_count(), 0);
    }

    #[test]
    fn test_age_triggers_rotation_on_next_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let writer = RotatingLogWriter::with_defaults(&path).unwrap();
        (&writer).write_all(b"day one\n").unwrap();

        writer.backdate(DEFAULT_MAX_AGE + Duration::from_secs(1));
        (&writer).write_all(b"day fifteen\n").unwrap();

        assert_eq!(writer.rotation_count(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "day fifteen\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_rotation_keeps_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let writer = RotatingLogWriter::open(&path, small_policy(1), false).unwrap();
        (&writer).write_all(b"a").unwrap();

        // Remove the file out from under the writer so the rename fails
        fs::remove_file(&path).unwrap();
        (&writer).write_all(b"b").unwrap();

        assert_eq!(writer.rotation_count(), 0);
        assert_eq!(writer.current_size(), 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let writer = RotatingLogWriter::with_defaults(dir.path().join("access.log")).unwrap();
        (&writer).write_all(b"line\n").unwrap();

        writer.close().unwrap();
        writer.close().unwrap();

        let err = (&writer).write_all(b"late\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_concurrent_lines_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        let writer = Arc::new(RotatingLogWriter::with_defaults(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let line = format!("thread-{t} line-{i:03} {}\n", "x".repeat(40));
                        (&*writer).write_all(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        writer.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 800);
        for line in lines {
            assert!(line.starts_with("thread-"));
            assert!(line.ends_with(&"x".repeat(40)));
        }
        assert_eq!(writer.current_size(), content.len() as u64);
    }
}
