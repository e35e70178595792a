//! Rolling Logger
//!
//! File logger that rotates by size and keeps the most recent lines in a
//! circular buffer for in-process inspection.
//!
//! `init_logger_with` installs a `tracing` subscriber; records emitted through the
//! `log` facade are bridged into it as well.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::MakeWriter;

/// Default size at which the active file is rotated
pub const DEFAULT_MAX_BYTES: u64 = 2 * 1024 * 1024;
/// Default number of rotated files kept next to the active one
pub const DEFAULT_KEEP_FILES: usize = 3;
/// Default capacity of the in-memory line buffer
pub const DEFAULT_BUFFER_LINES: usize = 500;

static LOGGER: OnceLock<LoggerHandle> = OnceLock::new();

/// Rotation and buffer limits
#[derive(Debug, Clone, Copy)]
pub struct LoggerConfig {
    pub max_bytes: u64,
    pub keep_files: usize,
    pub buffer_lines: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            keep_files: DEFAULT_KEEP_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }
}

/// Size-rotated log file plus the circular buffer of recent lines
pub(crate) struct RollingFile {
    dir: PathBuf,
    file_name: String,
    config: LoggerConfig,
    file: Option<File>,
    written: u64,
    partial: String,
    recent: VecDeque<String>,
}

impl RollingFile {
    pub(crate) fn open(dir: &Path, app_name: &str, config: LoggerConfig) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut rolling = Self {
            dir: dir.to_path_buf(),
            file_name: format!("{}.log", app_name),
            config,
            file: None,
            written: 0,
            partial: String::new(),
            recent: VecDeque::with_capacity(config.buffer_lines.min(4096)),
        };
        rolling.open_active()?;
        Ok(rolling)
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    fn rotated_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.{}", self.file_name, n))
    }

    fn open_active(&mut self) -> io::Result<()> {
        let path = self.active_path();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.written = file.metadata().map(|m| m.len()).unwrap_or(0);
        let header = format!(
            "=== {} opened {} ===\n",
            self.file_name,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        );
        file.write_all(header.as_bytes())?;
        self.written += header.len() as u64;
        self.file = Some(file);
        Ok(())
    }

    /// Shift `<name>.N` to `<name>.N+1`, dropping the oldest, then reopen
    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;
        if self.config.keep_files == 0 {
            let _ = fs::remove_file(self.active_path());
        } else {
            let _ = fs::remove_file(self.rotated_path(self.config.keep_files));
            for n in (1..self.config.keep_files).rev() {
                let from = self.rotated_path(n);
                if from.exists() {
                    fs::rename(&from, self.rotated_path(n + 1))?;
                }
            }
            fs::rename(self.active_path(), self.rotated_path(1))?;
        }
        self.open_active()
    }

    fn remember(&mut self, buf: &[u8]) {
        if self.config.buffer_lines == 0 {
            return;
        }
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            if self.recent.len() == self.config.buffer_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(line.trim_end().to_string());
        }
    }

    pub(crate) fn recent(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.config.max_bytes {
            self.rotate()?;
        }
        self.remember(buf);
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
            self.written += buf.len() as u64;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Shared handle to the rolling file, usable as a `tracing` writer
#[derive(Clone)]
pub struct LoggerHandle {
    inner: Arc<Mutex<RollingFile>>,
}

impl LoggerHandle {
    pub(crate) fn new(rolling: RollingFile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rolling)),
        }
    }

    /// Most recent formatted lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|guard| guard.recent())
            .unwrap_or_default()
    }

    /// Path of the file currently written to
    pub fn active_path(&self) -> Option<PathBuf> {
        self.inner.lock().ok().map(|guard| guard.active_path())
    }
}

/// Writer produced per event by `LoggerHandle`
pub struct LogWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for LoggerHandle {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Initialize the global logger writing to `<log_dir>/<app_name>.log`
///
/// Fails if a global subscriber or `log` logger is already installed.
pub fn init_logger_with(
    log_dir: PathBuf,
    app_name: &str,
    config: LoggerConfig,
) -> Result<LoggerHandle, String> {
    let rolling = RollingFile::open(&log_dir, app_name, config)
        .map_err(|e| format!("Failed to open log file in {}: {}", log_dir.display(), e))?;
    let handle = LoggerHandle::new(rolling);

    tracing_subscriber::fmt()
        .with_writer(handle.clone())
        .with_ansi(false)
        .with_target(true)
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    LOGGER
        .set(handle.clone())
        .map_err(|_| "Logger already initialized".to_string())?;
    Ok(handle)
}

/// The global handle, once `init_logger_with` has succeeded
pub fn handle() -> Option<&'static LoggerHandle> {
    LOGGER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(max_bytes: u64, keep_files: usize, buffer_lines: usize) -> LoggerConfig {
        LoggerConfig {
            max_bytes,
            keep_files,
            buffer_lines,
        }
    }

    #[test]
    fn test_buffer_keeps_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut rolling = RollingFile::open(dir.path(), "app", small(1 << 20, 1, 2)).unwrap();

        rolling.write_all(b"one\ntwo\nthr").unwrap();
        rolling.write_all(b"ee\n").unwrap();

        assert_eq!(rolling.recent(), vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn test_rotation_shifts_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut rolling = RollingFile::open(dir.path(), "app", small(64, 2, 10)).unwrap();

        for i in 0..20 {
            rolling
                .write_all(format!("line number {}\n", i).as_bytes())
                .unwrap();
        }
        rolling.flush().unwrap();

        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.log.1").exists());
        assert!(dir.path().join("app.log.2").exists());
        assert!(!dir.path().join("app.log.3").exists());

        let active = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert!(active.contains("line number 19"));
    }

    #[test]
    fn test_handle_writer_feeds_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let rolling = RollingFile::open(dir.path(), "svc", LoggerConfig::default()).unwrap();
        let handle = LoggerHandle::new(rolling);

        let mut writer = handle.make_writer();
        writer.write_all(b"hello from writer\n").unwrap();

        let lines = handle.recent_lines();
        assert_eq!(lines.last().map(String::as_str), Some("hello from writer"));
        assert_eq!(handle.active_path(), Some(dir.path().join("svc.log")));
    }

    #[test]
    fn test_global_init_happens_once() {
        let dir = tempfile::tempdir().unwrap();
        let installed = init_logger_with(dir.path().to_path_buf(), "svc", LoggerConfig::default())
            .unwrap();
        assert_eq!(
            handle().and_then(LoggerHandle::active_path),
            installed.active_path()
        );

        log::info!("bridged from log");
        assert!(installed
            .recent_lines()
            .iter()
            .any(|line| line.contains("bridged from log")));

        let again = init_logger_with(dir.path().to_path_buf(), "svc", LoggerConfig::default());
        assert!(again.is_err());
    }
}
