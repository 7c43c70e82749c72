//! Tracing setup shared by the intake binaries.
//!
//! Every run writes to a size-rotated file under `$INTAKE_HOME/logs` and to
//! stderr. `RUST_LOG` overrides the default filter for both layers.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "intake=info";
const VERBOSE_LOG_FILTER: &str = "intake=debug";
const KEEP_LOG_FILES: usize = 5;
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;

/// Options for [`init_logging`].
pub struct LogConfig<'a> {
    /// Base name of the log file (`<app_name>.log`).
    pub app_name: &'a str,
    /// Show debug output on the console.
    pub verbose: bool,
}

/// Install the global tracing subscriber.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir()?;
    let file_writer = RotatingWriter::open(&log_dir, config.app_name)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("intake=warn"))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Tracing subscriber already installed")?;

    Ok(())
}

/// Intake home directory: `$INTAKE_HOME`, else `~/.yoda_intake`.
pub fn intake_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("INTAKE_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".yoda_intake"))
        .unwrap_or_else(|| PathBuf::from(".yoda_intake"))
}

/// Logs directory: `<intake home>/logs`
pub fn logs_dir() -> PathBuf {
    intake_home().join("logs")
}

/// Create the logs directory if needed and return it.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let dir = logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}

/// Append-only log file that shifts `name.log` to `name.log.1`, `.2`, ...
/// once it grows past `limit` bytes.
struct RotatingFile {
    dir: PathBuf,
    stem: String,
    keep: usize,
    limit: u64,
    file: File,
    written: u64,
}

impl RotatingFile {
    fn open(dir: &Path, name: &str, keep: usize, limit: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let stem = file_stem(name);
        let (file, written) = open_append(&dir.join(format!("{stem}.log")))?;
        let mut log = Self {
            dir: dir.to_path_buf(),
            stem,
            keep: keep.max(1),
            limit,
            file,
            written,
        };
        if log.written > log.limit {
            log.rotate()?;
        }
        Ok(log)
    }

    fn path_for(&self, generation: usize) -> PathBuf {
        if generation == 0 {
            self.dir.join(format!("{}.log", self.stem))
        } else {
            self.dir.join(format!("{}.log.{}", self.stem, generation))
        }
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let oldest = self.keep.saturating_sub(1);
        if oldest > 0 {
            let _ = fs::remove_file(self.path_for(oldest));
            for generation in (0..oldest).rev() {
                let from = self.path_for(generation);
                if from.exists() {
                    fs::rename(&from, self.path_for(generation + 1))?;
                }
            }
        } else {
            let _ = fs::remove_file(self.path_for(0));
        }
        let (file, written) = open_append(&self.path_for(0))?;
        self.file = file;
        self.written = written;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() as u64 > self.limit {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// `MakeWriter` handing out handles onto one shared [`RotatingFile`].
#[derive(Clone)]
struct RotatingWriter {
    inner: Arc<Mutex<RotatingFile>>,
}

impl RotatingWriter {
    fn open(dir: &Path, name: &str) -> io::Result<Self> {
        let file = RotatingFile::open(dir, name, KEEP_LOG_FILES, ROTATE_AT_BYTES)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

struct RotatingHandle {
    inner: Arc<Mutex<RotatingFile>>,
}

impl RotatingHandle {
    fn with_file<T>(&self, f: impl FnOnce(&mut RotatingFile) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        f(&mut guard)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for RotatingHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem_replaces_separators() {
        assert_eq!(file_stem("intake scan/1"), "intake_scan_1");
        assert_eq!(file_stem("intake-cli_2"), "intake-cli_2");
    }

    #[test]
    fn test_rotation_keeps_bounded_generations() {
        let temp = TempDir::new().unwrap();
        let mut log = RotatingFile::open(temp.path(), "intake", 3, 16).unwrap();

        for _ in 0..10 {
            log.write_all(b"0123456789\n").unwrap();
        }
        log.flush().unwrap();

        assert!(temp.path().join("intake.log").exists());
        assert!(temp.path().join("intake.log.1").exists());
        assert!(temp.path().join("intake.log.2").exists());
        assert!(!temp.path().join("intake.log.3").exists());
    }
}
