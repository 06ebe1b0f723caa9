//! Append-only line log that renames itself once it passes a line threshold.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Rotate once the file holds more than this many lines.
pub const ROTATE_AFTER_LINES: usize = 1000;

/// Line log at a fixed path. The line count is tracked in memory (read from
/// the existing file once, on first append) instead of rescanning the file.
#[derive(Debug)]
pub struct RotatingLog {
    path: PathBuf,
    max_lines: usize,
    lines: Option<usize>,
}

impl RotatingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_threshold(path, ROTATE_AFTER_LINES)
    }

    pub fn with_threshold(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines,
            lines: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines in the current file, once known.
    pub fn line_count(&self) -> Option<usize> {
        self.lines
    }

    /// Appends `line` (a newline is added if missing). Returns the rotated
    /// file's path when this append pushed the file past the threshold.
    pub fn append_line(&mut self, line: &str) -> Result<Option<PathBuf>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let existing = match self.lines {
            Some(n) => n,
            None => count_lines(&self.path)
                .with_context(|| format!("failed to read {}", self.path.display()))?,
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut buf = line.to_string();
        if !buf.ends_with('\n') {
            buf.push('\n');
        }
        file.write_all(buf.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        let total = existing + buf.matches('\n').count();
        self.lines = Some(total);

        if total <= self.max_lines {
            return Ok(None);
        }
        let rotated = rotated_path(&self.path, unix_now());
        fs::rename(&self.path, &rotated).with_context(|| {
            format!(
                "failed to rotate {} -> {}",
                self.path.display(),
                rotated.display()
            )
        })?;
        self.lines = Some(0);
        tracing::info!("log rotated: {} -> {}", self.path.display(), rotated.display());
        Ok(Some(rotated))
    }
}

/// `<path>.<unix_ts>`
pub fn rotated_path(path: &Path, unix_ts: u64) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}", unix_ts));
    PathBuf::from(name)
}

fn count_lines(path: &Path) -> io::Result<usize> {
    match fs::read(path) {
        Ok(content) => Ok(content.iter().filter(|&&b| b == b'\n').count()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
