// MIT License - Copyright (c) 2026 Peter Wright
// Inbound report spool (Asterisk AlarmReceiver event files)

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::{Result, SimonError};

/// AlarmReceiver names each report `event-<id>` when `logindividualevents = yes`.
pub const EVENT_FILE_PREFIX: &str = "event-";

/// Report id for an event file name.
/// e.g., `event-1IkVo1` → `1IkVo1`
pub fn report_id_from_filename(name: &str) -> &str {
    name.strip_prefix(EVENT_FILE_PREFIX).unwrap_or(name)
}

/// One report file waiting to be decoded.
#[derive(Debug, Clone)]
pub struct SpooledReport {
    pub path: PathBuf,
    pub report_id: String,
    pub text: String,
}

/// A directory of AlarmReceiver event files, plus where processed files go.
#[derive(Debug, Clone)]
pub struct ReportSpool {
    src_dir: PathBuf,
    dst_dir: PathBuf,
    move_files: bool,
}

impl ReportSpool {
    /// Both directories must already exist.
    pub fn new(src_dir: impl Into<PathBuf>, dst_dir: impl Into<PathBuf>, move_files: bool) -> Result<Self> {
        let src_dir = src_dir.into();
        let dst_dir = dst_dir.into();
        for dir in [&src_dir, &dst_dir] {
            if !dir.is_dir() {
                return Err(SimonError::Config(format!(
                    "required directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(Self { src_dir, dst_dir, move_files })
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Event files currently in the source directory, sorted by name.
    pub async fn pending(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&self.src_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_event = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(EVENT_FILE_PREFIX));
            if is_event && entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Read a report. Bytes that aren't UTF-8 (a Latin-1 caller name, say)
    /// are replaced rather than failing the whole file.
    pub async fn read(&self, path: &Path) -> Result<SpooledReport> {
        debug!("Reading event file {}", path.display());
        let bytes = fs::read(path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SimonError::Config(format!("bad event file name: {}", path.display())))?;
        Ok(SpooledReport {
            path: path.to_path_buf(),
            report_id: report_id_from_filename(name).to_string(),
            text,
        })
    }

    /// Move a processed file out of the source directory (if configured to).
    pub async fn finish(&self, path: &Path) -> Result<()> {
        if !self.move_files {
            return Ok(());
        }
        let Some(name) = path.file_name() else {
            return Ok(());
        };
        let dst = self.dst_dir.join(name);
        debug!("Moving file {} to {}", path.display(), dst.display());
        fs::rename(path, dst).await?;
        Ok(())
    }
}
