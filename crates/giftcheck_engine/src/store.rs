use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};
use giftcheck_core::{ClassificationResult, Link, SessionSettings, SessionSnapshot};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::clock::now_ms;

pub const SESSION_FILENAME: &str = "giftcheck_session.ron";
pub const BACKUP_VERSION: &str = "2.0";

/// Everything needed to rebuild a session elsewhere, written as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBackup {
    pub version: String,
    pub timestamp_ms: i64,
    pub settings: SessionSettings,
    pub links: Vec<Link>,
    pub results: Vec<ClassificationResult>,
}

impl SessionBackup {
    pub fn new(settings: SessionSettings, snapshot: SessionSnapshot) -> Self {
        Self {
            version: BACKUP_VERSION.to_string(),
            timestamp_ms: now_ms(),
            settings,
            links: snapshot.links,
            results: snapshot.results,
        }
    }

    pub fn into_snapshot(self) -> SessionSnapshot {
        SessionSnapshot {
            links: self.links,
            results: self.results,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode session: {0}")]
    Encode(#[from] ron::Error),
    #[error("could not decode session: {0}")]
    Decode(#[from] ron::error::SpannedError),
    #[error("could not encode json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| StoreError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(StoreError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| StoreError::OutputDir(e.to_string()))?;
    }
    // Writability probe.
    NamedTempFile::new_in(dir).map_err(|e| StoreError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file in the same directory, then
/// renames it into place. Readers see the old content or the new, never a mix.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, StoreError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| StoreError::Io(e.error))?;
        Ok(target)
    }
}

/// Session snapshot and link exports, all under one output directory.
pub struct SessionStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILENAME)
    }

    /// Missing file gives an empty snapshot. So does a file that cannot be
    /// read or decoded, after a warning; the next save overwrites it.
    pub fn load(&self) -> SessionSnapshot {
        let path = self.session_path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return SessionSnapshot::default();
            }
            Err(err) => {
                engine_warn!("Failed to read session from {:?}: {}", path, err);
                return SessionSnapshot::default();
            }
        };

        match ron::from_str::<SessionSnapshot>(&content) {
            Ok(snapshot) => {
                engine_info!(
                    "Loaded session from {:?}: {} links, {} results",
                    path,
                    snapshot.links.len(),
                    snapshot.results.len()
                );
                snapshot
            }
            Err(err) => {
                engine_warn!("Failed to parse session from {:?}: {}", path, err);
                SessionSnapshot::default()
            }
        }
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf, StoreError> {
        let content = ron::ser::to_string_pretty(snapshot, ron::ser::PrettyConfig::new())?;
        let path = self.writer.write(SESSION_FILENAME, &content)?;
        engine_info!(
            "Saved session to {:?}: {} links, {} results",
            path,
            snapshot.links.len(),
            snapshot.results.len()
        );
        Ok(path)
    }

    /// One link per line.
    pub fn export_links(&self, filename: &str, links: &[String]) -> Result<PathBuf, StoreError> {
        let mut content = links.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        let path = self.writer.write(filename, &content)?;
        engine_info!("Exported {} links to {:?}", links.len(), path);
        Ok(path)
    }

    /// Full result records as a pretty-printed JSON array.
    pub fn export_results(
        &self,
        filename: &str,
        results: &[ClassificationResult],
    ) -> Result<PathBuf, StoreError> {
        let content = serde_json::to_string_pretty(results)?;
        let path = self.writer.write(filename, &content)?;
        engine_info!("Exported {} results to {:?}", results.len(), path);
        Ok(path)
    }

    pub fn export_backup(
        &self,
        filename: &str,
        backup: &SessionBackup,
    ) -> Result<PathBuf, StoreError> {
        let content = serde_json::to_string_pretty(backup)?;
        let path = self.writer.write(filename, &content)?;
        engine_info!(
            "Wrote backup to {:?}: {} links, {} results",
            path,
            backup.links.len(),
            backup.results.len()
        );
        Ok(path)
    }
}
