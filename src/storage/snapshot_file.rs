//! Local snapshot mirror.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::model::{Snapshot, SnapshotDocument};

/// Reads and writes one snapshot document at a caller-supplied path.
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    path: PathBuf,
}

impl LocalSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and validates the snapshot file.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        let document = self.load_document()?;
        let snapshot = Snapshot::from_document(document).map_err(|source| StoreError::Snapshot {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(
            path = %self.path.display(),
            features = snapshot.features().len(),
            properties = snapshot.properties().len(),
            "Loaded snapshot from file"
        );
        Ok(snapshot)
    }

    /// Reads the raw document without building a snapshot.
    pub fn load_document(&self) -> Result<SnapshotDocument, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the snapshot's document.
    ///
    /// Writes a sibling temp file and renames it over the target, so readers of
    /// the file never see a truncated document.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let body = serde_json::to_vec_pretty(snapshot.document()).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.temp_path();
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), "Snapshot mirrored to file");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
