//! Atomic JSON snapshot file

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BookError, Result};
use crate::orderbook::DepthSnapshot;

/// Writes the latest snapshot to a JSON file via write-temp-then-rename,
/// so readers only ever see a complete document.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut tmp: OsString = path.clone().into_os_string();
        tmp.push(".tmp");
        Self {
            path,
            tmp_path: PathBuf::from(tmp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with this snapshot
    pub async fn write(&self, snapshot: &DepthSnapshot) -> Result<()> {
        let data = serde_json::to_vec(snapshot)?;

        tokio::fs::write(&self.tmp_path, &data).await.map_err(|e| {
            BookError::SnapshotWrite(format!("{}: {}", self.tmp_path.display(), e))
        })?;
        tokio::fs::rename(&self.tmp_path, &self.path)
            .await
            .map_err(|e| BookError::SnapshotWrite(format!("{}: {}", self.path.display(), e)))?;

        debug!(path = %self.path.display(), instrument = %snapshot.instrument, "Snapshot written");
        Ok(())
    }
}
