//! JSON file storage for BountyScout run state.
//!
//! Three persisted structures live here:
//! - [`CheckpointJournal`] : resumable per-item progress (`scraping_progress.json`)
//! - [`ProcessedSet`] : identifiers already merged into the dataset
//! - the cumulative output dataset ([`load_dataset`] / [`save_dataset`]),
//!   plus its plain-text rendering
//!
//! **Write rules:**
//! - every write goes through [`write_atomic`] (temp file + rename), so a
//!   crash mid-write leaves the previous version intact
//! - the checkpoint journal has a single writer; callers serialize access

mod checkpoint;
mod dataset;
mod processed;

use std::path::{Path, PathBuf};

use bountyscout_shared::{Result, ScoutError};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use checkpoint::CheckpointJournal;
pub use dataset::{load_dataset, save_dataset};
pub use processed::ProcessedSet;

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ScoutError::Storage(format!("serialize {}: {e}", path.display())))?;
    write_atomic(path, json.as_bytes())
}

/// Atomically replace `path` with `contents`, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ScoutError::io(parent, e))?;
    }

    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents).map_err(|e| ScoutError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ScoutError::io(path, e))?;

    tracing::trace!(path = %path.display(), "wrote file");
    Ok(())
}

/// Read and deserialize a JSON file. `Ok(None)` if the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ScoutError::io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ScoutError::parse(format!("invalid JSON in {}: {e}", path.display())))
}

/// Read a JSON file, treating absence or corruption as "empty".
///
/// Used for state that is safe to rebuild (checkpoint, processed set).
pub(crate) fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => {
            tracing::debug!(path = %path.display(), "{what} not found, starting empty");
            T::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "{what} unreadable, starting empty");
            T::default()
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
