//! Resumable checkpoint journal.

use std::path::PathBuf;

use bountyscout_shared::{CheckpointState, ExtractionResult, Result, Slug};
use tracing::{debug, info};

use crate::{read_json_or_default, write_json_atomic};

/// The on-disk checkpoint plus its in-memory mirror.
///
/// Every successful [`append`](Self::append) is durable before it returns: the
/// whole state is rewritten atomically, so the file always holds a prefix of
/// the completed work.
#[derive(Debug)]
pub struct CheckpointJournal {
    path: PathBuf,
    state: CheckpointState,
}

impl CheckpointJournal {
    /// Load the checkpoint at `path`.
    ///
    /// A missing or unreadable file yields an empty state; a corrupt
    /// checkpoint only costs re-crawling, never a failed run.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state: CheckpointState = read_json_or_default(&path, "checkpoint");
        if !state.is_empty() {
            info!(path = %path.display(), completed = state.len(), "resuming from checkpoint");
        }
        Self { path, state }
    }

    pub fn state(&self) -> &CheckpointState {
        &self.state
    }

    pub fn is_completed(&self, slug: &Slug) -> bool {
        self.state.is_completed(slug)
    }

    /// Record a finished item and persist the new state.
    ///
    /// Returns `Ok(false)` without writing if the slug is already completed.
    /// If persisting fails the in-memory append is rolled back, so memory
    /// never runs ahead of disk.
    pub fn append(&mut self, result: ExtractionResult) -> Result<bool> {
        let slug = result.slug.clone();
        if !self.state.append(result) {
            debug!(%slug, "already checkpointed, skipping");
            return Ok(false);
        }

        if let Err(e) = write_json_atomic(&self.path, &self.state) {
            self.state.pop();
            return Err(e);
        }

        debug!(%slug, completed = self.state.len(), "checkpoint saved");
        Ok(true)
    }

    pub fn into_state(self) -> CheckpointState {
        self.state
    }
}
