//! The set of identifiers already merged into the dataset.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bountyscout_shared::{Result, Slug};

use crate::{read_json_or_default, write_json_atomic};

/// Identifiers that a previous run fully processed. Only ever grows.
///
/// Stored as a sorted JSON array of slugs.
#[derive(Debug, Clone)]
pub struct ProcessedSet {
    path: PathBuf,
    slugs: BTreeSet<Slug>,
}

impl ProcessedSet {
    /// Load from `path`; absence or corruption yields an empty set.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let slugs: BTreeSet<Slug> = read_json_or_default(&path, "processed set");
        Self { path, slugs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, slug: &Slug) -> bool {
        self.slugs.contains(slug)
    }

    pub fn slugs(&self) -> &BTreeSet<Slug> {
        &self.slugs
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    /// Union `slugs` into the set; returns how many were new.
    pub fn extend<I: IntoIterator<Item = Slug>>(&mut self, slugs: I) -> usize {
        let before = self.slugs.len();
        self.slugs.extend(slugs);
        self.slugs.len() - before
    }

    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.slugs)?;
        tracing::debug!(path = %self.path.display(), count = self.slugs.len(), "saved processed set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;

    #[test]
    fn union_only_grows_and_round_trips() {
        let dir = temp_dir("bs-processed");
        let path = dir.join("processed.json");

        let mut set = ProcessedSet::load(&path);
        assert!(set.is_empty());
        assert_eq!(set.extend([Slug::from("b"), Slug::from("a")]), 2);
        assert_eq!(set.extend([Slug::from("a"), Slug::from("c")]), 1);
        set.save().expect("save");

        let reloaded = ProcessedSet::load(&path);
        let slugs: Vec<&str> = reloaded.slugs().iter().map(Slug::as_str).collect();
        assert_eq!(slugs, vec!["a", "b", "c"]);

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["a", "b", "c"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_empty() {
        let dir = temp_dir("bs-processed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("processed.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(ProcessedSet::load(&path).is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
