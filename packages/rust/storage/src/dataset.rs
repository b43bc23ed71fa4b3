//! The cumulative output dataset.

use std::path::{Path, PathBuf};

use bountyscout_shared::{MergedRecord, Result, ScoutError};

use crate::{read_json, write_atomic, write_json_atomic};

/// Load the dataset at `path`.
///
/// A missing file is an empty dataset. An unreadable one is an error: the
/// dataset accumulates across runs and must not be silently replaced.
pub fn load_dataset(path: &Path) -> Result<Vec<MergedRecord>> {
    match read_json(path) {
        Ok(Some(records)) => Ok(records),
        Ok(None) => {
            tracing::debug!(path = %path.display(), "no existing dataset");
            Ok(Vec::new())
        }
        Err(ScoutError::Parse { message }) => Err(ScoutError::Storage(format!(
            "refusing to overwrite unreadable dataset: {message}"
        ))),
        Err(e) => Err(e),
    }
}

/// Save the dataset as JSON at `path` and its plain-text rendering beside
/// it (see [`dataset_text_path`]).
pub fn save_dataset(path: &Path, records: &[MergedRecord]) -> Result<()> {
    write_json_atomic(path, records)?;
    write_atomic(&dataset_text_path(path), render_dataset_text(records).as_bytes())?;
    tracing::info!(path = %path.display(), records = records.len(), "saved dataset");
    Ok(())
}

/// Where the plain-text rendering of the dataset at `path` lives:
/// `bounty_descriptions.json` → `bounty_descriptions.txt`.
fn dataset_text_path(path: &Path) -> PathBuf {
    path.with_extension("txt")
}

/// One block per record: title, URL, reward, sponsor, description, then a
/// rule.
fn render_dataset_text(records: &[MergedRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let reward = match (record.reward_amount, record.token.as_deref()) {
            (Some(amount), Some(token)) => format!("{amount} {token}"),
            (Some(amount), None) => amount.to_string(),
            (None, _) => NOT_AVAILABLE.to_string(),
        };
        let sponsor = record.sponsor.as_deref().unwrap_or(NOT_AVAILABLE);
        out.push_str(&format!("Title: {}\n", record.title));
        out.push_str(&format!("URL: {}\n", record.url));
        out.push_str(&format!("Reward: {reward}\n"));
        out.push_str(&format!("Sponsor: {sponsor}\n"));
        out.push_str(&format!("Description: {}\n", record.description));
        out.push_str(&"-".repeat(80));
        out.push_str("\n\n");
    }
    out
}

const NOT_AVAILABLE: &str = "N/A";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;
    use bountyscout_shared::{ExtractedPrizeData, Slug};

    fn record(slug: &str) -> MergedRecord {
        MergedRecord {
            id: None,
            title: slug.to_uppercase(),
            slug: Slug::from(slug),
            url: String::new(),
            description: "desc".into(),
            reward_amount: Some(100.0),
            token: Some("USDC".into()),
            deadline: None,
            sponsor: None,
            status: None,
            region: None,
            extracted_prize_data: ExtractedPrizeData::default(),
            extra: Default::default(),
        }
    }

    #[test]
    fn save_then_load() {
        let dir = temp_dir("bs-dataset");
        let path = dir.join("dataset.json");

        assert!(load_dataset(&path).expect("missing is empty").is_empty());
        save_dataset(&path, &[record("a"), record("b")]).expect("save");
        let loaded = load_dataset(&path).expect("load");
        assert_eq!(loaded, vec![record("a"), record("b")]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_writes_text_rendering_beside_json() {
        let dir = temp_dir("bs-dataset");
        let path = dir.join("bounty_descriptions.json");
        let mut sponsored = record("a");
        sponsored.sponsor = Some("Acme".into());
        sponsored.url = "https://earn.example.com/listing/a".into();

        save_dataset(&path, &[sponsored, record("b")]).expect("save");

        let text_path = dataset_text_path(&path);
        assert_eq!(text_path, dir.join("bounty_descriptions.txt"));
        let text = std::fs::read_to_string(&text_path).expect("text export");
        assert!(text.starts_with("Title: A\nURL: https://earn.example.com/listing/a\nReward: 100 USDC\n"));
        assert!(text.contains("Sponsor: Acme\n"));
        assert!(text.contains("Sponsor: N/A\n"));
        assert_eq!(text.matches(&"-".repeat(80)).count(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_dataset_is_an_error() {
        let dir = temp_dir("bs-dataset");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dataset.json");
        std::fs::write(&path, "[{ oops").unwrap();

        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, ScoutError::Storage(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
