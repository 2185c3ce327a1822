use crate::storage::{metadata_file_name, read_json, write_json, StorageResult};
use crate::MinerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of one attempted identifier, written once next to its media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Where the media was saved; `None` if no download was attempted
    pub local_p: Option<PathBuf>,

    /// Page URL built from the identifier
    pub url_primary: String,

    /// Media URL extracted from the page; `None` if resolution failed
    pub url_hosting: Option<String>,

    /// Position of the identifier within its batch
    pub index_download: usize,

    pub success_download: bool,
}

impl AttemptRecord {
    /// A record for an attempt that never reached the download step
    pub fn failed(url_primary: impl Into<String>, index_download: usize) -> Self {
        Self {
            local_p: None,
            url_primary: url_primary.into(),
            url_hosting: None,
            index_download,
            success_download: false,
        }
    }

    /// Writes the record into `batch_dir`, named by its index
    pub fn save(&self, batch_dir: &Path) -> Result<PathBuf, MinerError> {
        let path = batch_dir.join(metadata_file_name(self.index_download));
        write_json(&path, self).map_err(|source| MinerError::Record {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Reads a record back from disk
    pub fn load(path: &Path) -> StorageResult<Self> {
        read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_failed_record() {
        let record = AttemptRecord::failed("https://prnt.sc/aabcde", 3);
        assert_eq!(record.local_p, None);
        assert_eq!(record.url_hosting, None);
        assert_eq!(record.index_download, 3);
        assert!(!record.success_download);
    }

    #[test]
    fn test_file_format_uses_null_for_missing_values() {
        let record = AttemptRecord::failed("https://prnt.sc/aabcde", 0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "local_p": null,
                "url_primary": "https://prnt.sc/aabcde",
                "url_hosting": null,
                "index_download": 0,
                "success_download": false
            })
        );
    }

    #[test]
    fn test_save_names_file_by_index() {
        let dir = tempdir().unwrap();
        let record = AttemptRecord {
            local_p: Some(dir.path().join("0012.png")),
            url_primary: "https://prnt.sc/aabcde".to_string(),
            url_hosting: Some("https://image.prntscr.com/image/x.png".to_string()),
            index_download: 12,
            success_download: true,
        };

        let path = record.save(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("0012_metadata.json"));
        assert_eq!(AttemptRecord::load(&path).unwrap(), record);
    }

    #[test]
    fn test_load_parses_path_from_string() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0000_metadata.json");
        std::fs::write(
            &path,
            r#"{"local_p":"out/0000.jpg","url_primary":"u","url_hosting":"h","index_download":0,"success_download":true}"#,
        )
        .unwrap();

        let record = AttemptRecord::load(&path).unwrap();
        assert_eq!(record.local_p, Some(PathBuf::from("out/0000.jpg")));
    }

    #[test]
    fn test_save_into_missing_dir_is_error() {
        let dir = tempdir().unwrap();
        let record = AttemptRecord::failed("u", 0);
        let result = record.save(&dir.path().join("missing"));
        assert!(matches!(result, Err(MinerError::Record { .. })));
    }
}
