//! On-disk layout for a mining run
//!
//! ```text
//! <save_dir>/
//!   progress.json
//!   images/
//!     batch_000000/
//!       0000.png
//!       0000_metadata.json
//!       0001_metadata.json
//!       ...
//! ```

mod json;

pub use json::{read_json, write_json, StorageError, StorageResult};

use crate::MinerError;
use std::path::{Path, PathBuf};

/// Name of the checkpoint file inside the save directory
pub const PROGRESS_FILE: &str = "progress.json";

/// Subdirectory holding the per-batch directories
pub const IMAGES_DIR: &str = "images";

const BATCH_PREFIX: &str = "batch_";
const METADATA_SUFFIX: &str = "_metadata.json";

pub fn progress_path(save_dir: &Path) -> PathBuf {
    save_dir.join(PROGRESS_FILE)
}

pub fn images_dir(save_dir: &Path) -> PathBuf {
    save_dir.join(IMAGES_DIR)
}

/// Directory for batch `batch_id`, e.g. `images/batch_000042`
pub fn batch_dir(save_dir: &Path, batch_id: u64) -> PathBuf {
    images_dir(save_dir).join(format!("{}{:06}", BATCH_PREFIX, batch_id))
}

/// Metadata file name for the item at `index` within its batch
pub fn metadata_file_name(index: usize) -> String {
    format!("{:04}{}", index, METADATA_SUFFIX)
}

/// Media file name for the item at `index`, keeping the hosted file's extension
pub fn media_file_name(index: usize, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{:04}.{}", index, ext),
        _ => format!("{:04}", index),
    }
}

/// Returns true if `name` looks like a per-item metadata file
pub fn is_metadata_file(name: &str) -> bool {
    name.ends_with(METADATA_SUFFIX)
}

/// Creates `path` and its parents; failure here is fatal for a run
pub fn ensure_dir(path: &Path) -> Result<(), MinerError> {
    std::fs::create_dir_all(path).map_err(|source| MinerError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Lists batch directories under `images/`, sorted by batch id
///
/// Entries whose names do not parse as a batch directory are ignored. A missing
/// `images/` directory yields an empty list.
pub fn list_batch_dirs(save_dir: &Path) -> std::io::Result<Vec<(u64, PathBuf)>> {
    let images = images_dir(save_dir);
    if !images.exists() {
        return Ok(Vec::new());
    }

    let mut batches = Vec::new();
    for entry in std::fs::read_dir(&images)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let id = name
            .to_str()
            .and_then(|n| n.strip_prefix(BATCH_PREFIX))
            .and_then(|n| n.parse::<u64>().ok());

        if let Some(id) = id {
            batches.push((id, entry.path()));
        }
    }

    batches.sort_by_key(|(id, _)| *id);
    Ok(batches)
}
