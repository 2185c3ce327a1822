//! Statistics for a save directory
//!
//! Combines the checkpoint counters with a scan of the metadata records that
//! are actually on disk.

use crate::state::{AttemptRecord, ProgressState};
use crate::storage;
use crate::Result;
use std::path::{Path, PathBuf};

/// Summary of a save directory
#[derive(Debug, Clone, Default)]
pub struct MiningStatistics {
    /// Last checkpoint, if one exists
    pub progress: Option<ProgressState>,

    /// Number of batch directories
    pub batches: u64,

    /// Metadata records found
    pub records: u64,

    /// Records with `success_download = true`
    pub successful: u64,

    /// Records where a hosting URL was resolved
    pub resolved: u64,

    /// Metadata files that could not be parsed
    pub unreadable: Vec<PathBuf>,
}

impl MiningStatistics {
    /// Fraction of records that were downloaded, 0.0 when there are none
    pub fn success_rate(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.successful as f64 / self.records as f64
        }
    }
}

/// Loads statistics for `save_dir`
///
/// # Returns
///
/// * `Ok(MiningStatistics)` - Counters from the checkpoint and the record scan
/// * `Err(MinerError)` - The checkpoint is corrupt or a directory could not be read
pub fn load_statistics(save_dir: &Path) -> Result<MiningStatistics> {
    let mut stats = MiningStatistics {
        progress: ProgressState::load(&storage::progress_path(save_dir))?,
        ..Default::default()
    };

    for (_, batch_dir) in storage::list_batch_dirs(save_dir)? {
        stats.batches += 1;

        for entry in std::fs::read_dir(&batch_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if !storage::is_metadata_file(&name.to_string_lossy()) {
                continue;
            }

            match AttemptRecord::load(&entry.path()) {
                Ok(record) => {
                    stats.records += 1;
                    if record.success_download {
                        stats.successful += 1;
                    }
                    if record.url_hosting.is_some() {
                        stats.resolved += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!("Unreadable record {}: {}", entry.path().display(), e);
                    stats.unreadable.push(entry.path());
                }
            }
        }
    }

    Ok(stats)
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &MiningStatistics) {
    println!("=== Mining Statistics ===\n");

    match &stats.progress {
        Some(progress) => {
            println!("Checkpoint:");
            println!("  Next batch: {}", progress.batch_id);
            println!("  Processed: {}", progress.n_processed);
            println!("  Successful: {}", progress.n_successful);
            println!("  Generator: {}", progress.generator_type);
            if let Some(seed) = progress.random_seed {
                println!("  Seed: {}", seed);
            }
        }
        None => println!("Checkpoint: none"),
    }

    println!("\nRecords on disk:");
    println!("  Batches: {}", stats.batches);
    println!("  Records: {}", stats.records);
    println!("  Resolved: {}", stats.resolved);
    println!(
        "  Downloaded: {} ({:.1}%)",
        stats.successful,
        stats.success_rate() * 100.0
    );

    if !stats.unreadable.is_empty() {
        println!("\nUnreadable records ({}):", stats.unreadable.len());
        for path in &stats.unreadable {
            println!("  - {}", path.display());
        }
    }
}
