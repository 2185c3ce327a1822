use crate::generator::GeneratorKind;
use crate::storage::{read_json, write_json, StorageError};
use crate::ProgressError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Aggregate progress of a mining run, persisted as `progress.json`
///
/// Counters only move after a whole batch has finished, so the file never
/// reflects a partially processed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Id of the next batch to run
    pub batch_id: u64,

    /// Identifiers attempted across all completed batches
    pub n_processed: u64,

    /// Attempts that ended with a saved file
    pub n_successful: u64,

    /// Strategy the identifiers were drawn from
    pub generator_type: GeneratorKind,

    /// Seed of the random strategy, `null` for sequential runs
    pub random_seed: Option<u64>,
}

impl ProgressState {
    /// A zeroed state for a run that has no checkpoint yet
    pub fn fresh(generator_type: GeneratorKind, random_seed: Option<u64>) -> Self {
        Self {
            batch_id: 0,
            n_processed: 0,
            n_successful: 0,
            generator_type,
            random_seed,
        }
    }

    /// Generator offset for a process continuing after this checkpoint
    pub fn resume_offset(&self) -> u64 {
        self.n_processed + 1
    }

    /// Folds a completed batch into the counters
    ///
    /// Returns the processed count from before the update.
    pub fn record_batch(&mut self, batch_len: u64, successes: u64) -> u64 {
        debug_assert!(successes <= batch_len);

        let previous = self.n_processed;
        self.n_processed += batch_len;
        self.n_successful += successes.min(batch_len);
        self.batch_id += 1;
        previous
    }

    /// Loads a checkpoint, returning `None` if none exists yet
    pub fn load(path: &Path) -> Result<Option<Self>, ProgressError> {
        if !path.exists() {
            return Ok(None);
        }

        let state: Self = read_json(path).map_err(|source| match source {
            StorageError::Serialization(e) => ProgressError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            other => ProgressError::Storage {
                path: path.to_path_buf(),
                source: other,
            },
        })?;

        if state.n_successful > state.n_processed {
            return Err(ProgressError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "n_successful ({}) exceeds n_processed ({})",
                    state.n_successful, state.n_processed
                ),
            });
        }

        Ok(Some(state))
    }

    /// Persists the checkpoint atomically
    pub fn save(&self, path: &Path) -> Result<(), ProgressError> {
        write_json(path, self).map_err(|source| ProgressError::Storage {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Returns true if moving from `previous` to `current` processed items crosses a
/// multiple of `every`
pub fn checkpoint_due(previous: u64, current: u64, every: u64) -> bool {
    every > 0 && previous / every != current / every
}
