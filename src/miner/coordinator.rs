//! Mining coordinator - main batch loop
//!
//! This module drives a mining run:
//! - Restoring progress from the last checkpoint and rebuilding the generator
//! - Pulling batches of identifiers and fanning them out to a bounded worker pool
//! - Treating every batch as a barrier before progress is updated
//! - Checkpointing on a cadence, on the item limit, and on shutdown

use crate::config::Config;
use crate::generator::{build_generator, GeneratorKind, IdGenerator, IdSpace};
use crate::miner::worker::{mine_one, record_abandoned, WorkItem, WorkerContext};
use crate::state::{checkpoint_due, AttemptRecord, MinerState, ProgressState};
use crate::storage;
use crate::{GeneratorError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Loop parameters taken from the `[miner]` and `[output]` sections
#[derive(Debug, Clone)]
pub struct MinerSettings {
    pub threads: usize,
    pub batch_size: usize,
    pub checkpoint_every: u64,
    pub images_limit: u64,
    pub save_dir: PathBuf,
}

impl MinerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threads: config.miner.threads as usize,
            batch_size: config.miner.batch_size as usize,
            checkpoint_every: config.miner.checkpoint_every,
            images_limit: config.miner.images_limit,
            save_dir: PathBuf::from(&config.output.save_dir),
        }
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The processed count reached `images-limit`
    LimitReached,

    /// The sequential generator produced every identifier
    Exhausted,

    /// The shutdown token was cancelled
    Signal,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LimitReached => "limit reached",
            Self::Exhausted => "identifier space exhausted",
            Self::Signal => "shutdown requested",
        };
        f.write_str(s)
    }
}

/// Final state of a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: MinerState,
    pub reason: StopReason,
    pub progress: ProgressState,

    /// Checkpoints written during this run, final one included
    pub checkpoints: u64,
}

#[derive(Debug, PartialEq, Eq)]
enum BatchResult {
    Completed { successes: u64 },
    Interrupted,
}

/// Main mining orchestrator
pub struct Miner {
    settings: MinerSettings,
    generator: Box<dyn IdGenerator>,
    progress: ProgressState,
    context: Arc<WorkerContext>,
    state: MinerState,
    stop_reason: Option<StopReason>,
    checkpoints: u64,
}

impl Miner {
    /// Creates a miner from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The miner configuration
    /// * `fresh` - Ignore any existing checkpoint and start from zero
    ///
    /// # Returns
    ///
    /// * `Ok(Miner)` - Ready to run, generator positioned after the checkpoint
    /// * `Err(MinerError)` - The save directory, checkpoint, or client could not be set up
    pub fn new(config: &Config, fresh: bool) -> Result<Self> {
        let settings = MinerSettings::from_config(config);
        storage::ensure_dir(&storage::images_dir(&settings.save_dir))?;

        let (progress, offset) = resume_progress(config, fresh)?;
        let space = IdSpace::new(&config.generator.first_char, config.generator.id_length)?;
        let generator = build_generator(
            progress.generator_type,
            space,
            progress.random_seed.unwrap_or(config.generator.seed),
            offset,
        );

        let context = WorkerContext::new(&config.miner.base_address, &config.http)?;

        Ok(Self::from_parts(settings, generator, progress, context))
    }

    /// Creates a miner on the blocking pool
    ///
    /// Resuming a random generator replays every identifier produced so far,
    /// which takes a while for large checkpoints.
    pub async fn open(config: Config, fresh: bool) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::new(&config, fresh)).await?
    }

    /// Assembles a miner from already-built parts
    pub fn from_parts(
        settings: MinerSettings,
        generator: Box<dyn IdGenerator>,
        progress: ProgressState,
        context: WorkerContext,
    ) -> Self {
        Self {
            settings,
            generator,
            progress,
            context: Arc::new(context),
            state: MinerState::Running,
            stop_reason: None,
            checkpoints: 0,
        }
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn state(&self) -> MinerState {
        self.state
    }

    /// Runs batches until the limit, exhaustion, or `shutdown` is cancelled
    ///
    /// A cancelled token is noticed at batch boundaries and while waiting on a
    /// batch. In the latter case the in-flight tasks are abandoned and the
    /// interrupted batch does not count towards progress.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<RunOutcome> {
        if let Some(reason) = self.stop_reason {
            return Ok(self.outcome(reason));
        }

        tracing::info!(
            "Mining into {} with {} threads, batch size {}, limit {}",
            self.settings.save_dir.display(),
            self.settings.threads,
            self.settings.batch_size,
            self.settings.images_limit
        );

        let start_time = Instant::now();
        let processed_at_start = self.progress.n_processed;

        loop {
            if shutdown.is_cancelled() {
                return self.stop_on_signal();
            }

            if self.progress.n_processed >= self.settings.images_limit {
                tracing::info!(
                    "Processed {} identifiers, limit is {}",
                    self.progress.n_processed,
                    self.settings.images_limit
                );
                return self.stop(StopReason::LimitReached);
            }

            let wanted = match self.generator.remaining() {
                Some(remaining) => remaining.min(self.settings.batch_size as u64) as usize,
                None => self.settings.batch_size,
            };
            if wanted == 0 {
                return self.stop(StopReason::Exhausted);
            }

            let ids = match self.generator.next_n(wanted) {
                Ok(ids) => ids,
                Err(GeneratorError::Exhausted { .. }) => return self.stop(StopReason::Exhausted),
                Err(e) => return Err(e.into()),
            };

            let batch_dir = storage::batch_dir(&self.settings.save_dir, self.progress.batch_id);
            storage::ensure_dir(&batch_dir)?;

            let batch_len = ids.len() as u64;
            let successes = match dispatch_batch(
                Arc::clone(&self.context),
                self.settings.threads,
                ids,
                &batch_dir,
                &shutdown,
            )
            .await?
            {
                BatchResult::Completed { successes } => successes,
                BatchResult::Interrupted => return self.stop_on_signal(),
            };

            let previous = self.progress.record_batch(batch_len, successes);

            let elapsed = start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                (self.progress.n_processed - processed_at_start) as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(
                "Batch {} done: {}/{} saved. Total: {} processed, {} successful, {:.2} ids/sec",
                self.progress.batch_id - 1,
                successes,
                batch_len,
                self.progress.n_processed,
                self.progress.n_successful,
                rate
            );

            if checkpoint_due(
                previous,
                self.progress.n_processed,
                self.settings.checkpoint_every,
            ) {
                self.checkpoint()?;
            }
        }
    }

    fn stop(&mut self, reason: StopReason) -> Result<RunOutcome> {
        tracing::info!("Stopping: {}", reason);
        self.checkpoint()?;
        self.transition(MinerState::Stopped);
        self.stop_reason = Some(reason);
        Ok(self.outcome(reason))
    }

    fn stop_on_signal(&mut self) -> Result<RunOutcome> {
        self.transition(MinerState::Stopping);
        tracing::info!(
            "Shutdown requested, saving progress at {} processed",
            self.progress.n_processed
        );
        self.checkpoint()?;
        self.transition(MinerState::Stopped);
        self.stop_reason = Some(StopReason::Signal);
        Ok(self.outcome(StopReason::Signal))
    }

    fn checkpoint(&mut self) -> Result<()> {
        let path = storage::progress_path(&self.settings.save_dir);
        self.progress.save(&path)?;
        self.checkpoints += 1;
        tracing::info!(
            "Checkpoint saved: batch {}, {} processed, {} successful",
            self.progress.batch_id,
            self.progress.n_processed,
            self.progress.n_successful
        );
        Ok(())
    }

    fn transition(&mut self, next: MinerState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!("Miner state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn outcome(&self, reason: StopReason) -> RunOutcome {
        RunOutcome {
            state: self.state,
            reason,
            progress: self.progress.clone(),
            checkpoints: self.checkpoints,
        }
    }
}

/// Mines one batch on a pool of `threads` workers and waits for all of them
///
/// Items are independent: each writes its own record under `batch_dir`. A task
/// that dies without writing its record gets a failed one written here.
async fn dispatch_batch(
    context: Arc<WorkerContext>,
    threads: usize,
    ids: Vec<String>,
    batch_dir: &Path,
    shutdown: &CancellationToken,
) -> Result<BatchResult> {
    let semaphore = Arc::new(Semaphore::new(threads.max(1)));
    let items: Vec<WorkItem> = ids
        .into_iter()
        .enumerate()
        .map(|(index, id)| WorkItem {
            id,
            index,
            batch_dir: batch_dir.to_path_buf(),
        })
        .collect();

    let mut tasks = JoinSet::new();
    for item in items.iter().cloned() {
        let context = Arc::clone(&context);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            mine_one(&context, &item).await
        });
    }

    join_batch(&context, &items, tasks, shutdown).await
}

/// Waits on a batch's tasks and reconciles the results
///
/// Every item ends with a record on disk: items whose task panicked or was
/// lost get a failed record written here and count as failures.
async fn join_batch(
    context: &WorkerContext,
    items: &[WorkItem],
    mut tasks: JoinSet<Result<AttemptRecord>>,
    shutdown: &CancellationToken,
) -> Result<BatchResult> {
    let mut completed = vec![false; items.len()];
    let mut successes = 0u64;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                tracing::warn!("Abandoning {} in-flight task(s)", tasks.len());
                return Ok(BatchResult::Interrupted);
            }

            joined = tasks.join_next() => match joined {
                None => break,
                Some(Ok(Ok(record))) => {
                    if let Some(done) = completed.get_mut(record.index_download) {
                        *done = true;
                    }
                    if record.success_download {
                        successes += 1;
                    }
                }
                Some(Ok(Err(e))) => return Err(e),
                Some(Err(e)) => tracing::error!("Worker task failed: {}", e),
            },
        }
    }

    for item in items.iter().filter(|item| !completed[item.index]) {
        tracing::warn!("Recording abandoned item {} ({})", item.index, item.id);
        record_abandoned(context, item)?;
    }

    Ok(BatchResult::Completed { successes })
}

/// Restores progress for a run and computes the generator offset
///
/// Without a checkpoint (or with `fresh`), progress starts at zero with the
/// configured strategy and offset 0. With a checkpoint, its strategy and seed
/// win over the configuration and the offset is `n_processed + 1`.
pub fn resume_progress(config: &Config, fresh: bool) -> Result<(ProgressState, u64)> {
    let kind = config.generator.strategy;
    let configured_seed = match kind {
        GeneratorKind::Random => Some(config.generator.seed),
        GeneratorKind::Sequential => None,
    };

    if fresh {
        tracing::info!("Starting fresh, ignoring any existing checkpoint");
        return Ok((ProgressState::fresh(kind, configured_seed), 0));
    }

    let path = storage::progress_path(Path::new(&config.output.save_dir));
    let mut saved = match ProgressState::load(&path)? {
        Some(saved) => saved,
        None => {
            tracing::info!("No checkpoint at {}, starting new run", path.display());
            return Ok((ProgressState::fresh(kind, configured_seed), 0));
        }
    };

    if saved.generator_type == GeneratorKind::Random && saved.random_seed.is_none() {
        saved.random_seed = Some(config.generator.seed);
    }

    if saved.generator_type != kind || saved.random_seed != configured_seed {
        tracing::warn!(
            "Checkpoint uses the {} generator (seed {:?}); ignoring configured {} (seed {:?})",
            saved.generator_type,
            saved.random_seed,
            kind,
            configured_seed
        );
    }

    let offset = saved.resume_offset();
    tracing::info!(
        "Resuming from checkpoint: batch {}, {} processed, {} successful, generator offset {}",
        saved.batch_id,
        saved.n_processed,
        saved.n_successful,
        offset
    );

    Ok((saved, offset))
}

/// Runs a complete mining operation
///
/// # Example
///
/// ```no_run
/// use img_miner::config::load_config;
/// use img_miner::miner::run_miner;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("miner.toml"))?;
/// let outcome = run_miner(&config, false, CancellationToken::new()).await?;
/// println!("Stopped: {}", outcome.reason);
/// # Ok(())
/// # }
/// ```
pub async fn run_miner(
    config: &Config,
    fresh: bool,
    shutdown: CancellationToken,
) -> Result<RunOutcome> {
    let mut miner = Miner::open(config.clone(), fresh).await?;
    miner.run(shutdown).await
}
