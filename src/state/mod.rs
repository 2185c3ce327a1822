//! State module for tracking mining progress
//!
//! # Components
//!
//! - `ProgressState`: aggregate counters checkpointed to `progress.json`
//! - `AttemptRecord`: the write-once outcome of a single identifier
//! - `MinerState`: lifecycle of the orchestrator (running, stopping, stopped)

mod miner_state;
mod progress;
mod record;

// Re-export main types
pub use miner_state::MinerState;
pub use progress::{checkpoint_due, ProgressState};
pub use record::AttemptRecord;
