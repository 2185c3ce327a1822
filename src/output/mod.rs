//! Output module for reporting on mining runs

pub mod stats;

pub use stats::{load_statistics, print_statistics, MiningStatistics};
