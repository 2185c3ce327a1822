/// Lifecycle states of a mining run
use std::fmt;

/// Represents the current state of the mining orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinerState {
    /// Pulling batches and dispatching them to workers
    Running,

    /// A stop was triggered and the final checkpoint is being written
    Stopping,

    /// Terminal; no further batches will run
    Stopped,
}

impl MinerState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// `Running` may stop directly (limit reached, exhaustion) or pass through
    /// `Stopping` (external signal). Nothing leaves `Stopped`.
    pub fn can_transition_to(&self, next: MinerState) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Stopping)
                | (Self::Running, Self::Stopped)
                | (Self::Stopping, Self::Stopped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for MinerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
