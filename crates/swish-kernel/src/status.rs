//! Outcomes of reaped segment processes.

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

/// How a reaped process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(Signal),
    /// A wait status that is neither an exit nor a fatal signal.
    Other,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }

    /// Shell-style numeric code: the exit code, or 128 + signal number.
    pub fn code(&self) -> i32 {
        match self {
            ExitOutcome::Exited(code) => *code,
            ExitOutcome::Signaled(sig) => 128 + *sig as i32,
            ExitOutcome::Other => -1,
        }
    }
}

impl From<WaitStatus> for ExitOutcome {
    fn from(status: WaitStatus) -> Self {
        match status {
            WaitStatus::Exited(_, code) => ExitOutcome::Exited(code),
            WaitStatus::Signaled(_, sig, _) => ExitOutcome::Signaled(sig),
            _ => ExitOutcome::Other,
        }
    }
}

impl std::fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exited with {code}"),
            ExitOutcome::Signaled(sig) => write!(f, "killed by {sig}"),
            ExitOutcome::Other => write!(f, "unknown status"),
        }
    }
}

/// One reaped process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaped {
    pub pid: Pid,
    /// Pipeline position, when the reap mode attributes statuses.
    pub segment: Option<usize>,
    pub outcome: ExitOutcome,
}

/// Result of a pipeline whose segments were all spawned.
///
/// Reaching this type at all is the aggregate success signal; the individual
/// outcomes are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStatus {
    /// Number of segments launched.
    pub segments: usize,
    /// Reaped processes, in the order the host reported them.
    pub reaped: Vec<Reaped>,
}

impl PipelineStatus {
    /// Number of segments that exited non-zero or were killed.
    pub fn failures(&self) -> usize {
        self.reaped.iter().filter(|r| !r.outcome.success()).count()
    }

    /// Outcome of the last segment, if statuses were attributed.
    pub fn last_exit(&self) -> Option<ExitOutcome> {
        let last = self.segments.checked_sub(1)?;
        self.reaped
            .iter()
            .find(|r| r.segment == Some(last))
            .map(|r| r.outcome)
    }
}
