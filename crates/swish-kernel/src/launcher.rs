//! Segment launching: one process per pipeline segment.
//!
//! ```text
//!   orchestrator                         spawned segment
//!   ────────────                         ───────────────
//!   resolve wiring → raw fds
//!   ExecPlan::prepare(segment)
//!   fork ──────────────────────────────▶ dup2(read  → stdin)
//!     │                                  dup2(write → stdout)
//!     │                                  close every pool endpoint
//!     ▼                                  execvp  ──▶ (never returns)
//!   Ok(pid)                              on any error: diagnostic, _exit(1)
//! ```
//!
//! The command is parsed and converted to C strings before `fork`. After
//! `fork` the spawned process still allocates in two places: `execvp` builds
//! its argument pointer array, and a failure diagnostic is formatted and
//! written through the stderr lock.

use std::os::fd::RawFd;

use nix::libc;
use nix::unistd::{self, ForkResult, Pid};

use crate::channel::ChannelPool;
use crate::error::{ExecError, PipelineError, PipelineResult};
use crate::exec::ExecPlan;
use crate::sys::retry_eintr;
use crate::tokens::TokenSeq;

/// Which pool endpoints a segment's standard streams are bound to.
///
/// `None` means the stream is inherited from the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring {
    /// Position of the segment in its pipeline.
    pub segment: usize,
    pub read: Option<usize>,
    pub write: Option<usize>,
}

impl Wiring {
    /// Both streams inherited; a lone command.
    pub const INHERIT: Wiring = Wiring {
        segment: 0,
        read: None,
        write: None,
    };

    /// Endpoint assignment for segment `index` of a `count`-segment pipeline.
    ///
    /// Segment `i` reads pair `i-1` (endpoint `2(i-1)`) unless it is first,
    /// and writes pair `i` (endpoint `2i+1`) unless it is last.
    pub fn for_segment(index: usize, count: usize) -> Self {
        Self {
            segment: index,
            read: index.checked_sub(1).map(|prev| 2 * prev),
            write: (index + 1 < count).then_some(2 * index + 1),
        }
    }
}

/// Spawn a process running `segment` with its streams bound per `wiring`.
///
/// The return value only reflects whether the process could be created.
/// Anything that goes wrong inside the new process is reported on its stderr
/// and surfaces as its exit status.
pub fn launch(segment: &TokenSeq, pool: &ChannelPool, wiring: Wiring) -> PipelineResult<Pid> {
    let stdin = wiring.read.map(|i| pool.raw(i)).transpose()?;
    let stdout = wiring.write.map(|i| pool.raw(i)).transpose()?;
    let plan = ExecPlan::prepare(segment);

    // SAFETY: the child never returns into the caller. It rebinds streams,
    // closes the pool and execs, or prints a diagnostic and calls _exit.
    match retry_eintr(|| unsafe { unistd::fork() }) {
        Ok(ForkResult::Parent { child }) => {
            tracing::debug!(pid = %child, segment = wiring.segment, read = ?wiring.read, write = ?wiring.write, "spawned segment");
            Ok(child)
        }
        Ok(ForkResult::Child) => run_segment(plan, pool, stdin, stdout),
        Err(e) => {
            tracing::error!(command = %segment, segment = wiring.segment, "failed to fork: {e}");
            Err(PipelineError::Spawn {
                segment: wiring.segment,
                source: e,
            })
        }
    }
}

/// Body of the spawned process. Never returns into the caller's code.
fn run_segment(
    plan: Result<ExecPlan, ExecError>,
    pool: &ChannelPool,
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
) -> ! {
    let err = match bind_streams(pool, stdin, stdout) {
        Ok(()) => match plan {
            Ok(plan) => plan.exec(),
            Err(e) => e,
        },
        Err(e) => e,
    };

    eprintln!("swish: {err}");
    // SAFETY: _exit skips atexit handlers and stdio flushing inherited from
    // the orchestrator, which must not run twice.
    unsafe { libc::_exit(1) }
}

/// Bind stdin/stdout to their endpoints, then close this process's copy of
/// every pool endpoint so the bound streams are the only live references.
fn bind_streams(
    pool: &ChannelPool,
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
) -> Result<(), ExecError> {
    if let Some(fd) = stdin {
        retry_eintr(|| unistd::dup2(fd, libc::STDIN_FILENO)).map_err(ExecError::Rebind)?;
    }
    if let Some(fd) = stdout {
        retry_eintr(|| unistd::dup2(fd, libc::STDOUT_FILENO)).map_err(ExecError::Rebind)?;
    }

    for fd in pool.raw_fds() {
        unistd::close(fd).map_err(ExecError::Release)?;
    }
    Ok(())
}
