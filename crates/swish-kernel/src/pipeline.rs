//! Pipeline orchestration.
//!
//! Splits a token sequence at standalone `|` tokens, allocates the channel
//! pool, launches one process per segment, releases its own copy of the pool
//! and reaps every spawned process.
//!
//! ```text
//!   tokens:  echo hi | tr a-z A-Z | cat
//!            ───┬─── ─ ────┬────  ─ ─┬─
//!   segment:    0          1         2
//!   stdin:   inherit    pool[0]   pool[2]
//!   stdout:  pool[1]    pool[3]   inherit
//! ```
//!
//! Segments run concurrently; backpressure comes from the OS pipes alone.

use nix::sys::wait;
use nix::unistd::Pid;

use crate::channel::ChannelPool;
use crate::config::{ReapMode, ShellConfig};
use crate::error::PipelineResult;
use crate::launcher::{self, Wiring};
use crate::status::{ExitOutcome, PipelineStatus, Reaped};
use crate::sys::retry_eintr;
use crate::tokens::{TokenSeq, PIPE_DELIMITER};

/// Token bounds of one segment: `[start, end)` in the full sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBounds {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

/// Iterator over the segments of a token sequence.
///
/// Always yields `delimiters + 1` segments; adjacent, leading or trailing
/// delimiters produce empty segments.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    tokens: &'a [String],
    start: usize,
    index: usize,
    done: bool,
}

impl<'a> Segments<'a> {
    pub fn new(tokens: &'a TokenSeq) -> Self {
        Self {
            tokens: tokens.as_slice(),
            start: 0,
            index: 0,
            done: false,
        }
    }
}

impl Iterator for Segments<'_> {
    type Item = SegmentBounds;

    fn next(&mut self) -> Option<SegmentBounds> {
        if self.done {
            return None;
        }

        let rest = &self.tokens[self.start..];
        let end = match rest.iter().position(|t| t == PIPE_DELIMITER) {
            Some(offset) => self.start + offset,
            None => {
                self.done = true;
                self.tokens.len()
            }
        };

        let bounds = SegmentBounds {
            index: self.index,
            start: self.start,
            end,
        };
        self.start = end + 1;
        self.index += 1;
        Some(bounds)
    }
}

/// Runs pipelines by spawning one process per segment and connecting them
/// through a channel pool.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunner {
    reap: ReapMode,
}

impl PipelineRunner {
    pub fn new(config: &ShellConfig) -> Self {
        Self { reap: config.reap }
    }

    pub fn with_reap_mode(reap: ReapMode) -> Self {
        Self { reap }
    }

    pub fn reap_mode(&self) -> ReapMode {
        self.reap
    }

    /// Execute a pipeline.
    ///
    /// `Ok` means every segment was spawned; segment exit statuses are
    /// recorded in the returned status but never turn into an `Err`.
    ///
    /// If channel allocation fails nothing is spawned. If a spawn fails, the
    /// pool is released and the segments already running are reaped (left to
    /// finish, not killed) before the error is returned.
    pub fn run(&self, tokens: &TokenSeq) -> PipelineResult<PipelineStatus> {
        self.run_with(tokens, launcher::launch)
    }

    /// Execute a pipeline, creating each segment's process with `launch`.
    ///
    /// `run` uses [`launcher::launch`]. A replacement must either return the
    /// pid of a child of this process or an error; the cleanup on error is
    /// the same as for `run`.
    #[tracing::instrument(level = "debug", skip(self, tokens, launch), fields(token_count = tokens.len()))]
    pub fn run_with<F>(&self, tokens: &TokenSeq, launch: F) -> PipelineResult<PipelineStatus>
    where
        F: FnMut(&TokenSeq, &ChannelPool, Wiring) -> PipelineResult<Pid>,
    {
        let count = tokens.count_occurrences(PIPE_DELIMITER) + 1;
        let pool = ChannelPool::allocate(count)?;

        let mut spawned = Vec::with_capacity(count);
        let launched = launch_all(tokens, &pool, count, &mut spawned, launch);

        // The orchestrator's copies of the write ends must go before waiting,
        // or the last reader never sees end-of-stream.
        pool.release();

        match launched {
            Ok(()) => {
                tracing::debug!(segments = count, "pipeline launched");
                let reaped = match self.reap {
                    ReapMode::Unordered => reap_unordered(spawned.len()),
                    ReapMode::PerSegment => reap_each(&spawned),
                };
                Ok(PipelineStatus {
                    segments: count,
                    reaped,
                })
            }
            Err(e) => {
                tracing::error!(spawned = spawned.len(), segments = count, "pipeline launch aborted: {e}");
                reap_each(&spawned);
                Err(e)
            }
        }
    }
}

/// Launch every segment left to right, stopping at the first failure.
fn launch_all<F>(
    tokens: &TokenSeq,
    pool: &ChannelPool,
    count: usize,
    spawned: &mut Vec<Pid>,
    mut launch: F,
) -> PipelineResult<()>
where
    F: FnMut(&TokenSeq, &ChannelPool, Wiring) -> PipelineResult<Pid>,
{
    for bounds in Segments::new(tokens) {
        let segment = tokens.slice(bounds.start, bounds.end)?;
        let wiring = Wiring::for_segment(bounds.index, count);
        let pid = launch(&segment, pool, wiring)?;
        spawned.push(pid);
    }
    Ok(())
}

/// Wait `count` times for any child, recording statuses as the host reports them.
fn reap_unordered(count: usize) -> Vec<Reaped> {
    let mut reaped = Vec::with_capacity(count);
    for _ in 0..count {
        match retry_eintr(wait::wait) {
            Ok(status) => {
                let Some(pid) = status.pid() else { continue };
                let outcome = ExitOutcome::from(status);
                tracing::trace!(%pid, %outcome, "reaped");
                reaped.push(Reaped {
                    pid,
                    segment: None,
                    outcome,
                });
            }
            Err(nix::errno::Errno::ECHILD) => {
                tracing::warn!("no children left to reap");
                break;
            }
            Err(e) => tracing::warn!("error waiting for child: {e}"),
        }
    }
    reaped
}

/// Wait for each pid in pipeline order, attributing statuses to segments.
fn reap_each(pids: &[Pid]) -> Vec<Reaped> {
    let mut reaped = Vec::with_capacity(pids.len());
    for (segment, &pid) in pids.iter().enumerate() {
        match retry_eintr(|| wait::waitpid(pid, None)) {
            Ok(status) => {
                let outcome = ExitOutcome::from(status);
                tracing::trace!(%pid, segment, %outcome, "reaped");
                reaped.push(Reaped {
                    pid,
                    segment: Some(segment),
                    outcome,
                });
            }
            Err(e) => tracing::warn!(%pid, segment, "error waiting for child: {e}"),
        }
    }
    reaped
}
