//! swish-kernel: the process-pipeline executor behind swish.
//!
//! This crate provides:
//!
//! - **Tokens**: `TokenSeq`, a word sequence with delimiter counting and slicing
//! - **Channels**: `ChannelPool`, the N-1 OS pipes of an N-segment pipeline
//! - **Launcher**: one forked process per segment, wired to its pool endpoints
//! - **Exec**: the single-command primitive (redirections + `execvp`)
//! - **Pipeline**: `PipelineRunner`, which splits, launches, releases and reaps
//! - **Shell**: a line-in, status-out facade over the above
//! - **Config**: TOML configuration (`ShellConfig`)
//!
//! Unix only.

pub mod channel;
pub mod config;
pub mod error;
pub mod exec;
pub mod launcher;
pub mod pipeline;
pub mod shell;
pub mod status;
pub mod tokens;

mod sys;

pub use channel::ChannelPool;
pub use config::{ReapMode, ShellConfig};
pub use error::{ExecError, PipelineError, PipelineResult, TokenError};
pub use exec::ExecPlan;
pub use launcher::{launch, Wiring};
pub use pipeline::{PipelineRunner, SegmentBounds, Segments};
pub use shell::Shell;
pub use status::{ExitOutcome, PipelineStatus, Reaped};
pub use tokens::{TokenSeq, PIPE_DELIMITER};
