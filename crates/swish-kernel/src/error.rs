//! Error types for tokenizing, command execution, and pipeline orchestration.
//!
//! Errors on the orchestrator side (`PipelineError`) are returned to the caller.
//! Errors inside a spawned segment (`ExecError`) never cross the process
//! boundary: the segment prints them to its own stderr and exits non-zero.

use nix::errno::Errno;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors from building or slicing a token sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    #[error("slice [{start}, {end}) out of bounds for {len} tokens")]
    SliceOutOfBounds { start: usize, end: usize, len: usize },
}

/// Errors from the single-command execution primitive.
///
/// Produced either while preparing a segment (parsing, C string conversion)
/// or while replacing the program image inside the spawned process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,
    #[error("syntax error: expected a path after '{0}'")]
    MissingRedirectTarget(String),
    #[error("argument contains a NUL byte: {0:?}")]
    NulByte(String),
    #[error("{path}: {source}")]
    Open { path: String, source: Errno },
    #[error("cannot rebind standard stream: {0}")]
    Rebind(Errno),
    #[error("cannot release descriptor: {0}")]
    Release(Errno),
    #[error("cannot restore SIGPIPE disposition: {0}")]
    Signal(Errno),
    #[error("{program}: {source}")]
    Exec { program: String, source: Errno },
}

/// Orchestrator-level failures. Any of these means the launch was aborted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("failed to create channel: {0}")]
    Channel(#[source] Errno),
    #[error("failed to spawn process for segment {segment}: {source}")]
    Spawn {
        segment: usize,
        #[source]
        source: Errno,
    },
    #[error("endpoint {index} out of range for a pool of {available} endpoints")]
    EndpointOutOfRange { index: usize, available: usize },
}
