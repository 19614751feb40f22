//! The `Shell` facade: command line in, pipeline status out.

use crate::config::ShellConfig;
use crate::error::PipelineResult;
use crate::pipeline::PipelineRunner;
use crate::status::PipelineStatus;
use crate::tokens::TokenSeq;

/// Entry point for running command lines.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    config: ShellConfig,
    runner: PipelineRunner,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        let runner = PipelineRunner::new(&config);
        Self { config, runner }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Tokenize and run one command line.
    ///
    /// A blank line spawns nothing and reports zero segments.
    #[tracing::instrument(level = "info", skip(self, line), fields(shell = %self.config.name, input_len = line.len()))]
    pub fn execute(&self, line: &str) -> PipelineResult<PipelineStatus> {
        let tokens = TokenSeq::tokenize(line)?;
        if tokens.is_empty() {
            return Ok(PipelineStatus::default());
        }
        self.run_tokens(&tokens)
    }

    /// Run an already tokenized command line.
    pub fn run_tokens(&self, tokens: &TokenSeq) -> PipelineResult<PipelineStatus> {
        self.runner.run(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReapMode;
    use crate::error::{PipelineError, TokenError};

    #[test]
    fn test_blank_line_is_noop() {
        let shell = Shell::default();
        let status = shell.execute("   ").unwrap();
        assert_eq!(status.segments, 0);
        assert!(status.reaped.is_empty());
    }

    #[test]
    fn test_tokenize_error_propagates() {
        let shell = Shell::default();
        match shell.execute("echo 'unterminated") {
            Err(PipelineError::Token(TokenError::UnterminatedQuote('\''))) => {}
            other => panic!("expected tokenize error, got {other:?}"),
        }
    }

    #[test]
    fn test_config_is_kept() {
        let shell = Shell::new(ShellConfig::default().with_reap(ReapMode::PerSegment));
        assert_eq!(shell.config().reap, ReapMode::PerSegment);
    }
}
