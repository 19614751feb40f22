//! Single-command execution: redirections and program image replacement.
//!
//! An `ExecPlan` is built in the orchestrating process, before `fork`: the
//! tokens are parsed and converted to C strings there. The spawned process
//! opens the redirection targets, rebinds stdin/stdout and calls `execvp`,
//! which still allocates its argument pointer array.
//!
//! Supported redirections, each a standalone token followed by a path:
//!
//! | Token | Effect                                  |
//! |-------|-----------------------------------------|
//! | `<`   | stdin from file                         |
//! | `>`   | stdout to file, truncating              |
//! | `>>`  | stdout to file, appending               |

use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::os::fd::RawFd;

use nix::fcntl::{self, OFlag};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd;

use crate::error::ExecError;
use crate::sys::retry_eintr;
use crate::tokens::TokenSeq;

/// A redirection applied to the spawned process before exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Input(CString),
    Truncate(CString),
    Append(CString),
}

impl Redirect {
    fn path(&self) -> &CStr {
        match self {
            Redirect::Input(p) | Redirect::Truncate(p) | Redirect::Append(p) => p,
        }
    }

    fn target_fd(&self) -> RawFd {
        match self {
            Redirect::Input(_) => libc::STDIN_FILENO,
            Redirect::Truncate(_) | Redirect::Append(_) => libc::STDOUT_FILENO,
        }
    }

    fn flags(&self) -> OFlag {
        match self {
            Redirect::Input(_) => OFlag::O_RDONLY,
            Redirect::Truncate(_) => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Redirect::Append(_) => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
        }
    }
}

/// A fully prepared command: program, argv (including argv[0]) and redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecPlan {
    argv: Vec<CString>,
    redirects: Vec<Redirect>,
}

impl ExecPlan {
    /// Parse one command segment.
    pub fn prepare(tokens: &TokenSeq) -> Result<Self, ExecError> {
        let mut argv = Vec::with_capacity(tokens.len());
        let mut redirects = Vec::new();
        let mut iter = tokens.iter();

        while let Some(token) = iter.next() {
            match token {
                "<" | ">" | ">>" => {
                    let path = iter
                        .next()
                        .ok_or_else(|| ExecError::MissingRedirectTarget(token.to_string()))?;
                    let path = to_cstring(path)?;
                    redirects.push(match token {
                        "<" => Redirect::Input(path),
                        ">" => Redirect::Truncate(path),
                        _ => Redirect::Append(path),
                    });
                }
                _ => argv.push(to_cstring(token)?),
            }
        }

        if argv.is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        Ok(Self { argv, redirects })
    }

    pub fn program(&self) -> &CStr {
        &self.argv[0]
    }

    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    pub fn redirects(&self) -> &[Redirect] {
        &self.redirects
    }

    /// Replace the current process image with this command.
    ///
    /// Only returns on failure. Meant to be called inside a freshly spawned
    /// process; calling it in the orchestrator would replace the orchestrator.
    pub fn exec(&self) -> ExecError {
        match self.try_exec() {
            Ok(never) => match never {},
            Err(e) => e,
        }
    }

    fn try_exec(&self) -> Result<Infallible, ExecError> {
        for redirect in &self.redirects {
            apply_redirect(redirect)?;
        }

        // The Rust runtime ignores SIGPIPE and ignored dispositions survive
        // exec; writers must die when their reader goes away.
        // SAFETY: restoring the default handler installs no Rust code.
        unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) }.map_err(ExecError::Signal)?;

        unistd::execvp(self.program(), &self.argv).map_err(|source| ExecError::Exec {
            program: self.program().to_string_lossy().into_owned(),
            source,
        })
    }
}

fn apply_redirect(redirect: &Redirect) -> Result<(), ExecError> {
    let path = redirect.path();
    let fd = retry_eintr(|| {
        fcntl::open(path, redirect.flags(), Mode::from_bits_truncate(0o644))
    })
    .map_err(|source| ExecError::Open {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;

    rebind(fd, redirect.target_fd())
}

/// Move `fd` onto `target` and close the original.
fn rebind(fd: RawFd, target: RawFd) -> Result<(), ExecError> {
    if fd != target {
        retry_eintr(|| unistd::dup2(fd, target)).map_err(ExecError::Rebind)?;
        unistd::close(fd).map_err(ExecError::Release)?;
    }
    Ok(())
}

fn to_cstring(token: &str) -> Result<CString, ExecError> {
    CString::new(token).map_err(|_| ExecError::NulByte(token.to_string()))
}
