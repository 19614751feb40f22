//! Thin helpers over raw system calls.

use nix::errno::Errno;

/// Run a system call, retrying while it is interrupted by a signal.
pub(crate) fn retry_eintr<F, T>(f: F) -> Result<T, Errno>
where
    F: Fn() -> Result<T, Errno>,
{
    loop {
        match f() {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}
