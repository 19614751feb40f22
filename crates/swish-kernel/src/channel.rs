//! Channel pool allocation for an N-segment pipeline.
//!
//! A pool holds N-1 OS pipes laid out as a flat endpoint table:
//!
//! ```text
//!   index:   0      1      2      3     ...  2k     2k+1
//!   end:   read₀ write₀ read₁ write₁  ...  readₖ  writeₖ
//! ```
//!
//! Segment `i` reads from `2(i-1)` and writes to `2i+1`. The table is owned by
//! the orchestrator; every spawned segment gets a copy through `fork` and must
//! close that copy itself. A writer left open anywhere keeps the downstream
//! reader from ever seeing end-of-stream.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};

use nix::unistd;

use crate::error::{PipelineError, PipelineResult};
use crate::sys::retry_eintr;

/// The endpoint table for one pipeline launch.
#[derive(Debug, Default)]
pub struct ChannelPool {
    endpoints: Vec<OwnedFd>,
}

impl ChannelPool {
    /// Create the N-1 channel pairs needed for `segments` segments.
    ///
    /// Allocation is all-or-nothing: if any pipe cannot be created, the pairs
    /// already created are closed before the error is returned.
    pub fn allocate(segments: usize) -> PipelineResult<Self> {
        let pairs = segments.saturating_sub(1);
        let mut endpoints = Vec::with_capacity(pairs * 2);

        for pair in 0..pairs {
            // On `?` the partially filled table drops, closing every endpoint.
            let (read, write) = retry_eintr(unistd::pipe).map_err(|e| {
                tracing::error!(pair, pairs, "failed to create channel: {e}");
                PipelineError::Channel(e)
            })?;
            endpoints.push(read);
            endpoints.push(write);
        }

        tracing::trace!(pairs, "allocated channel pool");
        Ok(Self { endpoints })
    }

    /// Number of channel pairs in the pool.
    pub fn pair_count(&self) -> usize {
        self.endpoints.len() / 2
    }

    /// Number of endpoints (always twice the pair count).
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn endpoint(&self, index: usize) -> Option<BorrowedFd<'_>> {
        self.endpoints.get(index).map(AsFd::as_fd)
    }

    /// Raw descriptor for an endpoint index, or an error if it is outside the table.
    pub fn raw(&self, index: usize) -> PipelineResult<RawFd> {
        self.endpoints
            .get(index)
            .map(AsRawFd::as_raw_fd)
            .ok_or(PipelineError::EndpointOutOfRange {
                index,
                available: self.endpoints.len(),
            })
    }

    /// Every raw descriptor in table order.
    pub fn raw_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.endpoints.iter().map(AsRawFd::as_raw_fd)
    }

    /// Close every endpoint held by this process.
    ///
    /// Dropping the pool also closes everything; this variant reports close
    /// failures instead of swallowing them.
    pub fn release(self) {
        let count = self.endpoints.len();
        for fd in self.endpoints {
            let raw = fd.into_raw_fd();
            // EINTR is not retried: the descriptor state after an interrupted
            // close is unspecified and retrying may close a reused number.
            if let Err(e) = unistd::close(raw) {
                tracing::warn!(fd = raw, "failed to close channel endpoint: {e}");
            }
        }
        tracing::trace!(count, "released channel pool");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::io::{Read, Write};

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(5, 4)]
    fn test_allocate_pair_count(#[case] segments: usize, #[case] pairs: usize) {
        let pool = ChannelPool::allocate(segments).unwrap();
        assert_eq!(pool.pair_count(), pairs);
        assert_eq!(pool.endpoint_count(), pairs * 2);
        pool.release();
    }

    #[test]
    fn test_endpoints_are_distinct() {
        let pool = ChannelPool::allocate(4).unwrap();
        let mut fds: Vec<RawFd> = pool.raw_fds().collect();
        fds.sort_unstable();
        fds.dedup();
        assert_eq!(fds.len(), 6);
    }

    #[test]
    fn test_pair_layout_read_then_write() {
        let pool = ChannelPool::allocate(3).unwrap();

        // Bytes written to 2k+1 come out of 2k.
        for pair in 0..pool.pair_count() {
            let write = pool.endpoint(2 * pair + 1).unwrap().try_clone_to_owned().unwrap();
            let read = pool.endpoint(2 * pair).unwrap().try_clone_to_owned().unwrap();

            let mut writer = File::from(write);
            writer.write_all(format!("pair {pair}").as_bytes()).unwrap();
            drop(writer);

            let mut buf = [0u8; 16];
            let n = File::from(read).read(&mut buf).unwrap();
            assert_eq!(&buf[..n], format!("pair {pair}").as_bytes());
        }
    }

    #[test]
    fn test_raw_out_of_range() {
        let pool = ChannelPool::allocate(2).unwrap();
        assert!(pool.raw(1).is_ok());
        match pool.raw(2) {
            Err(PipelineError::EndpointOutOfRange { index, available }) => {
                assert_eq!(index, 2);
                assert_eq!(available, 2);
            }
            other => panic!("expected out-of-range error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_pool() {
        let pool = ChannelPool::default();
        assert_eq!(pool.pair_count(), 0);
        assert!(pool.endpoint(0).is_none());
        assert_eq!(pool.raw_fds().count(), 0);
    }
}
