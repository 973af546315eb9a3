//! The drain loop: bounded reads from a ready descriptor.
//!
//! Every read goes into a fresh [`RECEIVE_BUFFER_CAPACITY`] byte buffer that
//! lives for one pass only. Level-triggered consumers call [`drain_once`] per
//! event and rely on the kernel to report leftovers on the next wait.
//! Edge-triggered consumers must use [`drain_to_exhaustion`], since bytes
//! queued before the last notification are never announced again.

use crate::error::{Error, Result};

use std::io;
use std::os::unix::io::RawFd;

/// Capacity of the per-read scratch buffer.
pub const RECEIVE_BUFFER_CAPACITY: usize = 1024;

/// What a single read attempt produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were copied into the front of the buffer.
    Data(usize),
    /// Nothing is queued right now (`EAGAIN`/`EWOULDBLOCK`).
    WouldBlock,
    /// The peer closed its write half; no more bytes will arrive.
    Closed,
}

/// A readable stream the drain loop pulls bytes from.
///
/// [`Descriptor`](crate::Descriptor) is the production implementation.
pub trait ByteSource: Send + Sync {
    /// The descriptor to register with a readiness registry.
    fn descriptor(&self) -> RawFd;

    /// Reads at most `buffer.len()` bytes, `read(2)` style.
    fn read_into(&self, buffer: &mut [u8]) -> io::Result<usize>;
}

/// Performs one read into `buffer`.
///
/// Reads interrupted by a signal are retried.
///
/// # Errors
/// [`Error::Read`] for any failure other than would-block or interruption.
pub fn drain_once<S: ByteSource + ?Sized>(
    source: &S,
    buffer: &mut [u8; RECEIVE_BUFFER_CAPACITY],
) -> Result<ReadOutcome> {
    loop {
        match source.read_into(&mut buffer[..]) {
            Ok(0) => return Ok(ReadOutcome::Closed),
            Ok(n) => return Ok(ReadOutcome::Data(n)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                return Ok(ReadOutcome::WouldBlock);
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(Error::Read(error)),
        }
    }
}

/// Reads until the source would block or reports end of stream.
///
/// Each chunk is handed to `on_chunk` as soon as it is read. The returned
/// outcome is the one that stopped the loop: [`ReadOutcome::WouldBlock`] or
/// [`ReadOutcome::Closed`]. If `on_chunk` returns `false` the loop stops early
/// and reports [`ReadOutcome::WouldBlock`].
pub fn drain_to_exhaustion<S, F>(source: &S, mut on_chunk: F) -> Result<ReadOutcome>
where
    S: ByteSource + ?Sized,
    F: FnMut(&[u8]) -> bool,
{
    loop {
        let mut buffer = [0u8; RECEIVE_BUFFER_CAPACITY];

        match drain_once(source, &mut buffer)? {
            ReadOutcome::Data(n) => {
                if !on_chunk(&buffer[..n]) {
                    return Ok(ReadOutcome::WouldBlock);
                }
            }
            outcome => return Ok(outcome),
        }
    }
}
