//! Cooperative cancellation for blocked watchers.
//!
//! A watcher spends nearly all of its life inside an infinite
//! [`Poller::wait`](crate::Poller::wait). To tear it down, the token owns an
//! `eventfd` that every watcher registers (level-triggered) in its own
//! registry. [`CancellationToken::cancel`] raises the flag and makes the
//! eventfd readable, which wakes every wait at once; the counter is never
//! read back, so late waiters wake as well.

use crate::error::{Error, Result};

use libc::{EFD_CLOEXEC, EFD_NONBLOCK, close, eventfd, write};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    wake: RawFd,
}

impl CancellationToken {
    /// # Errors
    /// [`Error::RegistryCreate`] if the wake descriptor cannot be allocated.
    pub fn new() -> Result<Self> {
        let wake = unsafe { eventfd(0, EFD_CLOEXEC | EFD_NONBLOCK) };
        if wake < 0 {
            return Err(Error::RegistryCreate(io::Error::last_os_error()));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                wake,
            }),
        })
    }

    /// Requests every watcher holding this token to stop.
    ///
    /// Idempotent. Watchers notice at their next loop iteration.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        let one: u64 = 1;
        let ret = unsafe {
            write(
                self.inner.wake,
                (&one as *const u64).cast(),
                std::mem::size_of::<u64>(),
            )
        };

        if ret < 0 {
            tracing::warn!(
                error = %io::Error::last_os_error(),
                "failed to signal cancellation wake descriptor"
            );
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn wake_descriptor(&self) -> RawFd {
        self.inner.wake
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        unsafe {
            close(self.wake);
        }
    }
}
