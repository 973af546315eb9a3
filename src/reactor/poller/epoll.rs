use crate::error::{Error, Result};
use crate::reactor::event::{Event, Events};
use crate::reactor::interest::{Interest, Trigger};

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, close, epoll_create1, epoll_ctl, epoll_wait,
};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr;
use std::time::Duration;

/// An owned `epoll` instance.
///
/// A descriptor can be registered at most once per poller; a second
/// [`register`](Self::register) for the same descriptor fails with
/// [`Error::Registration`] (`EEXIST`).
///
/// # Example
/// ```ignore
/// let poller = Poller::new()?;
/// poller.register(fd, 0, Interest::READABLE, Trigger::Edge)?;
///
/// let mut events = Events::with_capacity(10);
/// poller.wait(&mut events, None)?;
/// for event in &events {
///     assert_eq!(event.token(), 0);
/// }
/// ```
#[derive(Debug)]
pub struct Poller {
    epoll: RawFd,
}

impl Poller {
    /// Allocates a new kernel instance.
    ///
    /// # Errors
    /// [`Error::RegistryCreate`] when the OS refuses, typically `EMFILE`/`ENOMEM`.
    pub fn new() -> Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(Error::RegistryCreate(io::Error::last_os_error()));
        }

        tracing::trace!(epoll, "created readiness registry");

        Ok(Self { epoll })
    }

    /// Starts monitoring `file_descriptor` for `interest` under `trigger`.
    ///
    /// `token` is echoed back in every [`Event`] produced for this entry.
    pub fn register(
        &self,
        file_descriptor: RawFd,
        token: usize,
        interest: Interest,
        trigger: Trigger,
    ) -> Result<()> {
        let mut event = Event::new(interest.to_epoll(trigger), token);

        let ret = unsafe {
            epoll_ctl(
                self.epoll,
                EPOLL_CTL_ADD,
                file_descriptor,
                event.as_mut_ptr(),
            )
        };
        if ret < 0 {
            return Err(Error::Registration(io::Error::last_os_error()));
        }

        tracing::debug!(
            epoll = self.epoll,
            fd = file_descriptor,
            token,
            %trigger,
            "registered descriptor"
        );

        Ok(())
    }

    /// Stops monitoring `file_descriptor`.
    pub fn deregister(&self, file_descriptor: RawFd) -> Result<()> {
        let ret =
            unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, file_descriptor, ptr::null_mut()) };
        if ret < 0 {
            return Err(Error::Registration(io::Error::last_os_error()));
        }

        Ok(())
    }

    /// Blocks until at least one registered descriptor is ready.
    ///
    /// `None` waits forever; `Some(Duration::ZERO)` only polls. The ready
    /// events overwrite the contents of `events` and the count is returned.
    ///
    /// # Errors
    /// [`Error::Wait`], including when the wait is interrupted by a signal
    /// (`EINTR`). The caller decides whether that is worth another wait.
    pub fn wait(&self, events: &mut Events, timeout: Option<Duration>) -> Result<usize> {
        let timeout_ms = match timeout {
            None => -1,
            // Round up so a sub-millisecond wait does not become a busy poll.
            Some(duration) => duration
                .as_nanos()
                .div_ceil(1_000_000)
                .min(i32::MAX as u128) as i32,
        };

        let (buffer, capacity) = events.raw_parts();
        let capacity = capacity.min(i32::MAX as usize) as i32;

        let n_events = unsafe { epoll_wait(self.epoll, buffer, capacity, timeout_ms) };
        if n_events < 0 {
            events.set_len(0);
            return Err(Error::Wait(io::Error::last_os_error()));
        }

        events.set_len(n_events as usize);

        Ok(n_events as usize)
    }
}

impl AsRawFd for Poller {
    fn as_raw_fd(&self) -> RawFd {
        self.epoll
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        unsafe {
            close(self.epoll);
        }
    }
}
