use libc::{
    EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLRDHUP, F_GETFL, F_SETFL, O_NONBLOCK, epoll_event,
    fcntl,
};
use std::io;
use std::os::unix::io::RawFd;

/// A single readiness event, layout-compatible with `epoll_event`.
///
/// The token is the value passed at registration time and comes back
/// unchanged in every event the registration produces.
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct Event(epoll_event);

impl Event {
    pub(crate) const EMPTY: Self = Self(epoll_event { events: 0, u64: 0 });

    pub(crate) fn new(events: u32, token: usize) -> Self {
        Self(epoll_event {
            events,
            u64: token as u64,
        })
    }

    pub fn token(&self) -> usize {
        // Copy out of the (packed on x86_64) struct before use.
        let token = self.0.u64;
        token as usize
    }

    fn bits(&self) -> u32 {
        self.0.events
    }

    pub fn is_readable(&self) -> bool {
        self.bits() & (EPOLLIN as u32) != 0
    }

    /// Peer hung up, either fully or its write half.
    pub fn is_hangup(&self) -> bool {
        self.bits() & ((EPOLLHUP | EPOLLRDHUP) as u32) != 0
    }

    pub fn is_error(&self) -> bool {
        self.bits() & (EPOLLERR as u32) != 0
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut epoll_event {
        &mut self.0
    }

    pub(crate) fn set_nonblocking(file_descriptor: RawFd) -> io::Result<()> {
        let flags = unsafe { fcntl(file_descriptor, F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }

        let ret = unsafe { fcntl(file_descriptor, F_SETFL, flags | O_NONBLOCK) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("token", &self.token())
            .field("readable", &self.is_readable())
            .field("hangup", &self.is_hangup())
            .field("error", &self.is_error())
            .finish()
    }
}

/// Fixed-capacity buffer filled by one [`Poller::wait`](super::poller::Poller::wait) call.
///
/// Only the events of the most recent wait are visible; the next wait
/// overwrites them.
pub struct Events {
    buffer: Vec<Event>,
    len: usize,
}

impl Events {
    /// Creates a buffer able to hold `capacity` events per wait (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![Event::EMPTY; capacity.max(1)],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.buffer[..self.len].iter()
    }

    pub(crate) fn raw_parts(&mut self) -> (*mut epoll_event, usize) {
        (self.buffer.as_mut_ptr().cast::<epoll_event>(), self.buffer.len())
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len.min(self.buffer.len());
    }
}

impl<'a> IntoIterator for &'a Events {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
