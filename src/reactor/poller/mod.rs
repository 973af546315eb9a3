//! Readiness registry backends.
//!
//! Only Linux `epoll` is provided; the registry owns one kernel instance and
//! is never shared between watchers.

mod epoll;

pub use epoll::Poller;
