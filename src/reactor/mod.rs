//! Readiness multiplexing and the drain loop.
//!
//! This module wraps Linux `epoll` and the reads performed on wakeup:
//! - [`poller`]: the readiness registry (one kernel instance per owner)
//! - [`event`]: `epoll_event` wrapper and the per-wait event buffer
//! - [`interest`]: interest masks and the edge/level trigger discipline
//! - [`descriptor`]: owned non-blocking stream descriptor
//! - [`io`]: the drain loop

pub mod descriptor;
pub mod event;
pub mod interest;
pub mod io;
pub mod poller;
