use libc::{EPOLLET, EPOLLIN, EPOLLRDHUP};
use std::fmt;

/// Readiness a registration asks the kernel to report.
///
/// Only read readiness (including peer hang-up) is ever watched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
}

impl Interest {
    pub const READABLE: Self = Self { read: true };

    pub(crate) fn to_epoll(self, trigger: Trigger) -> u32 {
        let mut bits = 0u32;

        if self.read {
            bits |= (EPOLLIN | EPOLLRDHUP) as u32;
        }

        if trigger == Trigger::Edge {
            bits |= EPOLLET as u32;
        }

        bits
    }
}

/// Notification discipline of a registration.
///
/// - [`Trigger::Edge`]: the kernel reports only the transition to ready. The
///   consumer must read until the descriptor would block, otherwise bytes that
///   were already queued are not announced again.
/// - [`Trigger::Level`]: the kernel reports readiness on every wait while the
///   condition holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    Edge,
    Level,
}

impl Trigger {
    /// Human readable name used in receive lines, e.g. `Edge Triggered`.
    pub fn label(self) -> &'static str {
        match self {
            Trigger::Edge => "Edge Triggered",
            Trigger::Level => "Level Triggered",
        }
    }

    pub(crate) fn thread_name(self) -> &'static str {
        match self {
            Trigger::Edge => "edge-watcher",
            Trigger::Level => "level-watcher",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
