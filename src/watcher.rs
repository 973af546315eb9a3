//! Edge- and level-triggered watchers over a shared descriptor.
//!
//! A [`Watcher`] owns one [`Poller`], registers the shared descriptor under
//! its [`Trigger`] and turns every wakeup into drain-loop reads:
//!
//! - **Edge**: reads until the descriptor would block. A notification can
//!   stand for more bytes than one buffer holds, and the kernel will not
//!   announce bytes that were queued before the last notification.
//! - **Level**: one read per event. Leftover bytes keep the descriptor ready,
//!   so the next wait reports it again.
//!
//! Every chunk read is pushed to the sink as a [`Received`] value. A watcher
//! that fails reports the error and stops; its sibling keeps running.
//!
//! Two watchers on the same descriptor race for the same kernel read cursor.
//! Bytes are never duplicated between them but may be split arbitrarily.

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::reactor::event::Events;
use crate::reactor::interest::{Interest, Trigger};
use crate::reactor::io::{
    ByteSource, RECEIVE_BUFFER_CAPACITY, ReadOutcome, drain_once, drain_to_exhaustion,
};
use crate::reactor::poller::Poller;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, trace};

/// Token of the watched descriptor inside a watcher's registry.
pub const DESCRIPTOR_TOKEN: usize = 0;
/// Token of the cancellation wake descriptor.
const WAKE_TOKEN: usize = 1;

/// Default number of events collected per wait.
pub const DEFAULT_MAX_EVENTS: usize = 10;

/// Lifecycle of a watcher.
///
/// `Created → Registered → { WaitingForEvents ⇄ Draining } → Terminated`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherState {
    Created,
    Registered,
    WaitingForEvents,
    Draining,
    Terminated,
}

/// Why a watcher stopped without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherExit {
    /// The cancellation token fired, or nobody listens to the sink anymore.
    Cancelled,
    /// A read returned end of stream.
    PeerClosed,
}

/// Bytes one watcher pulled off the descriptor in a single read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Received {
    pub trigger: Trigger,
    pub bytes: Vec<u8>,
}

impl Received {
    /// The bytes as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl fmt::Display for Received {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Mode: Received: {}", self.trigger, self.text())
    }
}

pub struct Watcher<S> {
    trigger: Trigger,
    source: Arc<S>,
    sink: Sender<Received>,
    cancel: CancellationToken,
    max_events: usize,
    state: WatcherState,
}

impl<S> Watcher<S>
where
    S: ByteSource + 'static,
{
    /// Creates a watcher. Nothing touches the OS until [`run`](Self::run).
    ///
    /// # Arguments
    /// * `trigger` - Notification discipline to register with
    /// * `source` - The shared descriptor to drain
    /// * `sink` - Where received chunks are delivered
    /// * `cancel` - Token that stops the loop between iterations
    pub fn new(
        trigger: Trigger,
        source: Arc<S>,
        sink: Sender<Received>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            trigger,
            source,
            sink,
            cancel,
            max_events: DEFAULT_MAX_EVENTS,
            state: WatcherState::Created,
        }
    }

    /// Sets how many events one wait may return.
    pub fn max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events.max(1);
        self
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Runs the watcher on its own named thread.
    ///
    /// # Errors
    /// [`Error::Spawn`] if the thread cannot be started.
    pub fn spawn(self) -> Result<WatcherHandle> {
        let trigger = self.trigger;

        let thread = thread::Builder::new()
            .name(trigger.thread_name().to_owned())
            .spawn(move || self.run())
            .map_err(Error::Spawn)?;

        Ok(WatcherHandle { trigger, thread })
    }

    /// Runs the wait/drain loop on the calling thread until it stops.
    ///
    /// Errors are logged here, once, before being returned.
    pub fn run(mut self) -> Result<WatcherExit> {
        let result = self.run_loop();

        self.transition(WatcherState::Terminated);

        match &result {
            Ok(exit) => info!(mode = %self.trigger, ?exit, "watcher stopped"),
            Err(err) => error!(mode = %self.trigger, "{err}"),
        }

        result
    }

    fn run_loop(&mut self) -> Result<WatcherExit> {
        let poller = Poller::new()?;

        poller.register(
            self.source.descriptor(),
            DESCRIPTOR_TOKEN,
            Interest::READABLE,
            self.trigger,
        )?;
        poller.register(
            self.cancel.wake_descriptor(),
            WAKE_TOKEN,
            Interest::READABLE,
            Trigger::Level,
        )?;

        self.transition(WatcherState::Registered);

        let mut events = Events::with_capacity(self.max_events);

        loop {
            if self.cancel.is_cancelled() {
                return Ok(WatcherExit::Cancelled);
            }

            self.transition(WatcherState::WaitingForEvents);
            let n_events = poller.wait(&mut events, None)?;
            trace!(mode = %self.trigger, n_events, "woke up");

            for event in &events {
                if event.token() != DESCRIPTOR_TOKEN {
                    continue;
                }

                // Hang-up and error arrive without EPOLLIN on some descriptors;
                // the read turns them into `Closed` or `Error::Read`.
                if !(event.is_readable() || event.is_hangup() || event.is_error()) {
                    continue;
                }

                self.transition(WatcherState::Draining);

                if let Some(exit) = self.drain()? {
                    return Ok(exit);
                }
            }
        }
    }

    /// Reads according to the trigger discipline. `Some` means stop.
    fn drain(&self) -> Result<Option<WatcherExit>> {
        let outcome = match self.trigger {
            Trigger::Edge => {
                let mut sink_open = true;
                let mut total = 0usize;

                let outcome = drain_to_exhaustion(&*self.source, |chunk| {
                    total += chunk.len();
                    sink_open = self.deliver(chunk);
                    sink_open
                })?;

                debug!(mode = %self.trigger, bytes = total, "drained to exhaustion");

                if !sink_open {
                    return Ok(Some(WatcherExit::Cancelled));
                }

                outcome
            }
            Trigger::Level => {
                let mut buffer = [0u8; RECEIVE_BUFFER_CAPACITY];
                let outcome = drain_once(&*self.source, &mut buffer)?;

                if let ReadOutcome::Data(n) = outcome {
                    debug!(mode = %self.trigger, bytes = n, "drained once");

                    if !self.deliver(&buffer[..n]) {
                        return Ok(Some(WatcherExit::Cancelled));
                    }
                }

                outcome
            }
        };

        match outcome {
            ReadOutcome::Closed => Ok(Some(WatcherExit::PeerClosed)),
            // The sibling watcher may have taken the bytes first.
            ReadOutcome::WouldBlock | ReadOutcome::Data(_) => Ok(None),
        }
    }

    fn deliver(&self, chunk: &[u8]) -> bool {
        let received = Received {
            trigger: self.trigger,
            bytes: chunk.to_vec(),
        };

        debug!(mode = %self.trigger, "{received}");

        self.sink.send(received).is_ok()
    }

    fn transition(&mut self, next: WatcherState) {
        if self.state != next {
            trace!(mode = %self.trigger, from = ?self.state, to = ?next, "state change");
            self.state = next;
        }
    }
}

impl<S> fmt::Debug for Watcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("trigger", &self.trigger)
            .field("max_events", &self.max_events)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Handle to a watcher running on its own thread.
#[derive(Debug)]
pub struct WatcherHandle {
    trigger: Trigger,
    thread: JoinHandle<Result<WatcherExit>>,
}

impl WatcherHandle {
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the watcher to stop and returns how it ended.
    ///
    /// A panic on the watcher thread is propagated to the caller.
    pub fn join(self) -> Result<WatcherExit> {
        self.thread
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    }
}
