//! Edge- versus level-triggered readiness watching over one TCP connection.
//!
//! This crate accepts a single connection and watches its descriptor with two
//! independent `epoll` instances at the same time, one edge-triggered and one
//! level-triggered, reporting every chunk of bytes each of them reads.
//!
//! # Architecture
//!
//! - **Poller**: readiness registry wrapping one `epoll` instance
//! - **Drain loop**: bounded reads into a 1024 byte buffer ([`reactor::io`])
//! - **Watcher**: one per trigger discipline, each on its own thread
//! - **Supervisor**: accepts the connection and launches both watchers
//! - **CancellationToken**: wakes and stops blocked watchers
//!
//! Both watchers read from the same kernel read cursor. Bytes are never
//! duplicated between them, but which watcher sees which bytes is not
//! deterministic.

mod builder;
mod cancel;
mod config;
mod error;
pub mod net;
pub mod reactor;
mod supervisor;
mod watcher;

pub use builder::SupervisorBuilder;
pub use cancel::CancellationToken;
pub use config::{Config, DEFAULT_ADDRESS};
pub use error::{Error, Result};
pub use reactor::descriptor::Descriptor;
pub use reactor::event::{Event, Events};
pub use reactor::interest::{Interest, Trigger};
pub use reactor::io::{
    ByteSource, RECEIVE_BUFFER_CAPACITY, ReadOutcome, drain_once, drain_to_exhaustion,
};
pub use reactor::poller::Poller;
pub use supervisor::{Connection, Session, SessionReport, Supervisor};
pub use watcher::{
    DEFAULT_MAX_EVENTS, DESCRIPTOR_TOKEN, Received, Watcher, WatcherExit, WatcherHandle,
    WatcherState,
};
