//! Error type shared by the registry, drain loop, watchers and supervisor.
//!
//! Every variant carries the underlying [`io::Error`] so the OS cause is never
//! lost. The display form is the single diagnostic line reported when a
//! watcher or the supervisor gives up: `Error <doing X>: <cause>`.

use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The OS could not allocate a readiness registry (or its wake descriptor).
    #[error("Error creating epoll: {0}")]
    RegistryCreate(#[source] io::Error),

    /// `EPOLL_CTL_ADD` / `EPOLL_CTL_DEL` was refused, e.g. a duplicate entry.
    #[error("Error adding fd to epoll: {0}")]
    Registration(#[source] io::Error),

    #[error("Error in epoll wait: {0}")]
    Wait(#[source] io::Error),

    #[error("Error reading from connection: {0}")]
    Read(#[source] io::Error),

    #[error("Error starting server: {0}")]
    Listen(#[source] io::Error),

    #[error("Error accepting connection: {0}")]
    Accept(#[source] io::Error),

    #[error("Error getting descriptor from TCP connection: {0}")]
    DescriptorExtraction(#[source] io::Error),

    #[error("Error starting watcher thread: {0}")]
    Spawn(#[source] io::Error),
}

impl Error {
    /// Whether the failure leaves the process with nothing to serve.
    ///
    /// Only listener and accept failures qualify; every other error ends the
    /// execution context that hit it and nothing more.
    pub fn is_fatal_to_process(&self) -> bool {
        matches!(self, Error::Listen(_) | Error::Accept(_))
    }

    /// The OS error behind this failure.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Error::RegistryCreate(error)
            | Error::Registration(error)
            | Error::Wait(error)
            | Error::Read(error)
            | Error::Listen(error)
            | Error::Accept(error)
            | Error::DescriptorExtraction(error)
            | Error::Spawn(error) => error,
        }
    }
}
