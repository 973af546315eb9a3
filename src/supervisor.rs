//! The connection supervisor.
//!
//! Accepts exactly one connection, extracts its descriptor and starts an
//! edge-triggered and a level-triggered [`Watcher`] on that same descriptor.
//!
//! # Example
//! ```ignore
//! let supervisor = Supervisor::builder().address("localhost:8080").build();
//!
//! let listener = supervisor.bind()?;
//! let connection = supervisor.accept_one(&listener)?;
//! let session = supervisor.launch(connection)?;
//!
//! session.serve(|received| println!("{received}"));
//! ```

use crate::builder::SupervisorBuilder;
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::Result;
use crate::net::tcp_listener::TcpListener;
use crate::net::tcp_stream::TcpStream;
use crate::reactor::descriptor::Descriptor;
use crate::reactor::interest::Trigger;
use crate::watcher::{Received, Watcher, WatcherExit, WatcherHandle};

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use tracing::info;

#[derive(Debug)]
pub struct Supervisor {
    config: Config,
}

impl Supervisor {
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    pub(crate) fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opens the listening endpoint at the configured address.
    ///
    /// # Errors
    /// [`Error::Listen`](crate::Error::Listen)
    pub fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(&self.config.address)?;
        info!(address = %listener.local_addr()?, "waiting for a connection");

        Ok(listener)
    }

    /// Accepts one connection and extracts the descriptor the watchers share.
    ///
    /// # Errors
    /// [`Error::Accept`](crate::Error::Accept) or
    /// [`Error::DescriptorExtraction`](crate::Error::DescriptorExtraction).
    pub fn accept_one(&self, listener: &TcpListener) -> Result<Connection> {
        let (stream, peer) = listener.accept()?;
        let descriptor = Arc::new(stream.descriptor()?);

        info!(%peer, "accepted connection");

        Ok(Connection {
            _stream: stream,
            peer,
            descriptor,
        })
    }

    /// Starts both watchers concurrently on the connection's descriptor.
    ///
    /// If the second watcher cannot start, the first one is cancelled and
    /// joined before the error is returned.
    pub fn launch(&self, connection: Connection) -> Result<Session> {
        let cancel = CancellationToken::new()?;
        let (sink, receiver) = mpsc::channel();

        let edge = Watcher::new(
            Trigger::Edge,
            Arc::clone(&connection.descriptor),
            sink.clone(),
            cancel.clone(),
        )
        .max_events(self.config.max_events)
        .spawn()?;

        let level = Watcher::new(
            Trigger::Level,
            Arc::clone(&connection.descriptor),
            sink,
            cancel.clone(),
        )
        .max_events(self.config.max_events)
        .spawn();

        let level = match level {
            Ok(level) => level,
            Err(err) => {
                cancel.cancel();
                let _ = edge.join();
                return Err(err);
            }
        };

        Ok(Session {
            connection,
            cancel,
            receiver,
            edge,
            level,
        })
    }

    /// Binds, accepts one connection and launches the watchers.
    pub fn run(&self) -> Result<Session> {
        let listener = self.bind()?;
        let connection = self.accept_one(&listener)?;

        self.launch(connection)
    }
}

/// The one accepted connection.
#[derive(Debug)]
pub struct Connection {
    _stream: TcpStream,
    peer: SocketAddr,
    descriptor: Arc<Descriptor>,
}

impl Connection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }
}

/// Both watchers running on one connection.
#[derive(Debug)]
pub struct Session {
    connection: Connection,
    cancel: CancellationToken,
    receiver: Receiver<Received>,
    edge: WatcherHandle,
    level: WatcherHandle,
}

/// How each watcher of a session ended.
#[derive(Debug)]
pub struct SessionReport {
    pub edge: Result<WatcherExit>,
    pub level: Result<WatcherExit>,
}

impl Session {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Chunks received by either watcher, in arrival order.
    pub fn receiver(&self) -> &Receiver<Received> {
        &self.receiver
    }

    /// A token that stops both watchers when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Hands every received chunk to `on_receive` until both watchers stop.
    ///
    /// Watchers stop on cancellation, on peer close, or on their own error.
    pub fn serve(self, mut on_receive: impl FnMut(Received)) -> SessionReport {
        for received in self.receiver.iter() {
            on_receive(received);
        }

        SessionReport {
            edge: self.edge.join(),
            level: self.level.join(),
        }
    }

    /// Cancels both watchers and waits for them to stop.
    pub fn shutdown(self) -> SessionReport {
        self.cancel.cancel();

        SessionReport {
            edge: self.edge.join(),
            level: self.level.join(),
        }
    }
}
