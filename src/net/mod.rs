//! Blocking TCP primitives for the connection supervisor.
//!
//! - [`tcp_listener`]: [`TcpListener`] binding and accepting a connection
//! - [`tcp_stream`]: [`TcpStream`] yielding the descriptor watchers share
//!
//! # Example
//!
//! ```ignore
//! use trigger_watch::net::tcp_listener::TcpListener;
//!
//! let listener = TcpListener::bind("127.0.0.1:8080")?;
//! let (stream, addr) = listener.accept()?;
//! let descriptor = stream.descriptor()?;
//! ```
//!
//! [`TcpListener`]: tcp_listener::TcpListener
//! [`TcpStream`]: tcp_stream::TcpStream

pub mod tcp_listener;
pub mod tcp_stream;
pub(crate) mod utils;
