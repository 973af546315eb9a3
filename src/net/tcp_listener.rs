//! TCP listener for the single inbound connection.
//!
//! # Usage
//!
//! ```ignore
//! use trigger_watch::net::tcp_listener::TcpListener;
//!
//! let listener = TcpListener::bind("localhost:8080")?;
//! println!("Listening on {}", listener.local_addr()?);
//!
//! let (stream, peer_addr) = listener.accept()?;
//! println!("New connection from {}", peer_addr);
//! ```
use crate::error::{Error, Result};
use crate::net::tcp_stream::TcpStream;
use crate::net::utils::{resolve_sockaddr, sockaddr_to_socketaddr};

use libc::{
    AF_INET, SO_REUSEADDR, SOCK_CLOEXEC, SOCK_STREAM, SOL_SOCKET, accept4, bind, c_int, close,
    getsockname, listen, setsockopt, sockaddr, sockaddr_in, socket, socklen_t,
};
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::os::unix::io::{AsRawFd, RawFd};

const BACKLOG: c_int = 128;

/// A blocking TCP listener.
///
/// # Example
///
/// ```ignore
/// let listener = TcpListener::bind("127.0.0.1:0")?;
/// let (stream, addr) = listener.accept()?;
/// println!("Connection from {}", addr);
/// ```
#[derive(Debug)]
pub struct TcpListener {
    file_descriptor: RawFd,
}

impl TcpListener {
    /// Binds a listener to the given address.
    ///
    /// This method performs the following:
    /// 1. Resolves the address to its first IPv4 form
    /// 2. Creates a new socket with `SO_REUSEADDR`
    /// 3. Binds to the resolved address
    /// 4. Starts listening with a backlog of 128
    ///
    /// # Arguments
    /// * `address` - Address to bind to, format: \"host:port\" (e.g., \"localhost:8080\")
    ///
    /// # Errors
    /// [`Error::Listen`] if any of the steps fails.
    pub fn bind(address: &str) -> Result<Self> {
        let addr = resolve_sockaddr(address).map_err(Error::Listen)?;

        let file_descriptor = unsafe { socket(AF_INET, SOCK_STREAM | SOCK_CLOEXEC, 0) };
        if file_descriptor < 0 {
            return Err(Error::Listen(io::Error::last_os_error()));
        }

        // Closes the socket on every early return below.
        let listener = Self { file_descriptor };

        let enable: c_int = 1;
        let ret = unsafe {
            setsockopt(
                file_descriptor,
                SOL_SOCKET,
                SO_REUSEADDR,
                (&enable as *const c_int).cast(),
                mem::size_of::<c_int>() as socklen_t,
            )
        };

        if ret < 0 {
            return Err(Error::Listen(io::Error::last_os_error()));
        }

        let ret = unsafe {
            bind(
                file_descriptor,
                (&addr as *const sockaddr_in).cast::<sockaddr>(),
                mem::size_of::<sockaddr_in>() as socklen_t,
            )
        };

        if ret < 0 {
            return Err(Error::Listen(io::Error::last_os_error()));
        }

        let ret = unsafe { listen(file_descriptor, BACKLOG) };
        if ret < 0 {
            return Err(Error::Listen(io::Error::last_os_error()));
        }

        tracing::debug!(%address, fd = file_descriptor, "listening");

        Ok(listener)
    }

    /// Blocks until a client connects.
    ///
    /// # Returns
    /// A tuple of:
    /// - [`TcpStream`]: The accepted connection
    /// - [`SocketAddr`]: The peer's address
    ///
    /// # Errors
    /// [`Error::Accept`]; interrupted accepts are retried.
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        loop {
            let mut addr: sockaddr_in = unsafe { mem::zeroed() };
            let mut length = mem::size_of::<sockaddr_in>() as socklen_t;

            let client_file_descriptor = unsafe {
                accept4(
                    self.file_descriptor,
                    (&mut addr as *mut sockaddr_in).cast::<sockaddr>(),
                    &mut length,
                    SOCK_CLOEXEC,
                )
            };

            if client_file_descriptor < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }

                return Err(Error::Accept(err));
            }

            return Ok((
                TcpStream::new(client_file_descriptor),
                sockaddr_to_socketaddr(&addr),
            ));
        }
    }

    /// Returns the local address this listener is bound to.
    ///
    /// Useful after binding to port `0`.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let mut addr: sockaddr_in = unsafe { mem::zeroed() };
        let mut length = mem::size_of::<sockaddr_in>() as socklen_t;
        let result = unsafe {
            getsockname(
                self.file_descriptor,
                (&mut addr as *mut sockaddr_in).cast::<sockaddr>(),
                &mut length,
            )
        };

        if result < 0 {
            return Err(Error::Listen(io::Error::last_os_error()));
        }

        Ok(sockaddr_to_socketaddr(&addr))
    }
}

impl AsRawFd for TcpListener {
    fn as_raw_fd(&self) -> RawFd {
        self.file_descriptor
    }
}

impl Drop for TcpListener {
    fn drop(&mut self) {
        unsafe {
            close(self.file_descriptor);
        }
    }
}
