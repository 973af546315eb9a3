use crate::error::Result;
use crate::reactor::descriptor::Descriptor;

use libc::close;
use std::os::unix::io::{AsRawFd, RawFd};

/// An accepted TCP connection.
///
/// The stream itself is never read; watchers read through the
/// [`Descriptor`] obtained from [`Self::descriptor`].
#[derive(Debug)]
pub struct TcpStream {
    file_descriptor: RawFd,
}

impl TcpStream {
    pub(crate) fn new(file_descriptor: RawFd) -> Self {
        Self { file_descriptor }
    }

    /// Extracts an owned, non-blocking descriptor for this connection.
    ///
    /// The descriptor is a duplicate: it stays valid after the stream is
    /// dropped and shares the stream's read cursor.
    ///
    /// # Errors
    /// [`Error::DescriptorExtraction`](crate::Error::DescriptorExtraction)
    pub fn descriptor(&self) -> Result<Descriptor> {
        Descriptor::duplicate(self.file_descriptor)
    }
}

impl AsRawFd for TcpStream {
    fn as_raw_fd(&self) -> RawFd {
        self.file_descriptor
    }
}

impl Drop for TcpStream {
    fn drop(&mut self) {
        unsafe {
            close(self.file_descriptor);
        }
    }
}
