use crate::error::{Error, Result};
use crate::reactor::event::Event;
use crate::reactor::io::ByteSource;

use libc::{F_DUPFD_CLOEXEC, close, fcntl, read};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

/// An owned, non-blocking handle to a readable byte stream.
///
/// Both watchers hold the same `Descriptor` behind an `Arc`, so they share
/// one kernel read cursor: every byte is consumed by exactly one of them, in
/// no particular order. The descriptor is closed when the last owner drops it.
#[derive(Debug)]
pub struct Descriptor {
    file_descriptor: RawFd,
}

impl Descriptor {
    /// Duplicates `file_descriptor` into a new owned, non-blocking descriptor.
    ///
    /// The source descriptor is left untouched apart from the shared
    /// `O_NONBLOCK` status flag, which lives on the open file description.
    ///
    /// # Errors
    /// [`Error::DescriptorExtraction`] if the duplicate cannot be created or
    /// switched to non-blocking mode.
    pub fn duplicate(file_descriptor: RawFd) -> Result<Self> {
        let duplicate = unsafe { fcntl(file_descriptor, F_DUPFD_CLOEXEC, 0) };
        if duplicate < 0 {
            return Err(Error::DescriptorExtraction(io::Error::last_os_error()));
        }

        let descriptor = Self {
            file_descriptor: duplicate,
        };

        Event::set_nonblocking(duplicate).map_err(Error::DescriptorExtraction)?;

        Ok(descriptor)
    }
}

impl ByteSource for Descriptor {
    fn descriptor(&self) -> RawFd {
        self.file_descriptor
    }

    fn read_into(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let res = unsafe {
            read(
                self.file_descriptor,
                buffer.as_mut_ptr().cast(),
                buffer.len(),
            )
        };

        if res < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(res as usize)
    }
}

impl AsRawFd for Descriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.file_descriptor
    }
}

impl Drop for Descriptor {
    fn drop(&mut self) {
        unsafe {
            close(self.file_descriptor);
        }
    }
}
