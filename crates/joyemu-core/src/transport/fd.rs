//! File-descriptor transport for an already-connected HID channel.
//!
//! The interrupt channel is typically an L2CAP SEQPACKET socket accepted by
//! the pairing layer, so every `read` returns exactly one frame.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, instrument};

use super::traits::{ReportTransport, TransportError};

/// Owned descriptor transport. The descriptor is closed on drop.
pub struct FdTransport {
    file: File,
}

impl FdTransport {
    /// Take ownership of `fd`.
    pub fn from_owned(fd: OwnedFd) -> Self {
        Self {
            file: File::from(fd),
        }
    }

    /// Take ownership of an inherited raw descriptor.
    ///
    /// # Safety
    ///
    /// `fd` must be open and not owned by anything else in this process.
    pub unsafe fn from_raw_fd(fd: RawFd) -> Self {
        // SAFETY: upheld by the caller.
        Self::from_owned(unsafe { OwnedFd::from_raw_fd(fd) })
    }

    /// Open a device node (e.g. a character device bridged to the channel).
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path.as_ref())
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?;
        info!(fd = file.as_raw_fd(), "Channel opened");
        Ok(Self { file })
    }

    /// Switch the descriptor to non-blocking mode.
    pub fn set_nonblocking(&self) -> Result<(), TransportError> {
        let fd = self.file.as_raw_fd();
        // SAFETY: fcntl on a descriptor we own; no pointers involved.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error().into());
        }
        // SAFETY: as above.
        let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if rc < 0 {
            return Err(io::Error::last_os_error().into());
        }
        debug!(fd, "Descriptor set non-blocking");
        Ok(())
    }
}

impl ReportTransport for FdTransport {
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match (&self.file).read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(TransportError::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(TransportError::WouldBlock),
            Err(e) if matches!(e.raw_os_error(), Some(libc::ENOTCONN) | Some(libc::ECONNRESET)) => {
                Err(TransportError::Disconnected)
            }
            Err(e) => Err(TransportError::ReadFailed(e.to_string())),
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        (&self.file)
            .write(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    fn wait_readable(&self, timeout: Duration) -> Result<(), TransportError> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        // SAFETY: `pfd` is a valid pollfd for the duration of the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err.into());
            }
        }
        Ok(())
    }
}
