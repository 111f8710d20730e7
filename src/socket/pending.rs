use std::os::fd::RawFd;
use std::time::Duration;

use crate::addr::Family;
use crate::error::{NetError, Result};
use crate::poll::{self, Interest};
use crate::socket::fd::{SocketFd, take_so_error};
use crate::socket::stream::ConnectedStream;

/// A non-blocking connect in flight.
///
/// Poll the fd for writability, then check `take_error()`; if it returns
/// `None` the connection is established and `finish()` yields the stream.
pub struct PendingConnect {
    fd: SocketFd,
    family: Family,
}

impl PendingConnect {
    pub(crate) fn from_parts(fd: SocketFd, family: Family) -> Self {
        Self { fd, family }
    }

    /// Reads and clears the socket error status.
    ///
    /// Returns `None` if the connect succeeded, `Some(error)` if it
    /// failed. Reading clears the status — call once per readiness
    /// notification.
    pub fn take_error(&self) -> Result<Option<NetError>> {
        let status = take_so_error(self.fd.raw()?)?;
        if status == 0 {
            Ok(None)
        } else {
            Ok(Some(NetError::os_code("connect", status)))
        }
    }

    /// Completes the connection after readiness has been verified.
    pub fn finish(self) -> ConnectedStream {
        ConnectedStream::from_parts(self.fd, self.family)
    }

    /// Convenience completion: polls for writability up to `timeout`,
    /// surfaces the timeout kind on exhaustion, then checks the final
    /// status and finishes.
    pub fn wait(self, timeout: Option<Duration>) -> Result<ConnectedStream> {
        let fd = self.fd.raw()?;
        if !poll::wait(fd, Interest::Write, timeout)? {
            return Err(NetError::os_code("connect", libc::ETIMEDOUT));
        }
        if let Some(err) = self.take_error()? {
            return Err(err);
        }
        Ok(self.finish())
    }

    pub fn close(&mut self) {
        self.fd.close();
    }
}

impl std::os::fd::AsRawFd for PendingConnect {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw_or_invalid()
    }
}
