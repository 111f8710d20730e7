use std::cell::Cell;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use crate::error::{NetError, Result};

/// Reads and clears the pending socket error (`SO_ERROR`).
///
/// Zero means the last asynchronous operation succeeded. Reading clears
/// the status, so call it once per completion.
pub(crate) fn take_so_error(fd: RawFd) -> Result<i32> {
    let mut error: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let result = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            &mut error as *mut _ as *mut libc::c_void,
            &mut len,
        )
    };
    if result == -1 {
        return Err(NetError::os("getsockopt(SO_ERROR)"));
    }
    Ok(error)
}

/// The one native handle a socket owns, plus the two runtime flags the
/// lifecycle needs: the non-blocking mode and the sticky closed flag.
///
/// `close()` takes the fd out and drops it; repeated calls are no-ops and
/// every later access reports [`NetError::Closed`]. Single-owner by
/// construction — no internal locking, callers serialize access.
#[derive(Debug)]
pub(crate) struct SocketFd {
    fd: Option<OwnedFd>,
    nonblocking: Cell<bool>,
}

impl SocketFd {
    pub(crate) fn from_owned(fd: OwnedFd, nonblocking: bool) -> Self {
        Self {
            fd: Some(fd),
            nonblocking: Cell::new(nonblocking),
        }
    }

    /// The raw fd, or the closed error once `close()` has run.
    #[inline]
    pub(crate) fn raw(&self) -> Result<RawFd> {
        match &self.fd {
            Some(fd) => Ok(fd.as_raw_fd()),
            None => Err(NetError::Closed),
        }
    }

    /// The raw fd for trait impls that cannot fail; -1 after close.
    #[inline]
    pub(crate) fn raw_or_invalid(&self) -> RawFd {
        self.fd.as_ref().map(|fd| fd.as_raw_fd()).unwrap_or(-1)
    }

    /// Releases the handle. Idempotent: the first call closes, later
    /// calls do nothing.
    pub(crate) fn close(&mut self) {
        drop(self.fd.take());
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    pub(crate) fn nonblocking(&self) -> bool {
        self.nonblocking.get()
    }

    /// Flips `O_NONBLOCK` on the handle and records the new mode.
    pub(crate) fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        let fd = self.raw()?;
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags == -1 {
            return Err(NetError::os("fcntl(F_GETFL)"));
        }
        let new_flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        let result = unsafe { libc::fcntl(fd, libc::F_SETFL, new_flags) };
        if result == -1 {
            return Err(NetError::os("fcntl(F_SETFL)"));
        }
        self.nonblocking.set(nonblocking);
        Ok(())
    }
}
