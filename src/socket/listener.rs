use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use crate::addr::{ConnectionInfo, Family};
use crate::error::{NetError, Result, errno};
use crate::socket::bound::local_addr_of;
use crate::socket::fd::SocketFd;
use crate::socket::stream::ConnectedStream;
use crate::socket::SockType;

/// A listening socket ready to accept connections.
pub struct Listener {
    fd: SocketFd,
    family: Family,
}

/// Outcome of one accept attempt.
///
/// This is a syscall probe result, not socket state: the listener stays a
/// listener either way.
pub enum AcceptResult {
    /// A connection was accepted. On a non-blocking listener the child is
    /// connected but read/write readiness is not guaranteed.
    Connection(ConnectedStream, ConnectionInfo),

    /// No pending connection right now. Only reported by non-blocking
    /// listeners; wait for readiness and retry.
    WouldBlock,
}

impl Listener {
    pub(crate) fn from_parts(fd: SocketFd, family: Family) -> Self {
        Self { fd, family }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Accepts one connection, returning the client's address.
    ///
    /// On a blocking listener this waits in the kernel and always yields
    /// `Connection`. On a non-blocking listener an empty queue yields
    /// `WouldBlock` instead of an error. EINTR is retried transparently.
    ///
    /// The accepted child inherits this listener's non-blocking flag.
    pub fn accept(&self) -> Result<AcceptResult> {
        let listener_fd = self.fd.raw()?;
        let child_nonblocking = self.fd.nonblocking();
        let flags = if child_nonblocking {
            libc::SOCK_CLOEXEC | libc::SOCK_NONBLOCK
        } else {
            libc::SOCK_CLOEXEC
        };

        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len;

        let fd = loop {
            len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
            let fd = unsafe {
                libc::accept4(
                    listener_fd,
                    &mut storage as *mut _ as *mut libc::sockaddr,
                    &mut len,
                    flags,
                )
            };
            if fd != -1 {
                break fd;
            }
            match errno() {
                libc::EINTR => continue,
                libc::EAGAIN => return Ok(AcceptResult::WouldBlock),
                _ => return Err(NetError::os("accept")),
            }
        };

        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        let stream =
            ConnectedStream::from_parts(SocketFd::from_owned(fd, child_nonblocking), self.family);

        let addr = unsafe {
            ConnectionInfo::from_sockaddr(
                &storage as *const _ as *const libc::sockaddr,
                len,
                SockType::Stream,
                crate::socket::Protocol::Tcp,
            )
        }
        .ok_or(NetError::InvalidAddress {
            reason: "invalid client address",
        })?;

        Ok(AcceptResult::Connection(stream, addr))
    }

    /// The locally bound address — useful after binding port 0.
    pub fn local_addr(&self) -> Result<ConnectionInfo> {
        local_addr_of(self.fd.raw()?, SockType::Stream)
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.fd.set_nonblocking(nonblocking)
    }

    pub fn nonblocking(&self) -> bool {
        self.fd.nonblocking()
    }

    /// Releases the handle. Idempotent; later accepts report the closed
    /// error.
    pub fn close(&mut self) {
        self.fd.close();
    }

    pub fn is_closed(&self) -> bool {
        self.fd.is_closed()
    }
}

impl std::os::fd::AsRawFd for Listener {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw_or_invalid()
    }
}
