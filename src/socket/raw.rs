use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use crate::addr::{ConnectionInfo, Family};
use crate::error::{NetError, Result, errno};
use crate::poll::{self, Interest};
use crate::socket::bound::BoundSocket;
use crate::socket::fd::{SocketFd, take_so_error};
use crate::socket::pending::PendingConnect;
use crate::socket::stream::ConnectedStream;
use crate::socket::{Protocol, SockType};

/// A socket that has been created but not yet bound or connected.
///
/// This is the starting point for all socket operations.
/// Use `.bind()` on the way to a listener or datagram socket.
/// Use `.connect()` to become a connected stream.
pub struct RawSocket {
    fd: SocketFd,
    family: Family,
    socktype: SockType,
    protocol: Protocol,
}

impl RawSocket {
    /// Creates a new socket via the `socket()` syscall.
    ///
    /// The socket is created with `SOCK_CLOEXEC` (close on exec). If any
    /// later setup step fails, the handle is released before the error
    /// propagates — construction never leaks a native handle.
    pub fn open(family: Family, socktype: SockType, protocol: Protocol) -> Result<Self> {
        let fd = unsafe { libc::socket(family.raw(), socktype.raw() | libc::SOCK_CLOEXEC, protocol.raw()) };
        if fd == -1 {
            return Err(NetError::os("socket"));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self {
            fd: SocketFd::from_owned(fd, false),
            family,
            socktype,
            protocol,
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn socktype(&self) -> SockType {
        self.socktype
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.fd.set_nonblocking(nonblocking)
    }

    pub fn nonblocking(&self) -> bool {
        self.fd.nonblocking()
    }

    /// Releases the handle. Idempotent; later operations report the
    /// closed error.
    pub fn close(&mut self) {
        self.fd.close();
    }

    pub fn is_closed(&self) -> bool {
        self.fd.is_closed()
    }

    /// Binds the socket to an address, consuming self.
    pub fn bind(self, info: &ConnectionInfo) -> Result<BoundSocket> {
        self.check_family(info)?;
        let fd = self.fd.raw()?;
        let rc = info.with_sockaddr(|ptr, len| unsafe { libc::bind(fd, ptr, len) });
        if rc == -1 {
            return Err(NetError::os("bind"));
        }
        Ok(BoundSocket::from_parts(self.fd, self.family, self.socktype))
    }

    /// Connects to a remote address, consuming self.
    ///
    /// With a finite timeout the handle is temporarily flipped
    /// non-blocking, writability is polled up to the deadline (surfacing
    /// the timeout kind on exhaustion), the final status is read from
    /// `SO_ERROR`, and the original mode is restored. EINTR during a
    /// blocking connect resolves through the same completion path — the
    /// kernel keeps the attempt going.
    pub fn connect(
        self,
        info: &ConnectionInfo,
        timeout: Option<Duration>,
    ) -> Result<ConnectedStream> {
        self.check_family(info)?;
        let fd = self.fd.raw()?;

        let restore_blocking = timeout.is_some() && !self.fd.nonblocking();
        if restore_blocking {
            self.fd.set_nonblocking(true)?;
        }

        let rc = info.with_sockaddr(|ptr, len| unsafe { libc::connect(fd, ptr, len) });
        if rc == -1 {
            let e = errno();
            match e {
                libc::EINPROGRESS | libc::EINTR => {
                    // self is dropped on every error path below, closing
                    // the half-constructed handle.
                    if !poll::wait(fd, Interest::Write, timeout)? {
                        return Err(NetError::os_code("connect", libc::ETIMEDOUT));
                    }
                    let status = take_so_error(fd)?;
                    if status != 0 {
                        return Err(NetError::os_code("connect", status));
                    }
                }
                _ => return Err(NetError::os_code("connect", e)),
            }
        }

        if restore_blocking {
            self.fd.set_nonblocking(false)?;
        }
        Ok(ConnectedStream::from_parts(self.fd, self.family))
    }

    /// Starts a non-blocking connection, consuming self.
    ///
    /// Flips the socket non-blocking and issues a single native connect.
    /// `EINPROGRESS` is the expected outcome; poll the returned
    /// [`PendingConnect`] for writability, then complete it.
    pub fn connect_nonblocking(self, info: &ConnectionInfo) -> Result<PendingConnect> {
        self.check_family(info)?;
        self.fd.set_nonblocking(true)?;
        let fd = self.fd.raw()?;

        let rc = info.with_sockaddr(|ptr, len| unsafe { libc::connect(fd, ptr, len) });
        if rc == 0 {
            // Immediate success (possible on loopback).
            return Ok(PendingConnect::from_parts(self.fd, self.family));
        }
        let e = errno();
        if e == libc::EINPROGRESS {
            Ok(PendingConnect::from_parts(self.fd, self.family))
        } else {
            Err(NetError::os_code("connect", e))
        }
    }

    pub(crate) fn into_fd(self) -> SocketFd {
        self.fd
    }

    fn check_family(&self, info: &ConnectionInfo) -> Result<()> {
        if info.family != self.family {
            return Err(NetError::InvalidAddress {
                reason: "address family does not match socket family",
            });
        }
        Ok(())
    }
}

impl std::os::fd::AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw_or_invalid()
    }
}
