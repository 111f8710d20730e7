use std::os::fd::RawFd;

use crate::addr::{ConnectionInfo, Family};
use crate::error::{NetError, Result};
use crate::socket::fd::SocketFd;
use crate::socket::listener::Listener;
use crate::socket::{Protocol, SockType};

/// A socket that has been bound to an address but not yet listening.
///
/// For stream sockets: call `.listen()` to become a [`Listener`].
pub struct BoundSocket {
    fd: SocketFd,
    family: Family,
    socktype: SockType,
}

impl BoundSocket {
    pub(crate) fn from_parts(fd: SocketFd, family: Family, socktype: SockType) -> Self {
        Self {
            fd,
            family,
            socktype,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// The locally bound address — useful after binding port 0.
    pub fn local_addr(&self) -> Result<ConnectionInfo> {
        local_addr_of(self.fd.raw()?, self.socktype)
    }

    /// Transitions to a listening socket.
    ///
    /// `backlog` is the pending-connection queue size. Consumes self;
    /// only stream sockets can listen.
    pub fn listen(self, backlog: i32) -> Result<Listener> {
        if self.socktype != SockType::Stream {
            return Err(NetError::InvalidAddress {
                reason: "only stream sockets can listen",
            });
        }
        let fd = self.fd.raw()?;
        let result = unsafe { libc::listen(fd, backlog) };
        if result == -1 {
            return Err(NetError::os("listen"));
        }
        Ok(Listener::from_parts(self.fd, self.family))
    }

    pub fn close(&mut self) {
        self.fd.close();
    }

    pub fn is_closed(&self) -> bool {
        self.fd.is_closed()
    }

    pub(crate) fn into_fd(self) -> SocketFd {
        self.fd
    }
}

impl std::os::fd::AsRawFd for BoundSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw_or_invalid()
    }
}

/// Decodes `getsockname` into a [`ConnectionInfo`].
pub(crate) fn local_addr_of(fd: RawFd, socktype: SockType) -> Result<ConnectionInfo> {
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    let result = unsafe {
        libc::getsockname(fd, &mut storage as *mut _ as *mut libc::sockaddr, &mut len)
    };
    if result == -1 {
        return Err(NetError::os("getsockname"));
    }
    let protocol = match socktype {
        SockType::Stream => Protocol::Tcp,
        SockType::Datagram => Protocol::Udp,
    };
    unsafe {
        ConnectionInfo::from_sockaddr(
            &storage as *const _ as *const libc::sockaddr,
            len,
            socktype,
            protocol,
        )
    }
    .ok_or(NetError::InvalidAddress {
        reason: "unsupported local address family",
    })
}
