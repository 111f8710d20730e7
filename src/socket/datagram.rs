use std::os::fd::RawFd;

use crate::addr::{ConnectionInfo, Family};
use crate::blocking::BlockingResult;
use crate::error::{NetError, Result, errno};
use crate::socket::bound::local_addr_of;
use crate::socket::fd::SocketFd;
use crate::socket::raw::RawSocket;
use crate::socket::{Protocol, SockType};

/// A datagram socket.
///
/// Datagrams don't connect: each send names a destination, each receive
/// reports the source.
pub struct Datagram {
    fd: SocketFd,
    family: Family,
}

impl Datagram {
    /// Opens an unbound datagram socket, e.g. for a client that only
    /// sends.
    pub fn open(family: Family) -> Result<Self> {
        let raw = RawSocket::open(family, SockType::Datagram, Protocol::Udp)?;
        Ok(Self {
            fd: raw.into_fd(),
            family,
        })
    }

    /// Opens a datagram socket bound to `info` — the receive side.
    pub fn bind(info: &ConnectionInfo) -> Result<Self> {
        let raw = RawSocket::open(info.family, SockType::Datagram, Protocol::Udp)?;
        let family = info.family;
        let bound = raw.bind(info)?;
        Ok(Self {
            fd: bound.into_fd(),
            family,
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Sends one datagram to `dest`.
    pub fn send_to(&self, buf: &[u8], dest: &ConnectionInfo) -> Result<BlockingResult> {
        if dest.family != self.family {
            return Err(NetError::InvalidAddress {
                reason: "address family does not match socket family",
            });
        }
        let fd = self.fd.raw()?;
        loop {
            let n = dest.with_sockaddr(|ptr, len| unsafe {
                libc::sendto(
                    fd,
                    buf.as_ptr() as *const libc::c_void,
                    buf.len(),
                    libc::MSG_NOSIGNAL,
                    ptr,
                    len,
                )
            });
            if n >= 0 {
                return Ok(BlockingResult::count(n as usize));
            }
            match errno() {
                libc::EINTR => continue,
                libc::EAGAIN => return Ok(BlockingResult::WOULD_BLOCK_WRITE),
                _ => return Err(NetError::os("sendto")),
            }
        }
    }

    /// Receives one datagram, decoding the sender's address.
    ///
    /// A would-block result carries no peer.
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<(BlockingResult, Option<ConnectionInfo>)> {
        let fd = self.fd.raw()?;
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len;
        loop {
            len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
            let n = unsafe {
                libc::recvfrom(
                    fd,
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                    0,
                    &mut storage as *mut _ as *mut libc::sockaddr,
                    &mut len,
                )
            };
            if n >= 0 {
                let peer = unsafe {
                    ConnectionInfo::from_sockaddr(
                        &storage as *const _ as *const libc::sockaddr,
                        len,
                        SockType::Datagram,
                        Protocol::Udp,
                    )
                };
                return Ok((BlockingResult::count(n as usize), peer));
            }
            match errno() {
                libc::EINTR => continue,
                libc::EAGAIN => return Ok((BlockingResult::WOULD_BLOCK_READ, None)),
                _ => return Err(NetError::os("recvfrom")),
            }
        }
    }

    /// The locally bound address — useful after binding port 0.
    pub fn local_addr(&self) -> Result<ConnectionInfo> {
        local_addr_of(self.fd.raw()?, SockType::Datagram)
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.fd.set_nonblocking(nonblocking)
    }

    pub fn nonblocking(&self) -> bool {
        self.fd.nonblocking()
    }

    /// Releases the handle. Idempotent; later I/O reports the closed
    /// error.
    pub fn close(&mut self) {
        self.fd.close();
    }

    pub fn is_closed(&self) -> bool {
        self.fd.is_closed()
    }
}

impl std::os::fd::AsRawFd for Datagram {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw_or_invalid()
    }
}
