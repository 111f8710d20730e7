use std::os::fd::RawFd;

use crate::addr::{ConnectionInfo, Family};
use crate::blocking::{self, BlockingResult};
use crate::error::{NetError, Result, errno};
use crate::poll::{self, Interest};
use crate::socket::bound::local_addr_of;
use crate::socket::fd::SocketFd;
use crate::socket::{Protocol, Shutdown, SockType};

/// A connected stream socket — an established byte stream, ready for
/// send/recv. Created by [`crate::Listener::accept`] (server) or
/// [`crate::RawSocket::connect`] (client).
///
/// Single-shot I/O returns [`BlockingResult`]: a would-block condition is
/// a documented return value here, never an error. EINTR is retried
/// inside every call and is never visible to the caller.
#[derive(Debug)]
pub struct ConnectedStream {
    fd: SocketFd,
    family: Family,
}

impl ConnectedStream {
    pub(crate) fn from_parts(fd: SocketFd, family: Family) -> Self {
        Self { fd, family }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Receives up to `buf.len()` bytes in one native call.
    ///
    /// A count of 0 on a non-empty buffer means the peer closed its
    /// write half.
    pub fn recv(&self, buf: &mut [u8]) -> Result<BlockingResult> {
        let fd = self.fd.raw()?;
        loop {
            let n = unsafe {
                libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0)
            };
            if n >= 0 {
                return Ok(BlockingResult::count(n as usize));
            }
            match errno() {
                libc::EINTR => continue,
                libc::EAGAIN => return Ok(BlockingResult::WOULD_BLOCK_READ),
                _ => return Err(NetError::os("recv")),
            }
        }
    }

    /// Sends as much of `buf` as the kernel will take in one native call.
    pub fn send(&self, buf: &[u8]) -> Result<BlockingResult> {
        let fd = self.fd.raw()?;
        loop {
            let n = unsafe {
                libc::send(
                    fd,
                    buf.as_ptr() as *const libc::c_void,
                    buf.len(),
                    libc::MSG_NOSIGNAL,
                )
            };
            if n >= 0 {
                return Ok(BlockingResult::count(n as usize));
            }
            match errno() {
                libc::EINTR => continue,
                libc::EAGAIN => return Ok(BlockingResult::WOULD_BLOCK_WRITE),
                _ => return Err(NetError::os("send")),
            }
        }
    }

    /// Non-blocking aggregate send.
    ///
    /// Loops the single-shot send, advancing an offset. A would-block
    /// before any byte is written reports the sentinel; a would-block
    /// after partial progress reports the partial count as success —
    /// progress is never dropped.
    pub fn send_all(&self, buf: &[u8]) -> Result<BlockingResult> {
        blocking::send_all_with(buf, |chunk| self.send(chunk))
    }

    /// Blocking aggregate send: polls for writability on every
    /// would-block and retries until the whole buffer is on the wire.
    pub fn send_all_blocking(&self, buf: &[u8]) -> Result<usize> {
        let fd = self.fd.raw()?;
        blocking::write_retrying(
            buf,
            |chunk| self.send(chunk),
            |step| {
                let interest = if step == BlockingResult::WOULD_BLOCK_READ {
                    Interest::Read
                } else {
                    Interest::Write
                };
                poll::wait(fd, interest, None)?;
                Ok(())
            },
        )
    }

    /// Blocking receive: polls for readability on would-block and
    /// retries until at least one byte (or EOF) arrives.
    pub fn recv_blocking(&self, buf: &mut [u8]) -> Result<usize> {
        let fd = self.fd.raw()?;
        loop {
            match self.recv(buf)?.bytes() {
                Some(n) => return Ok(n),
                None => {
                    poll::wait(fd, Interest::Read, None)?;
                }
            }
        }
    }

    /// Shuts down one or both halves without releasing the handle.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        let fd = self.fd.raw()?;
        let result = unsafe { libc::shutdown(fd, how.raw()) };
        if result == -1 {
            return Err(NetError::os("shutdown"));
        }
        Ok(())
    }

    /// Returns the remote address of this connection.
    pub fn peer_addr(&self) -> Result<ConnectionInfo> {
        let fd = self.fd.raw()?;
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let result = unsafe {
            libc::getpeername(fd, &mut storage as *mut _ as *mut libc::sockaddr, &mut len)
        };
        if result == -1 {
            return Err(NetError::os("getpeername"));
        }
        unsafe {
            ConnectionInfo::from_sockaddr(
                &storage as *const _ as *const libc::sockaddr,
                len,
                SockType::Stream,
                Protocol::Tcp,
            )
        }
        .ok_or(NetError::InvalidAddress {
            reason: "unsupported peer address family",
        })
    }

    /// Returns the local address of this connection.
    pub fn local_addr(&self) -> Result<ConnectionInfo> {
        local_addr_of(self.fd.raw()?, SockType::Stream)
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

impl std::os::fd::AsRawFd for ConnectedStream {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw_or_invalid()
    }
}

impl std::io::Read for ConnectedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.recv(buf)?.bytes() {
            Some(n) => Ok(n),
            None => Err(std::io::ErrorKind::WouldBlock.into()),
        }
    }
}

impl std::io::Write for ConnectedStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.send(buf)?.bytes() {
            Some(n) => Ok(n),
            None => Err(std::io::ErrorKind::WouldBlock.into()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(()) // no userspace buffering at this level
    }
}
