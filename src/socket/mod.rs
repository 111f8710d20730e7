//! Socket lifecycle types.
//!
//! The lifecycle is carried in the type, so misuse is unrepresentable:
//!
//! - [`RawSocket`] — created, not yet bound or connected
//! - [`BoundSocket`] — bound, not yet listening
//! - [`Listener`] — accepting connections
//! - [`ConnectedStream`] — established byte stream
//! - [`PendingConnect`] — non-blocking connect in flight
//! - [`Datagram`] — connectionless send/recv
//!
//! The terminal state is runtime, not typestate: every type carries a
//! sticky closed flag, `close()` is idempotent, and any operation after
//! close reports the closed error.

mod bound;
mod datagram;
mod endpoint;
mod fd;
mod listener;
mod options;
mod pending;
mod raw;
mod stream;

pub use self::bound::BoundSocket;
pub use self::datagram::Datagram;
pub use self::listener::{AcceptResult, Listener};
pub use self::options::{
    BoolOption, SizeOption, get_bool, get_size, set_bool, set_reuse_addr, set_size,
    set_tcp_nodelay,
};
pub use self::pending::PendingConnect;
pub use self::raw::RawSocket;
pub use self::stream::ConnectedStream;

/// Socket type, the second argument to the `socket()` syscall.
///
/// - `Stream` — reliable, ordered byte stream (TCP)
/// - `Datagram` — unreliable, unordered packets (UDP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SockType {
    Stream,
    Datagram,
}

impl SockType {
    /// Returns the libc constant for this socket type.
    #[inline]
    pub fn raw(self) -> libc::c_int {
        match self {
            SockType::Stream => libc::SOCK_STREAM,
            SockType::Datagram => libc::SOCK_DGRAM,
        }
    }

    pub(crate) fn from_raw(raw: libc::c_int) -> Option<Self> {
        match raw {
            libc::SOCK_STREAM => Some(SockType::Stream),
            libc::SOCK_DGRAM => Some(SockType::Datagram),
            _ => None,
        }
    }
}

/// Transport protocol, the third argument to the `socket()` syscall.
///
/// `Any` lets the kernel pick the canonical protocol for the socket type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Any,
    Tcp,
    Udp,
}

impl Protocol {
    #[inline]
    pub fn raw(self) -> libc::c_int {
        match self {
            Protocol::Any => 0,
            Protocol::Tcp => libc::IPPROTO_TCP,
            Protocol::Udp => libc::IPPROTO_UDP,
        }
    }

    pub(crate) fn from_raw(raw: libc::c_int) -> Option<Self> {
        match raw {
            0 => Some(Protocol::Any),
            libc::IPPROTO_TCP => Some(Protocol::Tcp),
            libc::IPPROTO_UDP => Some(Protocol::Udp),
            _ => None,
        }
    }
}

/// Which half of a duplex connection to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Read,
    Write,
    ReadWrite,
}

impl Shutdown {
    pub(crate) fn raw(self) -> libc::c_int {
        match self {
            Shutdown::Read => libc::SHUT_RD,
            Shutdown::Write => libc::SHUT_WR,
            Shutdown::ReadWrite => libc::SHUT_RDWR,
        }
    }
}
