//! Synchronous sockets, address handling, and TLS behind one portable
//! surface.
//!
//! Blocking by default, with an explicit per-socket non-blocking mode;
//! would-block conditions travel as [`BlockingResult`] values, never as
//! errors. There is no internal concurrency: one socket or TLS stream is
//! driven by one caller at a time, and independent instances share
//! nothing.

pub mod socket;
pub mod tls;
mod addr;
mod blocking;
mod error;
mod poll;
mod resolve;

pub use self::addr::{ConnectionInfo, Family, IpAddress, SocketAddress};
pub use self::blocking::{BlockingResult, send_all_with, write_retrying};
pub use self::error::{
    AllConnectionsFailed, ErrorKind, Ipv6ParseError, NetError, ResolveError, Result, errno,
    translate,
};
pub use self::resolve::{ResolveHints, Resolver};
pub use self::socket::{
    AcceptResult, BoolOption, BoundSocket, ConnectedStream, Datagram, Listener, PendingConnect,
    Protocol, RawSocket, Shutdown, SizeOption, SockType, get_bool, get_size, set_bool,
    set_reuse_addr, set_size, set_tcp_nodelay,
};
pub use self::tls::{
    TlsClientConfig, TlsContext, TlsError, TlsServerConfig, TlsSession, TlsState, TlsStream,
    TlsVersion,
};
