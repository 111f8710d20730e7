//! Address types: IP addresses, resolved endpoints, and their raw
//! `sockaddr` conversions.
//!
//! Two families are supported:
//! - `V4` — Internet Protocol version 4 (4 bytes)
//! - `V6` — Internet Protocol version 6 (16 bytes)

mod ipv4;
mod ipv6;

use crate::error::{Ipv6ParseError, NetError, Result};
use crate::socket::{Protocol, SockType};

/// Address family tag, the first argument to the `socket()` syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Returns the libc constant for this address family.
    #[inline]
    pub fn raw(self) -> libc::c_int {
        match self {
            Family::V4 => libc::AF_INET,
            Family::V6 => libc::AF_INET6,
        }
    }

    pub(crate) fn from_raw(raw: libc::c_int) -> Option<Self> {
        match raw {
            libc::AF_INET => Some(Family::V4),
            libc::AF_INET6 => Some(Family::V6),
            _ => None,
        }
    }
}

/// An IP address in network byte order.
///
/// Immutable once constructed; equality and hashing are structural over
/// the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpAddress {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl IpAddress {
    pub fn family(&self) -> Family {
        match self {
            IpAddress::V4(_) => Family::V4,
            IpAddress::V6(_) => Family::V6,
        }
    }

    /// Parses either family from text. IPv6 literals may be bracketed
    /// (`[::1]`); output formatting always follows RFC 5952.
    pub fn parse(text: &str) -> Result<Self> {
        if text.contains(':') || text.starts_with('[') {
            Ok(IpAddress::V6(ipv6::parse(text)?))
        } else {
            ipv4::parse(text)
                .map(IpAddress::V4)
                .ok_or(NetError::InvalidAddress {
                    reason: "invalid IPv4 literal",
                })
        }
    }

    /// Parses an IPv6 literal only.
    pub fn parse_v6(text: &str) -> std::result::Result<Self, Ipv6ParseError> {
        ipv6::parse(text).map(IpAddress::V6)
    }

    /// The fully-expanded IPv6 form, or the dotted quad for V4.
    pub fn to_canonical_string(&self) -> String {
        match self {
            IpAddress::V4(b) => ipv4::format(b),
            IpAddress::V6(b) => ipv6::format_full(b),
        }
    }
}

impl std::fmt::Display for IpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpAddress::V4(b) => f.write_str(&ipv4::format(b)),
            IpAddress::V6(b) => f.write_str(&ipv6::format(b)),
        }
    }
}

/// One concrete way to reach an endpoint: family, socket type, protocol,
/// address, and port. Produced by resolution or built directly from an
/// [`IpAddress`] and port. Immutable value; equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    pub family: Family,
    pub socktype: SockType,
    pub protocol: Protocol,
    pub ip: IpAddress,
    pub port: u16,
    /// Scope ID for link-local IPv6 addresses; 0 otherwise.
    pub scope_id: u32,
}

impl ConnectionInfo {
    /// A TCP stream endpoint at `ip:port`.
    pub fn stream(ip: IpAddress, port: u16) -> Self {
        Self {
            family: ip.family(),
            socktype: SockType::Stream,
            protocol: Protocol::Tcp,
            ip,
            port,
            scope_id: 0,
        }
    }

    /// A UDP datagram endpoint at `ip:port`.
    pub fn datagram(ip: IpAddress, port: u16) -> Self {
        Self {
            family: ip.family(),
            socktype: SockType::Datagram,
            protocol: Protocol::Udp,
            ip,
            port,
            scope_id: 0,
        }
    }

    pub fn with_scope(mut self, scope_id: u32) -> Self {
        self.scope_id = scope_id;
        self
    }

    /// Calls `f` with a pointer to the raw sockaddr and its size.
    ///
    /// The sockaddr lives on this stack frame; the closure pattern keeps
    /// it alive exactly as long as the syscall needs it.
    pub(crate) fn with_sockaddr<F, R>(&self, f: F) -> R
    where
        F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
    {
        match self.ip {
            IpAddress::V4(ip) => {
                let raw = libc::sockaddr_in {
                    sin_family: libc::AF_INET as libc::sa_family_t,
                    sin_port: self.port.to_be(),
                    sin_addr: libc::in_addr {
                        s_addr: u32::from_be_bytes(ip).to_be(),
                    },
                    sin_zero: [0; 8],
                };
                f(
                    &raw as *const _ as *const libc::sockaddr,
                    std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                )
            }
            IpAddress::V6(ip) => {
                let raw = libc::sockaddr_in6 {
                    sin6_family: libc::AF_INET6 as libc::sa_family_t,
                    sin6_port: self.port.to_be(),
                    sin6_flowinfo: 0,
                    sin6_addr: libc::in6_addr { s6_addr: ip },
                    sin6_scope_id: self.scope_id,
                };
                f(
                    &raw as *const _ as *const libc::sockaddr,
                    std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                )
            }
        }
    }

    /// Decodes a raw sockaddr back into an owned `ConnectionInfo`.
    ///
    /// # Safety
    /// `addr` must point to at least `len` valid bytes of sockaddr
    /// storage.
    pub(crate) unsafe fn from_sockaddr(
        addr: *const libc::sockaddr,
        len: libc::socklen_t,
        socktype: SockType,
        protocol: Protocol,
    ) -> Option<Self> {
        if len < std::mem::size_of::<libc::sa_family_t>() as libc::socklen_t {
            return None;
        }
        let family = unsafe { (*addr).sa_family } as libc::c_int;
        match family {
            libc::AF_INET => {
                if len < std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t {
                    return None;
                }
                let raw = unsafe { &*(addr as *const libc::sockaddr_in) };
                Some(Self {
                    family: Family::V4,
                    socktype,
                    protocol,
                    ip: IpAddress::V4(raw.sin_addr.s_addr.to_ne_bytes()),
                    port: u16::from_be(raw.sin_port),
                    scope_id: 0,
                })
            }
            libc::AF_INET6 => {
                if len < std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t {
                    return None;
                }
                let raw = unsafe { &*(addr as *const libc::sockaddr_in6) };
                Some(Self {
                    family: Family::V6,
                    socktype,
                    protocol,
                    ip: IpAddress::V6(raw.sin6_addr.s6_addr),
                    port: u16::from_be(raw.sin6_port),
                    scope_id: raw.sin6_scope_id,
                })
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ip {
            IpAddress::V4(_) => write!(f, "{}:{}", self.ip, self.port),
            IpAddress::V6(_) => write!(f, "[{}]:{}", self.ip, self.port),
        }
    }
}

/// All the ways one logical endpoint may be reached: an ordered,
/// de-duplicated candidate list plus the literal hostname it was resolved
/// from (kept for TLS server-name use).
///
/// Built once by resolution (or by hand from explicit candidates) and
/// consumed by connect/bind, which try candidates in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketAddress {
    host: Option<String>,
    infos: Vec<ConnectionInfo>,
}

impl SocketAddress {
    /// An empty endpoint with an optional hostname; candidates are added
    /// with [`SocketAddress::push`].
    pub fn new(host: Option<String>) -> Self {
        Self {
            host,
            infos: Vec::new(),
        }
    }

    /// A single-candidate endpoint built from an explicit address.
    pub fn from_info(info: ConnectionInfo) -> Self {
        Self {
            host: None,
            infos: vec![info],
        }
    }

    /// Appends a candidate, preserving order and dropping duplicates.
    pub fn push(&mut self, info: ConnectionInfo) {
        if !self.infos.contains(&info) {
            self.infos.push(info);
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn infos(&self) -> &[ConnectionInfo] {
        &self.infos
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_parse_accepts_both_families() {
        assert_eq!(
            IpAddress::parse("127.0.0.1").unwrap(),
            IpAddress::V4([127, 0, 0, 1])
        );
        let v6 = IpAddress::parse("[::1]").unwrap();
        assert_eq!(v6.family(), Family::V6);
        assert_eq!(v6.to_string(), "::1");
    }

    #[test]
    fn connection_info_display() {
        let v4 = ConnectionInfo::stream(IpAddress::V4([127, 0, 0, 1]), 80);
        assert_eq!(v4.to_string(), "127.0.0.1:80");
        let v6 = ConnectionInfo::stream(IpAddress::parse("::1").unwrap(), 443);
        assert_eq!(v6.to_string(), "[::1]:443");
    }

    #[test]
    fn socket_address_dedups_preserving_order() {
        let a = ConnectionInfo::stream(IpAddress::V4([127, 0, 0, 1]), 80);
        let b = ConnectionInfo::stream(IpAddress::V4([10, 0, 0, 1]), 80);
        let mut addr = SocketAddress::new(Some("example.net".into()));
        addr.push(a);
        addr.push(b);
        addr.push(a);
        assert_eq!(addr.infos(), &[a, b]);
        assert_eq!(addr.hostname(), Some("example.net"));
    }

    #[test]
    fn sockaddr_round_trip_v4() {
        let info = ConnectionInfo::stream(IpAddress::V4([192, 168, 1, 7]), 8080);
        let back = info.with_sockaddr(|ptr, len| unsafe {
            ConnectionInfo::from_sockaddr(ptr, len, SockType::Stream, Protocol::Tcp)
        });
        assert_eq!(back, Some(info));
    }

    #[test]
    fn sockaddr_round_trip_v6() {
        let info =
            ConnectionInfo::stream(IpAddress::parse("2001:db8::7").unwrap(), 443).with_scope(3);
        let back = info.with_sockaddr(|ptr, len| unsafe {
            ConnectionInfo::from_sockaddr(ptr, len, SockType::Stream, Protocol::Tcp)
        });
        assert_eq!(back, Some(info));
    }
}
