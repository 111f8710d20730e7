//! System name resolution.
//!
//! Wraps `getaddrinfo`, copying every result into owned
//! [`ConnectionInfo`]s before the native list is freed. Resolver failures
//! carry the resolver's own status code (`EAI_*`), not the OS taxonomy.

use std::ffi::CString;

use crate::addr::{ConnectionInfo, Family, SocketAddress};
use crate::error::{ResolveError, Result, errno};
use crate::socket::{Protocol, SockType};

/// Hints narrowing what the system resolver returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveHints {
    pub family: Option<Family>,
    pub socktype: Option<SockType>,
    pub protocol: Option<Protocol>,
}

impl ResolveHints {
    pub fn stream() -> Self {
        Self {
            family: None,
            socktype: Some(SockType::Stream),
            protocol: Some(Protocol::Tcp),
        }
    }
}

/// Handle on the system resolver.
///
/// Passed explicitly wherever resolution happens — there is no ambient
/// "current resolver" state. Cheap to construct; `Default` gives the
/// standard system behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver;

impl Resolver {
    /// Resolves `host`/`service` into candidate endpoints.
    ///
    /// `service` is a port number or a service name (`"https"`). Every
    /// result is copied out before `freeaddrinfo`, so the returned list
    /// owns its data.
    pub fn resolve(
        &self,
        host: &str,
        service: &str,
        hints: ResolveHints,
    ) -> std::result::Result<Vec<ConnectionInfo>, ResolveError> {
        let fail = |code: i32, detail: String| ResolveError {
            host: host.to_string(),
            service: service.to_string(),
            code,
            detail,
        };

        let c_host = CString::new(host)
            .map_err(|_| fail(libc::EAI_NONAME, "host contains NUL".to_string()))?;
        let c_service = CString::new(service)
            .map_err(|_| fail(libc::EAI_SERVICE, "service contains NUL".to_string()))?;

        let mut native_hints: libc::addrinfo = unsafe { std::mem::zeroed() };
        native_hints.ai_family = hints.family.map(Family::raw).unwrap_or(libc::AF_UNSPEC);
        native_hints.ai_socktype = hints.socktype.map(SockType::raw).unwrap_or(0);
        native_hints.ai_protocol = hints.protocol.map(Protocol::raw).unwrap_or(0);

        let mut res: *mut libc::addrinfo = std::ptr::null_mut();
        let code = loop {
            let code = unsafe {
                libc::getaddrinfo(
                    c_host.as_ptr(),
                    c_service.as_ptr(),
                    &native_hints,
                    &mut res,
                )
            };
            // EAI_SYSTEM with EINTR is retried like every other primitive.
            if code == libc::EAI_SYSTEM && errno() == libc::EINTR {
                continue;
            }
            break code;
        };

        if code != 0 {
            let detail = unsafe {
                std::ffi::CStr::from_ptr(libc::gai_strerror(code))
                    .to_string_lossy()
                    .into_owned()
            };
            return Err(fail(code, detail));
        }

        let mut infos = Vec::new();
        let mut cursor = res;
        while !cursor.is_null() {
            let entry = unsafe { &*cursor };
            let socktype = SockType::from_raw(entry.ai_socktype);
            let protocol = Protocol::from_raw(entry.ai_protocol);
            if let (Some(socktype), Some(protocol)) = (socktype, protocol) {
                let decoded = unsafe {
                    ConnectionInfo::from_sockaddr(entry.ai_addr, entry.ai_addrlen, socktype, protocol)
                };
                if let Some(info) = decoded {
                    infos.push(info);
                }
            }
            cursor = entry.ai_next;
        }
        unsafe { libc::freeaddrinfo(res) };

        tracing::debug!(host, service, count = infos.len(), "resolved endpoint");
        Ok(infos)
    }
}

impl SocketAddress {
    /// Resolves `host:port` into a de-duplicated candidate set, keeping
    /// the literal hostname for later TLS server-name use.
    pub fn resolve(host: &str, port: u16) -> Result<Self> {
        Self::resolve_with(&Resolver, host, port)
    }

    pub fn resolve_with(resolver: &Resolver, host: &str, port: u16) -> Result<Self> {
        let infos = resolver.resolve(host, &port.to_string(), ResolveHints::stream())?;
        let mut addr = SocketAddress::new(Some(host.to_string()));
        for info in infos {
            addr.push(info);
        }
        Ok(addr)
    }
}
