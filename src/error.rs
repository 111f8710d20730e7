use crate::addr::ConnectionInfo;
use crate::tls::TlsError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetError>;

/// Portable classification of a native error code.
///
/// Every syscall-backed operation reports one of these kinds regardless of
/// which platform error space produced it. Codes with no mapping become
/// `Generic` — they are carried through, never swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccessDenied,
    PermissionDenied,
    BrokenPipe,
    SocketShutdown,
    ConnectionAborted,
    ConnectionRefused,
    ConnectionReset,
    Timeout,
    NetworkUnreachable,
    FileNotFound,
    FileAlreadyExists,
    IsADirectory,
    DirectoryNotEmpty,
    InvalidArgument,
    Generic(i32),
}

/// Maps a native errno value to its portable kind.
pub fn translate(errno: i32) -> ErrorKind {
    match errno {
        libc::EACCES => ErrorKind::AccessDenied,
        libc::EPERM => ErrorKind::PermissionDenied,
        libc::EPIPE => ErrorKind::BrokenPipe,
        libc::ESHUTDOWN => ErrorKind::SocketShutdown,
        libc::ECONNABORTED => ErrorKind::ConnectionAborted,
        libc::ECONNREFUSED => ErrorKind::ConnectionRefused,
        libc::ECONNRESET => ErrorKind::ConnectionReset,
        libc::ETIMEDOUT => ErrorKind::Timeout,
        libc::ENETUNREACH | libc::EHOSTUNREACH => ErrorKind::NetworkUnreachable,
        libc::ENOENT => ErrorKind::FileNotFound,
        libc::EEXIST => ErrorKind::FileAlreadyExists,
        libc::EISDIR => ErrorKind::IsADirectory,
        libc::ENOTEMPTY => ErrorKind::DirectoryNotEmpty,
        libc::EINVAL => ErrorKind::InvalidArgument,
        other => ErrorKind::Generic(other),
    }
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::ECONNABORTED => "connection aborted".into(),
        libc::ECONNREFUSED => "connection refused".into(),
        libc::ECONNRESET => "connection reset by peer".into(),
        libc::EINPROGRESS => "operation in progress".into(),
        libc::EINTR => "interrupted by signal".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::EMFILE => "too many open files".into(),
        libc::ENETUNREACH => "network unreachable".into(),
        libc::ENOBUFS => "no buffer space available".into(),
        libc::ENOTCONN => "not connected".into(),
        libc::EPIPE => "broken pipe".into(),
        libc::ESHUTDOWN => "socket shut down".into(),
        libc::ETIMEDOUT => "connection timed out".into(),
        _ => format!("errno {}", errno),
    }
}

/// Crate-wide error type.
///
/// OS failures carry the failing operation, the raw errno, and its
/// translated [`ErrorKind`]; protocol-level failures wrap their own types.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("{op} failed: {}", errno_to_str(*.errno))]
    Os {
        op: &'static str,
        errno: i32,
        kind: ErrorKind,
    },

    #[error("socket is closed")]
    Closed,

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: &'static str },

    #[error(transparent)]
    Ipv6Parse(#[from] Ipv6ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    AllConnectionsFailed(#[from] AllConnectionsFailed),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

impl NetError {
    /// Captures the current errno for a failed syscall.
    pub(crate) fn os(op: &'static str) -> Self {
        let errno = errno();
        NetError::Os {
            op,
            errno,
            kind: translate(errno),
        }
    }

    /// Wraps an errno obtained out-of-band (e.g. `SO_ERROR`).
    pub(crate) fn os_code(op: &'static str, errno: i32) -> Self {
        NetError::Os {
            op,
            errno,
            kind: translate(errno),
        }
    }

    /// The portable kind for OS-backed errors; `None` for protocol errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            NetError::Os { kind, .. } => Some(*kind),
            NetError::Closed => Some(ErrorKind::SocketShutdown),
            NetError::InvalidAddress { .. } => Some(ErrorKind::InvalidArgument),
            _ => None,
        }
    }

    /// True for operations attempted on an already-closed resource.
    pub fn is_closed(&self) -> bool {
        matches!(self, NetError::Closed)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            NetError::Os {
                kind: ErrorKind::Timeout,
                ..
            }
        )
    }
}

/// Malformed textual IPv6 address.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid IPv6 literal {input:?}: {reason}")]
pub struct Ipv6ParseError {
    pub input: String,
    pub reason: &'static str,
}

/// Name resolution failure, carrying the resolver's own status code.
///
/// Deliberately distinct from the OS taxonomy: `getaddrinfo` has its own
/// error space (`EAI_*`).
#[derive(Debug, Clone, thiserror::Error)]
#[error("resolving {host:?} (service {service:?}) failed: {detail}")]
pub struct ResolveError {
    pub host: String,
    pub service: String,
    pub code: i32,
    pub detail: String,
}

/// Every candidate address of a [`crate::SocketAddress`] failed to connect.
///
/// Raised only after the full candidate list has been exhausted; the
/// per-candidate failures are retained in attempt order.
#[derive(Debug, thiserror::Error)]
#[error("all {} connection attempts failed", .attempts.len())]
pub struct AllConnectionsFailed {
    pub attempts: Vec<(ConnectionInfo, NetError)>,
}

fn kind_to_io(kind: ErrorKind) -> std::io::ErrorKind {
    match kind {
        ErrorKind::AccessDenied | ErrorKind::PermissionDenied => {
            std::io::ErrorKind::PermissionDenied
        }
        ErrorKind::BrokenPipe => std::io::ErrorKind::BrokenPipe,
        ErrorKind::ConnectionAborted => std::io::ErrorKind::ConnectionAborted,
        ErrorKind::ConnectionRefused => std::io::ErrorKind::ConnectionRefused,
        ErrorKind::ConnectionReset => std::io::ErrorKind::ConnectionReset,
        ErrorKind::Timeout => std::io::ErrorKind::TimedOut,
        ErrorKind::FileNotFound => std::io::ErrorKind::NotFound,
        ErrorKind::FileAlreadyExists => std::io::ErrorKind::AlreadyExists,
        ErrorKind::InvalidArgument => std::io::ErrorKind::InvalidInput,
        ErrorKind::SocketShutdown => std::io::ErrorKind::NotConnected,
        ErrorKind::IsADirectory
        | ErrorKind::DirectoryNotEmpty
        | ErrorKind::NetworkUnreachable
        | ErrorKind::Generic(_) => std::io::ErrorKind::Other,
    }
}

impl From<NetError> for std::io::Error {
    fn from(err: NetError) -> Self {
        let kind = err
            .kind()
            .map(kind_to_io)
            .unwrap_or(std::io::ErrorKind::Other);
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_maps_known_codes() {
        assert_eq!(translate(libc::ECONNREFUSED), ErrorKind::ConnectionRefused);
        assert_eq!(translate(libc::EPIPE), ErrorKind::BrokenPipe);
        assert_eq!(translate(libc::EACCES), ErrorKind::AccessDenied);
        assert_eq!(translate(libc::EPERM), ErrorKind::PermissionDenied);
        assert_eq!(translate(libc::ETIMEDOUT), ErrorKind::Timeout);
        assert_eq!(translate(libc::ENOTEMPTY), ErrorKind::DirectoryNotEmpty);
    }

    #[test]
    fn translate_falls_back_to_generic() {
        match translate(9999) {
            ErrorKind::Generic(code) => assert_eq!(code, 9999),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn closed_error_reports_closed() {
        let err = NetError::Closed;
        assert!(err.is_closed());
        assert_eq!(err.kind(), Some(ErrorKind::SocketShutdown));
    }

    #[test]
    fn os_error_formats_strerror_text() {
        let err = NetError::os_code("connect", libc::ECONNREFUSED);
        assert_eq!(err.to_string(), "connect failed: connection refused");
        assert_eq!(err.kind(), Some(ErrorKind::ConnectionRefused));
    }
}
