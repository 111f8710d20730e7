//! TLS over the crate's own sockets.
//!
//! The engine (`rustls`) is driven entirely through two in-memory
//! buffers — ciphertext in, ciphertext out — so the transport and the
//! cryptographic engine stay decoupled. See [`TlsStream`] for the
//! blocking surface and [`TlsContext`] for configuration.

mod config;
mod context;
mod session;
mod stream;

pub use self::config::{TlsClientConfig, TlsServerConfig, TlsVersion};
pub use self::context::TlsContext;
pub use self::session::TlsSession;
pub use self::stream::{TlsState, TlsStream};

/// TLS-layer failures. Engine failures chain the engine's own error as
/// the source.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("tls engine error: {0}")]
    Engine(#[from] rustls::Error),

    #[error("invalid tls server name: {name:?}")]
    InvalidServerName { name: String },

    #[error("invalid pem material: {reason}")]
    InvalidPem { reason: String },

    #[error("empty protocol version set")]
    EmptyVersionSet,

    #[error("context role does not match requested session role")]
    RoleMismatch,

    #[error("peer closed the connection during the handshake")]
    HandshakeEof,

    #[error("connection truncated before close_notify")]
    Truncated,
}
