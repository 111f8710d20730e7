//! Multi-candidate connect and bind over a [`SocketAddress`].
//!
//! Candidates are attempted sequentially in resolution order; the first
//! one that succeeds wins. Per-candidate failures are collected and
//! surfaced together only once every candidate has been exhausted.

use std::time::Duration;

use crate::addr::SocketAddress;
use crate::error::{AllConnectionsFailed, NetError, Result};
use crate::socket::listener::Listener;
use crate::socket::options::set_reuse_addr;
use crate::socket::raw::RawSocket;
use crate::socket::stream::ConnectedStream;
use crate::socket::{Protocol, SockType};

impl ConnectedStream {
    /// Connects to the first reachable candidate of `addr`.
    ///
    /// `timeout` bounds each individual attempt, not the whole sequence.
    /// Raises [`AllConnectionsFailed`] only after every candidate has
    /// failed; a single success never surfaces earlier failures.
    pub fn connect(addr: &SocketAddress, timeout: Option<Duration>) -> Result<ConnectedStream> {
        let mut attempts = Vec::new();
        for info in addr.infos() {
            let attempt = RawSocket::open(info.family, SockType::Stream, Protocol::Tcp)
                .and_then(|socket| socket.connect(info, timeout));
            match attempt {
                Ok(stream) => {
                    tracing::debug!(candidate = %info, "connected");
                    return Ok(stream);
                }
                Err(err) => {
                    tracing::debug!(candidate = %info, error = %err, "connect attempt failed");
                    attempts.push((*info, err));
                }
            }
        }
        if attempts.is_empty() {
            return Err(NetError::InvalidAddress {
                reason: "endpoint has no candidate addresses",
            });
        }
        Err(AllConnectionsFailed { attempts }.into())
    }
}

impl Listener {
    /// Binds and listens on the first bindable candidate of `addr`.
    ///
    /// `SO_REUSEADDR` is enabled before binding, the server convention.
    pub fn bind(addr: &SocketAddress, backlog: i32) -> Result<Listener> {
        let mut attempts = Vec::new();
        for info in addr.infos() {
            let attempt = RawSocket::open(info.family, SockType::Stream, Protocol::Tcp)
                .and_then(|socket| {
                    set_reuse_addr(&socket, true)?;
                    socket.bind(info)
                })
                .and_then(|bound| bound.listen(backlog));
            match attempt {
                Ok(listener) => {
                    tracing::debug!(candidate = %info, backlog, "listening");
                    return Ok(listener);
                }
                Err(err) => attempts.push((*info, err)),
            }
        }
        if attempts.is_empty() {
            return Err(NetError::InvalidAddress {
                reason: "endpoint has no candidate addresses",
            });
        }
        Err(AllConnectionsFailed { attempts }.into())
    }
}
