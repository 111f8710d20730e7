use std::io::{self, Read};
use std::time::Duration;

use rustls::pki_types::CertificateDer;

use super::context::TlsContext;
use super::session::{HandshakeEngine, TlsSession, pump_handshake};
use super::TlsError;
use crate::addr::SocketAddress;
use crate::error::{NetError, Result};
use crate::socket::{ConnectedStream, Shutdown};
use crate::tls::config::TlsVersion;

/// Lifecycle of a TLS stream. `Handshaking` is only observable from
/// inside the handshake drivers; the constructors return an
/// `Established` stream or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsState {
    Handshaking,
    Established,
    Closed,
}

/// A TLS session over a [`ConnectedStream`].
///
/// All engine I/O goes through the session's in-memory buffers; the
/// socket only ever carries ciphertext. Blocking semantics throughout —
/// the caller serializes access, as with the underlying socket.
pub struct TlsStream {
    stream: ConnectedStream,
    session: TlsSession,
    state: TlsState,
}

impl TlsStream {
    /// Dials `addr` and completes a client handshake.
    ///
    /// The TLS server name is the endpoint's hostname when resolution
    /// provided one, else the candidate address literal. `timeout`
    /// bounds each TCP connect attempt.
    pub fn connect(
        ctx: &TlsContext,
        addr: &SocketAddress,
        timeout: Option<Duration>,
    ) -> Result<TlsStream> {
        let server_name = match addr.hostname() {
            Some(host) => host.to_string(),
            None => addr
                .infos()
                .first()
                .map(|info| info.ip.to_string())
                .ok_or(NetError::InvalidAddress {
                    reason: "endpoint has no candidate addresses",
                })?,
        };
        let stream = ConnectedStream::connect(addr, timeout)?;
        Self::client(ctx, stream, &server_name)
    }

    /// Completes a client handshake over an already-connected stream.
    pub fn client(ctx: &TlsContext, stream: ConnectedStream, server_name: &str) -> Result<TlsStream> {
        let session = ctx.client_session(server_name)?;
        Self::handshake(stream, session)
    }

    /// Completes a server handshake over an accepted stream.
    pub fn accept(ctx: &TlsContext, stream: ConnectedStream) -> Result<TlsStream> {
        let session = ctx.server_session()?;
        Self::handshake(stream, session)
    }

    /// Runs the handshake pump to completion, capturing the peer
    /// certificate on success. On failure the socket is closed before
    /// the error propagates — a half-constructed stream never leaks its
    /// handle.
    fn handshake(mut stream: ConnectedStream, mut session: TlsSession) -> Result<TlsStream> {
        let pumped = pump_handshake(
            &mut session.conn,
            &mut stream,
            &mut session.incoming,
            &mut session.outgoing,
        );
        match pumped {
            Ok(cycles) => {
                session.capture_peer_certificate();
                tracing::debug!(cycles, version = ?session.protocol_version(), "tls established");
                Ok(TlsStream {
                    stream,
                    session,
                    state: TlsState::Established,
                })
            }
            Err(err) => {
                session.release();
                stream.close();
                Err(err)
            }
        }
    }

    /// Reads decrypted bytes.
    ///
    /// Tries the engine first — plaintext may already be buffered from a
    /// prior over-read. Otherwise loops: read ciphertext from the
    /// socket, feed the engine, try again, until at least one byte is
    /// available. A zero return means the peer ended the stream (with
    /// close_notify, or by closing the transport).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let mut scratch = [0u8; 4096];
        loop {
            // Bind before matching so the engine reader borrow ends here.
            let attempt = self.session.conn.reader().read(buf);
            match attempt {
                Ok(n) => return Ok(n),
                // No plaintext yet: pull more ciphertext off the wire.
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let n = self.stream.recv_blocking(&mut scratch)?;
                    if n == 0 {
                        return Ok(0);
                    }
                    self.session.incoming.append(&scratch[..n]);
                    self.session.conn.push_incoming(&mut self.session.incoming)?;
                    self.session.conn.step()?;
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(TlsError::Truncated.into());
                }
                Err(e) => {
                    return Err(TlsError::Engine(rustls::Error::General(e.to_string())).into());
                }
            }
        }
    }

    /// Writes plaintext.
    ///
    /// The engine always consumes the whole buffer into its outgoing
    /// records (bounded by memory, not socket readiness); the records
    /// are then drained to the socket with a retrying send. Returns the
    /// number of ciphertext bytes flushed to the wire.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        use std::io::Write;
        let mut offered = 0;
        let mut flushed = 0;
        while offered < buf.len() {
            let n = self
                .session
                .conn
                .writer()
                .write(&buf[offered..])
                .map_err(|e| TlsError::Engine(rustls::Error::General(e.to_string())))?;
            offered += n;
            if n == 0 {
                // Engine record buffer is full; drain it to make room.
                let moved = self.flush_outgoing()?;
                if moved == 0 {
                    return Err(TlsError::Engine(rustls::Error::General(
                        "engine accepted no plaintext".to_string(),
                    ))
                    .into());
                }
                flushed += moved;
            }
        }
        flushed += self.flush_outgoing()?;
        Ok(flushed)
    }

    /// Signals end-of-stream to the peer and shuts down only the write
    /// half of the socket, leaving the read half open for half-closed
    /// duplex use.
    pub fn send_eof(&mut self) -> Result<()> {
        self.check_open()?;
        self.session.conn.send_close_notify();
        self.flush_outgoing()?;
        self.stream.shutdown(Shutdown::Write)
    }

    /// Releases the session, both buffers, then the socket, in that
    /// order. Idempotent: later calls are no-ops, later I/O reports the
    /// closed error.
    pub fn close(&mut self) -> Result<()> {
        if self.state == TlsState::Closed {
            return Ok(());
        }
        self.state = TlsState::Closed;
        self.session.release();
        self.stream.close();
        Ok(())
    }

    pub fn state(&self) -> TlsState {
        self.state
    }

    /// The peer's end-entity certificate in DER form.
    pub fn peer_certificate(&self) -> Option<&CertificateDer<'static>> {
        self.session.peer_certificate()
    }

    pub fn protocol_version(&self) -> Option<TlsVersion> {
        self.session.protocol_version()
    }

    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.session.alpn_protocol()
    }

    /// The underlying socket, e.g. for options.
    pub fn get_ref(&self) -> &ConnectedStream {
        &self.stream
    }

    fn check_open(&self) -> Result<()> {
        if self.state == TlsState::Closed {
            return Err(NetError::Closed);
        }
        Ok(())
    }

    fn flush_outgoing(&mut self) -> Result<usize> {
        self.session.conn.pull_outgoing(&mut self.session.outgoing)?;
        if self.session.outgoing.is_empty() {
            return Ok(0);
        }
        let flushed = self.stream.send_all_blocking(&self.session.outgoing)?;
        self.session.outgoing.clear();
        Ok(flushed)
    }
}

impl io::Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TlsStream::read(self, buf).map_err(Into::into)
    }
}

impl io::Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The engine consumes the whole plaintext buffer.
        TlsStream::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_outgoing()?;
        Ok(())
    }
}
