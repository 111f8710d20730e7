use std::io;

use rustls::pki_types::CertificateDer;

use super::TlsError;
use crate::error::Result;
use crate::socket::ConnectedStream;
use crate::tls::config::TlsVersion;

/// Growable ciphertext buffer with a read cursor — one half of the
/// in-memory pair that decouples the engine from the transport.
///
/// Raw storage never crosses the public interface; the buffer is created
/// with its session and released with it.
#[derive(Debug)]
pub(crate) struct BioBuffer {
    buf: Vec<u8>,
    pos: usize,
}

impl BioBuffer {
    pub(crate) fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
        }
    }

    pub(crate) fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }

    // Reclaims consumed space once the cursor has moved far enough that
    // copying beats growing.
    fn compact(&mut self) {
        if self.pos == self.buf.len() {
            self.clear();
        } else if self.pos > 4096 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
    }
}

impl io::Read for BioBuffer {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = &self.buf[self.pos..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        self.compact();
        Ok(n)
    }
}

/// One TLS session: the engine connection, its two ciphertext buffers,
/// and the peer certificate captured once the handshake completes.
///
/// Single-owner: the session, both buffers, and the cached certificate
/// are released together, exactly once.
#[derive(Debug)]
pub struct TlsSession {
    pub(crate) conn: rustls::Connection,
    pub(crate) incoming: BioBuffer,
    pub(crate) outgoing: Vec<u8>,
    peer_cert: Option<CertificateDer<'static>>,
}

impl TlsSession {
    pub(crate) fn new(conn: rustls::Connection) -> Self {
        Self {
            conn,
            incoming: BioBuffer::new(),
            outgoing: Vec::new(),
            peer_cert: None,
        }
    }

    /// Caches the peer's end-entity certificate. Meaningful only after
    /// the handshake has completed.
    pub(crate) fn capture_peer_certificate(&mut self) {
        self.peer_cert = self
            .conn
            .peer_certificates()
            .and_then(|certs| certs.first())
            .cloned();
    }

    /// The peer's end-entity certificate in DER form, once established.
    pub fn peer_certificate(&self) -> Option<&CertificateDer<'static>> {
        self.peer_cert.as_ref()
    }

    /// The negotiated protocol version, once established.
    pub fn protocol_version(&self) -> Option<TlsVersion> {
        match self.conn.protocol_version() {
            Some(rustls::ProtocolVersion::TLSv1_2) => Some(TlsVersion::Tls12),
            Some(rustls::ProtocolVersion::TLSv1_3) => Some(TlsVersion::Tls13),
            _ => None,
        }
    }

    /// The ALPN protocol agreed during the handshake, if any.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.conn.alpn_protocol()
    }

    pub(crate) fn release(&mut self) {
        self.incoming.clear();
        self.outgoing.clear();
        self.peer_cert = None;
    }
}

/// The engine side of the handshake pump: a single processing step plus
/// the two buffer transfers. Narrow on purpose so tests can script a
/// peer without real crypto.
pub(crate) trait HandshakeEngine {
    fn is_handshaking(&self) -> bool;

    /// One engine step over whatever ciphertext is already buffered.
    /// "Needs more data" is not an error — it is the steady state.
    fn step(&mut self) -> std::result::Result<(), TlsError>;

    /// Drains the engine's pending ciphertext into `out`.
    fn pull_outgoing(&mut self, out: &mut Vec<u8>) -> std::result::Result<(), TlsError>;

    /// Feeds buffered network ciphertext into the engine.
    fn push_incoming(&mut self, incoming: &mut BioBuffer) -> std::result::Result<usize, TlsError>;
}

impl HandshakeEngine for rustls::Connection {
    fn is_handshaking(&self) -> bool {
        // Explicit deref to the engine state — plain method syntax would
        // resolve back to this trait impl.
        (**self).is_handshaking()
    }

    fn step(&mut self) -> std::result::Result<(), TlsError> {
        self.process_new_packets()?;
        Ok(())
    }

    fn pull_outgoing(&mut self, out: &mut Vec<u8>) -> std::result::Result<(), TlsError> {
        while self.wants_write() {
            self.write_tls(out)
                .map_err(|e| TlsError::Engine(rustls::Error::General(e.to_string())))?;
        }
        Ok(())
    }

    fn push_incoming(&mut self, incoming: &mut BioBuffer) -> std::result::Result<usize, TlsError> {
        let mut total = 0;
        while !incoming.is_empty() {
            let n = self
                .read_tls(incoming)
                .map_err(|e| TlsError::Engine(rustls::Error::General(e.to_string())))?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }
}

/// The transport side of the pump: blocking send-all and blocking
/// receive.
pub(crate) trait Transport {
    fn send_all(&mut self, buf: &[u8]) -> Result<usize>;
    fn recv_some(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl Transport for ConnectedStream {
    fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
        ConnectedStream::send_all_blocking(self, buf)
    }

    fn recv_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        ConnectedStream::recv_blocking(self, buf)
    }
}

/// Drives the handshake to completion, returning the number of pump
/// cycles (drain-outgoing / read-incoming round trips) it took.
///
/// Each cycle: one engine step; if still handshaking, drain `outgoing`
/// to the wire, read available ciphertext into `incoming`, feed the
/// engine, repeat. A final drain after completion flushes the last
/// flight.
pub(crate) fn pump_handshake<E, T>(
    engine: &mut E,
    wire: &mut T,
    incoming: &mut BioBuffer,
    outgoing: &mut Vec<u8>,
) -> Result<u32>
where
    E: HandshakeEngine,
    T: Transport,
{
    let mut scratch = [0u8; 4096];
    let mut cycles = 0u32;
    loop {
        engine.step()?;
        if !engine.is_handshaking() {
            break;
        }
        cycles += 1;

        engine.pull_outgoing(outgoing)?;
        if !outgoing.is_empty() {
            wire.send_all(outgoing)?;
            outgoing.clear();
        }

        let n = wire.recv_some(&mut scratch)?;
        if n == 0 {
            return Err(TlsError::HandshakeEof.into());
        }
        incoming.append(&scratch[..n]);
        engine.push_incoming(incoming)?;
    }

    engine.pull_outgoing(outgoing)?;
    if !outgoing.is_empty() {
        wire.send_all(outgoing)?;
        outgoing.clear();
    }
    tracing::trace!(cycles, "handshake complete");
    Ok(cycles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    /// A peer scripted as a state machine: reports "still handshaking"
    /// until it has been fed a fixed number of times, then completes.
    struct ScriptedEngine {
        feeds_needed: u32,
        feeds_seen: u32,
        steps: u32,
        complete: bool,
    }

    impl ScriptedEngine {
        fn needing(feeds: u32) -> Self {
            Self {
                feeds_needed: feeds,
                feeds_seen: 0,
                steps: 0,
                complete: false,
            }
        }
    }

    impl HandshakeEngine for ScriptedEngine {
        fn is_handshaking(&self) -> bool {
            !self.complete
        }

        fn step(&mut self) -> std::result::Result<(), TlsError> {
            self.steps += 1;
            if self.feeds_seen >= self.feeds_needed {
                self.complete = true;
            }
            Ok(())
        }

        fn pull_outgoing(&mut self, out: &mut Vec<u8>) -> std::result::Result<(), TlsError> {
            if !self.complete {
                out.extend_from_slice(b"flight");
            }
            Ok(())
        }

        fn push_incoming(
            &mut self,
            incoming: &mut BioBuffer,
        ) -> std::result::Result<usize, TlsError> {
            let mut sink = Vec::new();
            let n = incoming.read_to_end(&mut sink).unwrap();
            self.feeds_seen += 1;
            Ok(n)
        }
    }

    struct LoopbackWire {
        sent: usize,
    }

    impl Transport for LoopbackWire {
        fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
            self.sent += buf.len();
            Ok(buf.len())
        }

        fn recv_some(&mut self, buf: &mut [u8]) -> Result<usize> {
            buf[0] = 0x16; // any ciphertext byte
            Ok(1)
        }
    }

    #[test]
    fn pump_count_matches_scripted_need_more_steps() {
        // The peer needs three "more data" rounds before completing.
        let mut engine = ScriptedEngine::needing(3);
        let mut wire = LoopbackWire { sent: 0 };
        let mut incoming = BioBuffer::new();
        let mut outgoing = Vec::new();

        let cycles =
            pump_handshake(&mut engine, &mut wire, &mut incoming, &mut outgoing).unwrap();

        assert_eq!(cycles, 3);
        assert!(!engine.is_handshaking());
        // One step per cycle plus the completing step.
        assert_eq!(engine.steps, 4);
        assert!(wire.sent > 0);
        assert!(outgoing.is_empty());
    }

    #[test]
    fn pump_surfaces_peer_eof_during_handshake() {
        struct DeadWire;
        impl Transport for DeadWire {
            fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
                Ok(buf.len())
            }
            fn recv_some(&mut self, _buf: &mut [u8]) -> Result<usize> {
                Ok(0)
            }
        }

        let mut engine = ScriptedEngine::needing(1);
        let mut incoming = BioBuffer::new();
        let mut outgoing = Vec::new();
        let err = pump_handshake(&mut engine, &mut DeadWire, &mut incoming, &mut outgoing)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::NetError::Tls(TlsError::HandshakeEof)
        ));
    }

    #[test]
    fn bio_buffer_reads_in_order_across_appends() {
        let mut bio = BioBuffer::new();
        bio.append(b"abc");
        bio.append(b"def");
        let mut out = [0u8; 4];
        assert_eq!(bio.read(&mut out).unwrap(), 4);
        assert_eq!(&out, b"abcd");
        let mut rest = Vec::new();
        bio.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"ef");
        assert!(bio.is_empty());
    }
}
