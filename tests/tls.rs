//! Loopback TLS: real handshakes over the crate's own sockets, using a
//! fixture certificate pinned as the client's extra trust root.

use std::thread;
use std::time::Duration;

use halyard::{
    AcceptResult, ConnectedStream, ConnectionInfo, IpAddress, Listener, SocketAddress,
    TlsClientConfig, TlsContext, TlsServerConfig, TlsState, TlsStream,
};

const CERT_PEM: &str = include_str!("fixtures/cert.pem");
const KEY_PEM: &str = include_str!("fixtures/key.pem");

fn loopback() -> IpAddress {
    IpAddress::V4([127, 0, 0, 1])
}

fn loopback_listener() -> (Listener, u16) {
    let addr = SocketAddress::from_info(ConnectionInfo::stream(loopback(), 0));
    let listener = Listener::bind(&addr, 16).unwrap();
    let port = listener.local_addr().unwrap().port;
    (listener, port)
}

fn connect_loopback(port: u16) -> ConnectedStream {
    let addr = SocketAddress::from_info(ConnectionInfo::stream(loopback(), port));
    ConnectedStream::connect(&addr, Some(Duration::from_secs(5))).unwrap()
}

fn server_context() -> TlsContext {
    TlsContext::server(&TlsServerConfig::new(CERT_PEM, KEY_PEM).alpn(["hy/1"])).unwrap()
}

fn client_context() -> TlsContext {
    TlsContext::client(&TlsClientConfig::new().add_root_pem(CERT_PEM).alpn(["hy/1"])).unwrap()
}

fn accept_one(listener: &Listener) -> ConnectedStream {
    match listener.accept().unwrap() {
        AcceptResult::Connection(stream, _) => stream,
        AcceptResult::WouldBlock => panic!("blocking accept returned would-block"),
    }
}

#[test]
fn handshake_and_echo_over_loopback() {
    let (listener, port) = loopback_listener();

    let server = thread::spawn(move || {
        let mut tls = TlsStream::accept(&server_context(), accept_one(&listener)).unwrap();
        assert_eq!(tls.state(), TlsState::Established);

        let mut buf = [0u8; 64];
        let mut msg = Vec::new();
        while msg.len() < 4 {
            let n = tls.read(&mut buf).unwrap();
            assert!(n > 0, "peer ended before request completed");
            msg.extend_from_slice(&buf[..n]);
        }
        assert_eq!(msg, b"ping");
        tls.write(b"pong").unwrap();
        tls.alpn_protocol().map(|p| p.to_vec())
    });

    let mut tls = TlsStream::client(&client_context(), connect_loopback(port), "localhost").unwrap();
    assert_eq!(tls.state(), TlsState::Established);
    assert!(tls.protocol_version().is_some());
    assert!(tls.peer_certificate().is_some());
    assert_eq!(tls.alpn_protocol(), Some(&b"hy/1"[..]));

    let flushed = tls.write(b"ping").unwrap();
    assert!(flushed >= 4, "record layer should put bytes on the wire");

    let mut buf = [0u8; 64];
    let mut msg = Vec::new();
    while msg.len() < 4 {
        let n = tls.read(&mut buf).unwrap();
        assert!(n > 0);
        msg.extend_from_slice(&buf[..n]);
    }
    assert_eq!(msg, b"pong");

    let server_alpn = server.join().unwrap();
    assert_eq!(server_alpn.as_deref(), Some(&b"hy/1"[..]));
}

#[test]
fn send_eof_supports_half_closed_duplex() {
    let (listener, port) = loopback_listener();

    let server = thread::spawn(move || {
        let mut tls = TlsStream::accept(&server_context(), accept_one(&listener)).unwrap();

        // Drain the request until the peer's clean EOF.
        let mut buf = [0u8; 64];
        let mut msg = Vec::new();
        loop {
            let n = tls.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            msg.extend_from_slice(&buf[..n]);
        }
        assert_eq!(msg, b"last words");

        // The reverse direction is still open.
        tls.write(b"goodbye").unwrap();
        tls.close().unwrap();
    });

    let mut tls = TlsStream::client(&client_context(), connect_loopback(port), "localhost").unwrap();
    tls.write(b"last words").unwrap();
    tls.send_eof().unwrap();

    let mut buf = [0u8; 64];
    let mut msg = Vec::new();
    loop {
        let n = tls.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        msg.extend_from_slice(&buf[..n]);
    }
    assert_eq!(msg, b"goodbye");

    server.join().unwrap();
}

#[test]
fn tls_close_is_idempotent_and_sticky() {
    let (listener, port) = loopback_listener();
    let server = thread::spawn(move || {
        let _tls = TlsStream::accept(&server_context(), accept_one(&listener));
    });

    let mut tls = TlsStream::client(&client_context(), connect_loopback(port), "localhost").unwrap();
    tls.close().unwrap();
    tls.close().unwrap();
    assert_eq!(tls.state(), TlsState::Closed);

    let mut buf = [0u8; 8];
    assert!(tls.read(&mut buf).unwrap_err().is_closed());
    assert!(tls.write(b"x").unwrap_err().is_closed());

    let _ = server.join();
}

#[test]
fn client_without_the_root_rejects_the_server() {
    let (listener, port) = loopback_listener();
    let server = thread::spawn(move || {
        // The handshake fails on the client; this side sees an error too.
        let _ = TlsStream::accept(&server_context(), accept_one(&listener));
    });

    let untrusting = TlsContext::client(&TlsClientConfig::default()).unwrap();
    let err = TlsStream::client(&untrusting, connect_loopback(port), "localhost");
    assert!(err.is_err(), "handshake should fail without the root");

    let _ = server.join();
}
