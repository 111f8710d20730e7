//! Real-socket behavior over loopback: lifecycle, readiness semantics,
//! and multi-candidate connects.

use std::time::Duration;

use halyard::{
    AcceptResult, BlockingResult, ConnectedStream, Datagram, Family, IpAddress, Listener,
    NetError, Protocol, RawSocket, Shutdown, SockType, SocketAddress,
};

fn loopback() -> IpAddress {
    IpAddress::V4([127, 0, 0, 1])
}

/// A listener on an ephemeral loopback port, plus the port it got.
fn loopback_listener() -> (Listener, u16) {
    let addr = SocketAddress::from_info(halyard::ConnectionInfo::stream(loopback(), 0));
    let listener = Listener::bind(&addr, 16).unwrap();
    let port = listener.local_addr().unwrap().port;
    (listener, port)
}

fn connect_loopback(port: u16) -> ConnectedStream {
    let addr = SocketAddress::from_info(halyard::ConnectionInfo::stream(loopback(), port));
    ConnectedStream::connect(&addr, Some(Duration::from_secs(5))).unwrap()
}

/// Reserves a loopback port that nothing is listening on.
fn dead_port() -> u16 {
    let (mut listener, port) = loopback_listener();
    listener.close();
    port
}

#[test]
fn double_close_is_idempotent() {
    let mut socket = RawSocket::open(Family::V4, SockType::Stream, Protocol::Tcp).unwrap();
    assert!(!socket.is_closed());
    socket.close();
    socket.close();
    assert!(socket.is_closed());
}

#[test]
fn io_after_close_reports_closed_kind() {
    let (listener, port) = loopback_listener();
    let mut stream = connect_loopback(port);
    let AcceptResult::Connection(_peer, _) = listener.accept().unwrap() else {
        panic!("blocking accept returned would-block");
    };

    stream.close();
    stream.close();

    let mut buf = [0u8; 8];
    let err = stream.recv(&mut buf).unwrap_err();
    assert!(err.is_closed(), "unexpected error: {err}");
    let err = stream.send(b"x").unwrap_err();
    assert!(err.is_closed());
    let err = stream.shutdown(Shutdown::Write).unwrap_err();
    assert!(err.is_closed());
}

#[test]
fn listener_accept_echo_round_trip() {
    let (listener, port) = loopback_listener();
    let client = connect_loopback(port);
    let AcceptResult::Connection(server, peer) = listener.accept().unwrap() else {
        panic!("blocking accept returned would-block");
    };
    assert_eq!(peer.ip, loopback());
    assert_eq!(peer.port, client.local_addr().unwrap().port);

    let sent = client.send_all_blocking(b"hello across loopback").unwrap();
    assert_eq!(sent, 21);

    let mut buf = [0u8; 64];
    let mut got = 0;
    while got < sent {
        got += server.recv_blocking(&mut buf[got..]).unwrap();
    }
    assert_eq!(&buf[..got], b"hello across loopback");
}

#[test]
fn nonblocking_accept_reports_would_block() {
    let (listener, _port) = loopback_listener();
    listener.set_nonblocking(true).unwrap();
    assert!(matches!(listener.accept().unwrap(), AcceptResult::WouldBlock));
}

#[test]
fn accepted_child_inherits_nonblocking_flag() {
    let (listener, port) = loopback_listener();
    listener.set_nonblocking(true).unwrap();
    let _client = connect_loopback(port);

    // The connection is established; give the queue a moment.
    let server = loop {
        match listener.accept().unwrap() {
            AcceptResult::Connection(stream, _) => break stream,
            AcceptResult::WouldBlock => std::thread::sleep(Duration::from_millis(5)),
        }
    };
    assert!(server.nonblocking());

    // And an empty non-blocking read yields the read sentinel.
    let mut buf = [0u8; 8];
    assert_eq!(
        server.recv(&mut buf).unwrap(),
        BlockingResult::WOULD_BLOCK_READ
    );
}

#[test]
fn connect_uses_first_reachable_candidate() {
    let (listener, live_port) = loopback_listener();
    let dead = dead_port();

    let mut addr = SocketAddress::new(None);
    addr.push(halyard::ConnectionInfo::stream(loopback(), dead));
    addr.push(halyard::ConnectionInfo::stream(loopback(), live_port));

    let stream = ConnectedStream::connect(&addr, Some(Duration::from_secs(5))).unwrap();
    assert_eq!(stream.peer_addr().unwrap().port, live_port);
    drop(listener);
}

#[test]
fn connect_exhausting_all_candidates_reports_every_attempt() {
    let mut addr = SocketAddress::new(None);
    addr.push(halyard::ConnectionInfo::stream(loopback(), dead_port()));
    addr.push(halyard::ConnectionInfo::stream(loopback(), dead_port()));

    let err = ConnectedStream::connect(&addr, Some(Duration::from_secs(5))).unwrap_err();
    match err {
        NetError::AllConnectionsFailed(failed) => assert_eq!(failed.attempts.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn pending_connect_completes_on_loopback() {
    let (listener, port) = loopback_listener();
    let socket = RawSocket::open(Family::V4, SockType::Stream, Protocol::Tcp).unwrap();
    let pending = socket
        .connect_nonblocking(&halyard::ConnectionInfo::stream(loopback(), port))
        .unwrap();
    let stream = pending.wait(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(stream.peer_addr().unwrap().port, port);
    drop(listener);
}

#[test]
fn shutdown_write_delivers_eof_without_closing_read() {
    let (listener, port) = loopback_listener();
    let client = connect_loopback(port);
    let AcceptResult::Connection(server, _) = listener.accept().unwrap() else {
        panic!("blocking accept returned would-block");
    };

    client.send_all_blocking(b"bye").unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    let mut buf = [0u8; 16];
    let n = server.recv_blocking(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"bye");
    assert_eq!(server.recv_blocking(&mut buf).unwrap(), 0);

    // The reverse direction still works.
    server.send_all_blocking(b"ack").unwrap();
    let n = client.recv_blocking(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"ack");
}

#[test]
fn datagram_round_trip_decodes_sender() {
    let receiver = Datagram::bind(&halyard::ConnectionInfo::datagram(loopback(), 0)).unwrap();
    let recv_port = receiver.local_addr().unwrap().port;
    let sender = Datagram::bind(&halyard::ConnectionInfo::datagram(loopback(), 0)).unwrap();
    let send_port = sender.local_addr().unwrap().port;

    let sent = sender
        .send_to(b"datagram", &halyard::ConnectionInfo::datagram(loopback(), recv_port))
        .unwrap();
    assert_eq!(sent.bytes(), Some(8));

    let mut buf = [0u8; 32];
    let (result, peer) = receiver.recv_from(&mut buf).unwrap();
    assert_eq!(result.bytes(), Some(8));
    assert_eq!(&buf[..8], b"datagram");
    let peer = peer.expect("sender address");
    assert_eq!(peer.ip, loopback());
    assert_eq!(peer.port, send_port);
}

#[test]
fn nonblocking_datagram_recv_reports_would_block() {
    let socket = Datagram::bind(&halyard::ConnectionInfo::datagram(loopback(), 0)).unwrap();
    socket.set_nonblocking(true).unwrap();
    let mut buf = [0u8; 8];
    let (result, peer) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(result, BlockingResult::WOULD_BLOCK_READ);
    assert!(peer.is_none());
}

#[test]
fn bool_and_size_options_round_trip() {
    let socket = RawSocket::open(Family::V4, SockType::Stream, Protocol::Tcp).unwrap();

    halyard::set_bool(&socket, halyard::BoolOption::ReuseAddr, true).unwrap();
    assert!(halyard::get_bool(&socket, halyard::BoolOption::ReuseAddr).unwrap());
    halyard::set_bool(&socket, halyard::BoolOption::KeepAlive, true).unwrap();
    assert!(halyard::get_bool(&socket, halyard::BoolOption::KeepAlive).unwrap());

    halyard::set_size(&socket, halyard::SizeOption::RecvBuffer, 64 * 1024).unwrap();
    // The kernel rounds (typically doubles); just require it took effect.
    assert!(halyard::get_size(&socket, halyard::SizeOption::RecvBuffer).unwrap() >= 64 * 1024);
}

#[test]
fn resolved_loopback_endpoint_connects() {
    let (listener, port) = loopback_listener();
    let addr = SocketAddress::resolve("127.0.0.1", port).unwrap();
    assert_eq!(addr.hostname(), Some("127.0.0.1"));
    let stream = ConnectedStream::connect(&addr, Some(Duration::from_secs(5))).unwrap();
    assert_eq!(stream.peer_addr().unwrap().port, port);
    drop(listener);
}
