use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use rinoo_net::{Error, TcpListener, TcpStream};
use rinoo_runtime::Runtime;

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

/// Mirrors spec.md §8's "Timeout" scenario: a read against a peer that
/// never writes must resolve to `Error::Timeout` once the configured
/// deadline elapses, rather than hanging or erroring some other way —
/// and the connection must still be usable afterward.
#[test]
fn socket_timeout_resolves_once_the_deadline_elapses() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let listener = TcpListener::bind(loopback(0), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let server = rinoo_runtime::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            stream
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.set_timeout(Some(Duration::from_millis(30)));
        let server_stream = server.await.unwrap();

        let mut buf = [0u8; 8];
        let err = client.read(&mut buf).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));

        server_stream.write(b"late").await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"late");
    });
}

/// `accept` is bound by the same persistent per-socket timeout as
/// read/write (spec.md §4.4, §6's `socket_timeout`): a listener with no
/// pending connection must time out rather than block forever, and must
/// still accept a connection made after the timeout fires.
#[test]
fn listener_accept_resolves_once_the_deadline_elapses() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut listener = TcpListener::bind(loopback(0), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        listener.set_timeout(Some(Duration::from_millis(30)));

        let err = listener.accept().await.unwrap_err();
        assert!(matches!(err, Error::Timeout));

        let _client = rinoo_runtime::spawn(async move {
            TcpStream::connect(addr).await.unwrap()
        });
        let (_stream, _peer) = listener.accept().await.unwrap();
    });
}
