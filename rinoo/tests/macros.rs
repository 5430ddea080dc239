//! Exercises `#[rinoo::test]` against the facade crate itself, the way
//! a downstream consumer (depending on `rinoo`, not `rinoo-runtime`
//! directly) would use it.

#[rinoo::test]
async fn resolves_a_spawned_task() {
    let handle = rinoo::runtime::spawn(async { 1 + 1 });
    assert_eq!(handle.await.unwrap(), 2);
}

#[rinoo::test]
async fn echoes_over_a_loopback_socket() {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    let listener =
        rinoo::net::TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0), 16)
            .unwrap();
    let addr = listener.local_addr().unwrap();

    let server = rinoo::runtime::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 5];
        stream.read(&mut buf).await.unwrap();
        stream.write(&buf).await.unwrap();
    });

    let client = rinoo::net::TcpStream::connect(addr).await.unwrap();
    client.write(b"hello").await.unwrap();
    let mut reply = [0u8; 5];
    client.read(&mut reply).await.unwrap();
    assert_eq!(&reply, b"hello");

    server.await.unwrap();
}
