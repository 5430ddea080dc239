use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use rinoo_net::TcpListener;
use rinoo_net::TcpStream;
use rinoo_runtime::Runtime;

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

#[test]
fn echoes_a_single_round_trip() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let listener = TcpListener::bind(loopback(0), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let server = rinoo_runtime::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            stream.read(&mut buf).await.unwrap();
            stream.write(&buf).await.unwrap();
        });

        let client = TcpStream::connect(addr).await.unwrap();
        client.write(b"hello").await.unwrap();
        let mut reply = [0u8; 5];
        client.read(&mut reply).await.unwrap();
        assert_eq!(&reply, b"hello");
        server.await.unwrap();
    });
}
