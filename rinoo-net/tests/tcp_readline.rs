use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use rinoo_buf::Buffer;
use rinoo_net::{Error, TcpListener, TcpStream};
use rinoo_runtime::Runtime;

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

#[test]
fn readline_is_inclusive_of_the_delimiter() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let listener = TcpListener::bind(loopback(0), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let server = rinoo_runtime::spawn(async move {
            let client = TcpStream::connect(addr).await.unwrap();
            client.write(b"abc\nxyz\n").await.unwrap();
            client
        });

        let (stream, _) = listener.accept().await.unwrap();
        let mut buf = Buffer::new().unwrap();
        let first = stream.readline(&mut buf, b'\n', 16).await.unwrap();
        assert_eq!(&buf.as_slice()[..first], b"abc\n");
        buf.erase(first);

        let second = stream.readline(&mut buf, b'\n', 16).await.unwrap();
        assert_eq!(&buf.as_slice()[..second], b"xyz\n");

        let _client = server.await.unwrap();
    });
}

#[test]
fn readline_fails_once_maxsize_is_exceeded_without_a_delimiter() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let listener = TcpListener::bind(loopback(0), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let server = rinoo_runtime::spawn(async move {
            let client = TcpStream::connect(addr).await.unwrap();
            client.write(b"no delimiter here").await.unwrap();
            client
        });

        let (stream, _) = listener.accept().await.unwrap();
        let mut buf = Buffer::new().unwrap();
        let err = stream.readline(&mut buf, b'\n', 8).await.unwrap_err();
        assert!(matches!(err, Error::LimitExceeded));

        let _client = server.await.unwrap();
    });
}

#[test]
fn expect_leaves_buffer_untouched_on_mismatch() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let listener = TcpListener::bind(loopback(0), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let server = rinoo_runtime::spawn(async move {
            let client = TcpStream::connect(addr).await.unwrap();
            client.write(b"XYZ!").await.unwrap();
        });

        let (stream, _) = listener.accept().await.unwrap();
        let mut buf = Buffer::new().unwrap();
        buf.add(b"seed").unwrap();
        let err = stream.expect(&mut buf, b"ABC!").await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(buf.as_slice(), b"seed");

        server.await.unwrap();
    });
}

#[test]
fn writeb_drains_exactly_what_was_sent() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let listener = TcpListener::bind(loopback(0), 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let server = rinoo_runtime::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut got = vec![0u8; 11];
            let mut filled = 0;
            while filled < got.len() {
                filled += stream.read(&mut got[filled..]).await.unwrap();
            }
            got
        });

        let client = TcpStream::connect(addr).await.unwrap();
        let mut buf = Buffer::new().unwrap();
        buf.add_str("hello world").unwrap();
        let written = client.writeb(&mut buf).await.unwrap();
        assert_eq!(written, 11);
        assert!(buf.is_empty());

        let got = server.await.unwrap();
        assert_eq!(&got, b"hello world");
    });
}
