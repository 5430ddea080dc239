//! End-to-end accept fan-out: a listener on the creator's scheduler
//! hands each accepted connection to the next worker round robin,
//! mirroring spec.md §8's "Spawn fan-out" scenario at a smaller scale.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;

use rinoo_dispatcher::Dispatcher;
use rinoo_net::{TcpListener, TcpStream};
use rinoo_runtime::Runtime;

#[test]
fn echo_clients_fan_out_across_workers() {
    const WORKERS: usize = 4;
    const CLIENTS: usize = 40;

    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0), 128).unwrap();
        let addr = listener.local_addr().unwrap();
        let dispatcher = Dispatcher::new(NonZeroUsize::new(WORKERS).unwrap()).unwrap();

        let clients = rinoo_runtime::spawn(async move {
            let mut handles = Vec::new();
            for _ in 0..CLIENTS {
                handles.push(rinoo_runtime::spawn(async move {
                    let client = TcpStream::connect(addr).await.unwrap();
                    client.write(b"0123456789abcdef").await.unwrap();
                    let mut reply = [0u8; 16];
                    let mut filled = 0;
                    while filled < reply.len() {
                        filled += client.read(&mut reply[filled..]).await.unwrap();
                    }
                    assert_eq!(&reply, b"0123456789abcdef");
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
        });

        for _ in 0..CLIENTS {
            let (stream, _peer) = listener.accept().await.unwrap();
            dispatcher.execute(move || async move {
                let mut buf = [0u8; 16];
                let mut filled = 0;
                while filled < buf.len() {
                    filled += stream.read(&mut buf[filled..]).await.unwrap();
                }
                stream.write(&buf).await.unwrap();
            });
        }

        clients.await.unwrap();
        dispatcher.join().unwrap();
    });
}
