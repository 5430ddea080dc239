//! Datagram sockets.
//!
//! Mirrors `rn_socket_t` used in `SOCK_DGRAM` mode, and
//! `compio_net::udp::UdpSocket`'s bind/recv_from/send_to shape on top
//! of the same [`Socket`] retry-loop every stream/listener type here is
//! built on.

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};

use rinoo_driver::Result;
use socket2::Type;

use crate::socket::{domain_for, Socket};

/// A connectionless UDP socket.
pub struct UdpSocket {
    socket: Socket,
}

impl UdpSocket {
    /// Binds a UDP socket to `addr`.
    ///
    /// Mirrors `rn_socket_bind` for `SOCK_DGRAM`.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Socket::new(domain_for(&addr), Type::DGRAM, None)?;
        socket.bind(addr)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives a single datagram, returning its length and sender.
    ///
    /// Mirrors `rn_socket_recvfrom`.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    /// Sends a single datagram to `addr`.
    ///
    /// Mirrors `rn_socket_sendto`.
    pub async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<usize> {
        self.socket.send_to(buf, addr).await
    }

    /// Connects this socket to a single peer, after which `send`/`recv`
    /// may be used in place of `send_to`/`recv_from`.
    pub async fn connect(&self, addr: SocketAddr) -> Result<()> {
        self.socket.connect(addr).await
    }

    pub async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.socket.send(buf).await
    }

    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.socket.recv(buf).await
    }
}

impl AsRawFd for UdpSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rinoo_runtime::Runtime;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[test]
    fn exchanges_a_single_datagram() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let server = UdpSocket::bind(loopback(0)).unwrap();
            let server_addr = server.local_addr().unwrap();
            let client = UdpSocket::bind(loopback(0)).unwrap();
            let client_addr = client.local_addr().unwrap();

            client.send_to(b"ping", server_addr).await.unwrap();
            let mut buf = [0u8; 4];
            let (n, from) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"ping");
            assert_eq!(from, client_addr);

            server.send_to(b"pong", from).await.unwrap();
            let mut reply = [0u8; 4];
            let (n, _) = client.recv_from(&mut reply).await.unwrap();
            assert_eq!(&reply[..n], b"pong");
        });
    }
}
