//! TCP listener and stream.
//!
//! Grounded in `compio_net::tcp::{TcpListener, TcpStream}` for the
//! bind/connect/accept/split shape, and in
//! `original_source/include/rinoo/net/socket.h`'s `rn_socket_readb`/
//! `_readline`/`_expect`/`_writeb`/`_sendfile` for the buffer-oriented
//! operations that sit on top of plain `read`/`write`.

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use rinoo_buf::Buffer;
use rinoo_driver::{Error, Result};
use socket2::Type;

use crate::socket::{domain_for, Socket};

/// A bound, listening TCP socket.
pub struct TcpListener {
    socket: Socket,
}

impl TcpListener {
    /// Binds and listens on `addr` with the given backlog.
    ///
    /// Mirrors `rn_socket_bind` followed by `listen`.
    pub fn bind(addr: SocketAddr, backlog: i32) -> io::Result<Self> {
        let socket = Socket::new(domain_for(&addr), Type::STREAM, None)?;
        socket.bind(addr)?;
        socket.listen(backlog)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sets (or clears, with `None`) the deadline applied to `accept`.
    ///
    /// Mirrors `rn_socket_timeout`.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.socket.set_read_timeout(timeout);
    }

    /// Accepts a new connection.
    ///
    /// Mirrors `rn_socket_accept`.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (socket, addr) = self.socket.accept().await?;
        Ok((TcpStream { socket }, addr))
    }
}

impl AsRawFd for TcpListener {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

/// A connected TCP stream.
pub struct TcpStream {
    socket: Socket,
}

impl TcpStream {
    /// Connects to `addr`.
    ///
    /// Mirrors `rn_socket_connect`.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let socket = Socket::new(domain_for(&addr), Type::STREAM, None)?;
        socket.connect(addr).await?;
        Ok(Self { socket })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.socket.set_nodelay(nodelay)
    }

    /// Sets (or clears, with `None`) the deadline applied to reads and
    /// writes on this stream.
    ///
    /// Mirrors `rn_socket_timeout`.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.socket.set_read_timeout(timeout);
        self.socket.set_write_timeout(timeout);
    }

    /// Reads directly into a plain byte slice.
    ///
    /// Mirrors `rn_socket_read`.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.socket.recv(buf).await
    }

    /// Writes a plain byte slice.
    ///
    /// Mirrors `rn_socket_write`.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        self.socket.send(buf).await
    }

    /// Gathers writes from an ordered sequence of buffers in one call.
    ///
    /// Mirrors `rn_socket_writev`.
    pub async fn writev(&self, bufs: &[&[u8]]) -> Result<usize> {
        self.socket.writev(bufs).await
    }

    /// Reads up to `max` additional bytes into `buf`, growing it as
    /// needed. Returns the number of bytes appended; `0` means the peer
    /// closed the connection.
    ///
    /// Mirrors `rn_socket_readb`.
    pub async fn readb(&self, buf: &mut Buffer, max: usize) -> Result<usize> {
        let mut scratch = vec![0u8; max];
        let n = self.socket.recv(&mut scratch).await?;
        if n > 0 {
            buf.add(&scratch[..n])?;
        }
        Ok(n)
    }

    /// Reads until `delim` is seen or `buf` would exceed `maxsize`,
    /// returning the bytes up to and including the delimiter (inclusive,
    /// per the resolved readline contract).
    ///
    /// Mirrors `rn_socket_readline`.
    pub async fn readline(&self, buf: &mut Buffer, delim: u8, maxsize: usize) -> Result<usize> {
        loop {
            if let Some(pos) = buf.as_slice().iter().position(|&b| b == delim) {
                return Ok(pos + 1);
            }
            if buf.len() >= maxsize {
                return Err(Error::LimitExceeded);
            }
            let want = (maxsize - buf.len()).min(4096);
            let mut scratch = vec![0u8; want];
            let n = self.socket.recv(&mut scratch).await?;
            if n == 0 {
                return Err(Error::Closed);
            }
            buf.add(&scratch[..n])?;
        }
    }

    /// Reads exactly `prefix.len()` bytes and compares them to `prefix`.
    /// On a match, the bytes are appended to `buf` and the count is
    /// returned. On a mismatch, `buf` is left untouched and an
    /// [`Error::Io`] is returned (the resolved `expect` contract).
    ///
    /// Mirrors `rn_socket_expect`.
    pub async fn expect(&self, buf: &mut Buffer, prefix: &[u8]) -> Result<usize> {
        let mut scratch = vec![0u8; prefix.len()];
        let mut filled = 0;
        while filled < scratch.len() {
            let n = self.socket.recv(&mut scratch[filled..]).await?;
            if n == 0 {
                return Err(Error::Closed);
            }
            filled += n;
        }
        if scratch == prefix {
            buf.add(&scratch)?;
            Ok(scratch.len())
        } else {
            Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "expected prefix did not match",
            )))
        }
    }

    /// Writes `buf`'s entire content, then removes the written prefix
    /// from it.
    ///
    /// Mirrors `rn_socket_writeb`.
    pub async fn writeb(&self, buf: &mut Buffer) -> Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.socket.send(&buf.as_slice()[written..]).await?;
            if n == 0 {
                return Err(Error::Closed);
            }
            written += n;
        }
        buf.erase(written);
        Ok(written)
    }

    /// Sends `count` bytes from `file` starting at `offset`, delegating
    /// to the kernel's zero-copy `sendfile(2)`. Advances `offset` by the
    /// number of bytes actually sent.
    ///
    /// Mirrors `rn_socket_sendfile`.
    pub async fn sendfile(
        &self,
        file: &std::fs::File,
        offset: &mut i64,
        count: usize,
    ) -> Result<usize> {
        use std::os::fd::AsRawFd as _;

        let out_fd = self.socket.as_raw_fd();
        let in_fd = file.as_raw_fd();
        loop {
            let mut off = *offset;
            let res = rinoo_driver::syscall!(libc::sendfile(out_fd, in_fd, &mut off, count));
            match res {
                Ok(n) => {
                    *offset = off;
                    return Ok(n as usize);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    rinoo_runtime::writable(out_fd).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl AsRawFd for TcpStream {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}
