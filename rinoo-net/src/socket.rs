//! The low-level socket wrapper every stream/listener type is built on.
//!
//! Grounded in `compio_net::socket::Socket`: a thin, non-blocking wrapper
//! over `socket2::Socket` whose async methods loop a raw syscall against
//! a readiness future instead of submitting a completion-IO op. The
//! `MAX_IO_CALLS` retry bound is carried over from
//! `original_source/include/rinoo/net/socket.h`: a hot fd that keeps
//! reporting readiness (and keeps yielding `EAGAIN` only after a partial
//! read/write) must not starve the rest of the ready queue, so after that
//! many consecutive retries the operation yields once even if the fd is
//! still apparently ready.

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use rinoo_driver::{Error, Result};
use rinoo_runtime::{readable, sleep, writable, yield_now};
use socket2::{Domain, Protocol, Socket as Socket2, Type};

/// Number of consecutive `EAGAIN`/`EWOULDBLOCK` retries a single
/// operation will absorb before yielding to the ready queue regardless
/// of the fd's apparent readiness.
///
/// Mirrors `MAX_IO_CALLS` from `rinoo/net/socket.h`.
pub const MAX_IO_CALLS: u32 = 10;

/// A non-blocking socket with async connect/accept/read/write built on
/// top of the current runtime's readiness poller.
pub struct Socket {
    inner: Socket2,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl Socket {
    pub(crate) fn new(domain: Domain, ty: Type, protocol: Option<Protocol>) -> io::Result<Self> {
        let inner = Socket2::new(domain, ty.nonblocking(), protocol)?;
        Ok(Self {
            inner,
            read_timeout: None,
            write_timeout: None,
        })
    }

    pub(crate) fn from_socket2(inner: Socket2) -> io::Result<Self> {
        inner.set_nonblocking(true)?;
        Ok(Self {
            inner,
            read_timeout: None,
            write_timeout: None,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner
            .local_addr()?
            .as_socket()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not an IP socket address"))
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner
            .peer_addr()?
            .as_socket()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not an IP socket address"))
    }

    pub fn bind(&self, addr: SocketAddr) -> io::Result<()> {
        self.inner.bind(&addr.into())
    }

    pub fn listen(&self, backlog: i32) -> io::Result<()> {
        self.inner.listen(backlog)
    }

    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.inner.set_nodelay(nodelay)
    }

    /// Sets the deadline applied to subsequent reads. `None` disables
    /// the deadline. Mirrors `rn_socket_timeout`.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) {
        self.write_timeout = timeout;
    }

    pub async fn connect(&self, addr: SocketAddr) -> Result<()> {
        match self.inner.connect(&addr.into()) {
            Ok(()) => return Ok(()),
            Err(e) if e.raw_os_error() == Some(libc::EINPROGRESS) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }
        wait_ready(self.as_raw_fd(), Interest::Write, self.write_timeout).await?;
        match self.inner.take_error()? {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub async fn accept(&self) -> Result<(Socket, SocketAddr)> {
        loop {
            match self.inner.accept() {
                Ok((conn, addr)) => {
                    let conn = Socket::from_socket2(conn)?;
                    let addr = addr
                        .as_socket()
                        .ok_or_else(|| Error::InvalidArgument)?;
                    return Ok((conn, addr));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    wait_ready(self.as_raw_fd(), Interest::Read, self.read_timeout).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Runs `op` (a non-blocking syscall attempt), waiting for
    /// readiness and retrying on `WouldBlock`, and respecting whichever
    /// of `read_timeout`/`write_timeout` applies. After [`MAX_IO_CALLS`]
    /// consecutive retries the operation yields once to the ready queue
    /// (even though the fd may still be apparently ready) before
    /// continuing to retry, so one hot fd can't starve the rest of the
    /// scheduler — it never gives up and fails on its own account.
    async fn retry_io<T>(
        &self,
        interest: Interest,
        mut op: impl FnMut() -> io::Result<T>,
    ) -> Result<T> {
        let timeout = match interest {
            Interest::Read => self.read_timeout,
            Interest::Write => self.write_timeout,
        };
        let fd = self.as_raw_fd();
        let mut consecutive = 0u32;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    consecutive += 1;
                    if consecutive >= MAX_IO_CALLS {
                        consecutive = 0;
                        yield_now().await;
                    }
                    wait_ready(fd, interest, timeout).await?;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.retry_io(Interest::Read, || self.inner.recv(as_uninit(buf)))
            .await
    }

    pub async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.retry_io(Interest::Write, || self.inner.send(buf)).await
    }

    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        self.retry_io(Interest::Read, || {
            let (n, addr) = self.inner.recv_from(as_uninit(buf))?;
            let addr = addr
                .as_socket()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not an IP address"))?;
            Ok((n, addr))
        })
        .await
    }

    pub async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<usize> {
        self.retry_io(Interest::Write, || self.inner.send_to(buf, &addr.into()))
            .await
    }

    pub async fn writev(&self, bufs: &[&[u8]]) -> Result<usize> {
        use std::io::IoSlice;
        let slices: Vec<IoSlice<'_>> = bufs.iter().map(|b| IoSlice::new(b)).collect();
        self.retry_io(Interest::Write, || self.inner.send_vectored(&slices))
            .await
    }

    pub fn shutdown(&self, how: std::net::Shutdown) -> io::Result<()> {
        self.inner.shutdown(how)
    }
}

#[derive(Clone, Copy)]
enum Interest {
    Read,
    Write,
}

async fn wait_ready(fd: RawFd, interest: Interest, timeout: Option<Duration>) -> Result<()> {
    let ready = async {
        match interest {
            Interest::Read => readable(fd).await,
            Interest::Write => writable(fd).await,
        }
    };
    match timeout {
        None => ready.await.map_err(Error::from),
        Some(timeout) => {
            futures_select(ready, sleep(timeout)).await
        }
    }
}

async fn futures_select(
    ready: impl std::future::Future<Output = io::Result<()>>,
    timer: impl std::future::Future<Output = ()>,
) -> Result<()> {
    futures_util::pin_mut!(ready);
    futures_util::pin_mut!(timer);
    match futures_util::future::select(ready, timer).await {
        futures_util::future::Either::Left((res, _)) => res.map_err(Error::from),
        futures_util::future::Either::Right((_, _)) => Err(Error::Timeout),
    }
}

fn as_uninit(buf: &mut [u8]) -> &mut [std::mem::MaybeUninit<u8>] {
    // SAFETY: `socket2`'s recv family only ever writes into the slice, and
    // `u8`/`MaybeUninit<u8>` share layout; the initialized prefix returned
    // by the call is the only part subsequently read.
    unsafe { std::slice::from_raw_parts_mut(buf.as_mut_ptr().cast(), buf.len()) }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

pub(crate) fn domain_for(addr: &SocketAddr) -> Domain {
    match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    }
}
