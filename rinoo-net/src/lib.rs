//! Async TCP sockets.
//!
//! Builds directly on `rinoo-runtime`'s readiness futures rather than a
//! completion-IO abstraction: every operation here is a non-blocking
//! syscall retried against [`rinoo_runtime::readable`]/[`rinoo_runtime::writable`],
//! matching the scheduler's readiness-poller model end to end.

mod socket;
mod tcp;
mod udp;

pub use rinoo_driver::{Error, Result};
pub use socket::{Socket, MAX_IO_CALLS};
pub use tcp::{TcpListener, TcpStream};
pub use udp::UdpSocket;
