//! Readiness-based I/O driver and timer wheel.
//!
//! One [`Poller`] is owned by each scheduler thread (see `rinoo-runtime`);
//! it wraps a single `polling::Poller` (epoll/kqueue/IOCP depending on
//! platform) and hands out wakeups to registered futures. A [`TimerWheel`]
//! lives alongside it for deadline-based waits (`socket_timeout`, sleep
//! futures, `rn_scheduler_run`'s timeout handling).
//!
//! Scope is deliberately narrower than `compio-driver`: no io_uring/IOCP
//! completion path, no AIO, no buffer pools — just the readiness model
//! the specification calls for.

mod error;
mod interest;
#[doc(hidden)]
pub mod macros;
mod poller;
mod timer;

pub use error::{Error, Result};
pub use interest::Interest;
pub use poller::{NotifyHandle, Poller};
pub use timer::{TimerKey, TimerWheel};

pub use std::os::fd::RawFd;
