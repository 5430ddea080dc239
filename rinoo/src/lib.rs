//! A single-process, multi-threaded asynchronous I/O runtime.
//!
//! This crate is a thin facade over rinoo's sub-crates, re-exported and
//! gated behind Cargo features the way [`compio`](https://docs.rs/compio)
//! composes its own `compio-*` family.

#![warn(missing_docs)]

pub use rinoo_buf as buf;
pub use rinoo_log as log;

#[cfg(feature = "driver")]
pub use rinoo_driver as driver;

#[cfg(feature = "runtime")]
pub mod runtime {
    //! The thread-local scheduler: task spawning, the readiness poller
    //! and the timer wheel.
    pub use rinoo_runtime::*;
}

#[cfg(feature = "net")]
pub mod net {
    //! Non-blocking TCP sockets driven by the current runtime.
    pub use rinoo_net::*;
}

#[cfg(feature = "signal")]
pub mod signal {
    //! `signalfd`-backed asynchronous signal handling.
    pub use rinoo_signal::*;
}

#[cfg(feature = "fs")]
pub mod fs {
    //! `inotify` filesystem watches surfaced as an async event stream.
    pub use rinoo_fs::*;
}

#[cfg(feature = "dispatcher")]
pub mod dispatcher {
    //! A thread-fan-out pool of additional schedulers.
    pub use rinoo_dispatcher::*;
}

#[cfg(feature = "macros")]
pub use rinoo_macros::*;
