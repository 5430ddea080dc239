//! The error taxonomy shared by the driver, runtime, net, signal and fs
//! crates.
//!
//! `WouldBlock` is deliberately absent: inside the scheduler it is never a
//! value an operation returns, only `Poll::Pending` — surfacing it as an
//! error variant would let it leak past the point where it's meaningful.

use std::io;

/// Failure modes produced by rinoo's scheduler, sockets, timers, signals
/// and filesystem watches.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A deadline passed before the operation completed.
    #[error("operation timed out")]
    Timeout,
    /// The operation's task or join handle was cancelled.
    #[error("operation was cancelled")]
    Cancelled,
    /// An underlying OS call failed; the wrapped error's `raw_os_error`
    /// is the errno snapshotted immediately after the syscall returned.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The peer, file, or watch was closed out from under the caller.
    #[error("handle was closed")]
    Closed,
    /// A buffer, queue, or fd table has hit its configured capacity.
    #[error("a capacity limit was exceeded")]
    LimitExceeded,
    /// An allocator refused to supply memory.
    #[error("allocation failed")]
    OutOfMemory,
    /// A caller-supplied argument was invalid for this operation.
    #[error("invalid argument")]
    InvalidArgument,
}

impl From<rinoo_buf::BufferError> for Error {
    fn from(e: rinoo_buf::BufferError) -> Self {
        match e {
            rinoo_buf::BufferError::OutOfMemory => Error::OutOfMemory,
            rinoo_buf::BufferError::LimitExceeded => Error::LimitExceeded,
            rinoo_buf::BufferError::InvalidArgument => Error::InvalidArgument,
        }
    }
}

/// Convenience alias used throughout rinoo's async surface.
pub type Result<T> = std::result::Result<T, Error>;
