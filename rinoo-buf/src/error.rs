//! Error taxonomy for buffer operations.
//!
//! Kept separate from the driver/runtime `Error` type (see `rinoo-driver`)
//! so this crate has no dependency on the driver crate: a buffer can be
//! built and manipulated without ever touching the scheduler.

/// Failure modes a [`crate::Buffer`] operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// The buffer's class could not supply backing memory.
    #[error("buffer allocator returned no memory")]
    OutOfMemory,
    /// Growing the buffer would exceed its class's `maxsize`, or the
    /// buffer is non-owning (`msize == 0`) and cannot grow at all.
    #[error("buffer capacity exceeded")]
    LimitExceeded,
    /// The requested operation does not apply to the buffer's current
    /// state (e.g. parsing non-UTF-8 content as a string).
    #[error("invalid argument")]
    InvalidArgument,
}
