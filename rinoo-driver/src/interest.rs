//! Readiness interest a task can register for a file descriptor.

/// Which direction of readiness a task is waiting on.
///
/// Mirrors `compio_driver::op::Interest`, minus its completion-IO
/// baggage — rinoo only ever waits on a single direction per `Key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interest {
    Readable,
    Writable,
}
