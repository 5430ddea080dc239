//! Readiness futures: `await`able wrappers around [`rinoo_driver::Poller`].
//!
//! These are the translation of the specification's "task blocks on fd
//! readiness" primitive into `Future`s — the execution-model choice
//! recorded in `SPEC_FULL.md` (futures driven by the scheduler, rather
//! than raw stackful-coroutine context switches). A caller loops a
//! non-blocking syscall against one of these:
//!
//! ```ignore
//! loop {
//!     match socket.try_recv(buf) {
//!         Err(e) if e.kind() == io::ErrorKind::WouldBlock => readable(fd).await?,
//!         other => break other,
//!     }
//! }
//! ```

use std::future::Future;
use std::io;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::task::{Context, Poll};

use rinoo_driver::Interest;

use crate::Runtime;

/// Waits for `fd` to become readable.
pub fn readable(fd: RawFd) -> Readiness {
    Readiness::new(fd, Interest::Readable)
}

/// Waits for `fd` to become writable.
pub fn writable(fd: RawFd) -> Readiness {
    Readiness::new(fd, Interest::Writable)
}

/// A future that resolves once, the first time its fd/interest pair
/// becomes ready.
pub struct Readiness {
    fd: RawFd,
    interest: Interest,
    state: State,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Registered,
    Done,
}

impl Readiness {
    fn new(fd: RawFd, interest: Interest) -> Self {
        Self {
            fd,
            interest,
            state: State::Init,
        }
    }
}

impl Future for Readiness {
    type Output = io::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.state {
            State::Done => unreachable!("polled a Readiness future after completion"),
            State::Registered => {
                self.state = State::Done;
                Poll::Ready(Ok(()))
            }
            State::Init => {
                let result =
                    Runtime::with_current(|rt| rt.register(self.fd, self.interest, cx.waker().clone()));
                if let Err(e) = result {
                    self.state = State::Done;
                    return Poll::Ready(Err(e));
                }
                self.state = State::Registered;
                Poll::Pending
            }
        }
    }
}

impl Drop for Readiness {
    fn drop(&mut self) {
        if self.state == State::Registered {
            let _ = Runtime::try_with_current(|rt| rt.deregister(self.fd, self.interest));
        }
    }
}
