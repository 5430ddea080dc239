//! Asynchronous Unix signal handling via `signalfd(2)`.
//!
//! Grounded in `compio_signal::linux`: signals of interest are blocked
//! with `pthread_sigmask` and delivered instead through a `signalfd`
//! descriptor, which this crate registers with the current
//! [`rinoo_runtime::Runtime`]'s readiness poller exactly like any other
//! fd — "Signals are delivered through a dedicated signalfd-like
//! descriptor registered with the poller; handlers are regular tasks"
//! (spec.md §5, "Signal safety"). Linux-only, matching spec.md §1's
//! non-goal of cross-platform abstraction beyond Linux-class readiness
//! APIs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::ptr;

use rinoo_driver::{Error, Result};
use rinoo_log::trace;
use rinoo_runtime::readable;

thread_local! {
    static REGISTERED: RefCell<HashMap<i32, usize>> = RefCell::new(HashMap::new());
}

fn sigset(sig: i32) -> io::Result<libc::sigset_t> {
    let mut set: MaybeUninit<libc::sigset_t> = MaybeUninit::uninit();
    rinoo_driver::syscall!(libc::sigemptyset(set.as_mut_ptr()))?;
    rinoo_driver::syscall!(libc::sigaddset(set.as_mut_ptr(), sig))?;
    // SAFETY: sigemptyset just initialized the set above.
    Ok(unsafe { set.assume_init() })
}

/// Blocks `sig` on the calling thread (idempotent via a refcount), the
/// precondition for `signalfd` to see it rather than the default
/// handler.
fn block(sig: i32) -> io::Result<libc::sigset_t> {
    REGISTERED.with_borrow_mut(|map| {
        let count = map.entry(sig).or_default();
        let set = sigset(sig)?;
        if *count == 0 {
            rinoo_driver::syscall!(libc::pthread_sigmask(libc::SIG_BLOCK, &set, ptr::null_mut()))?;
        }
        *count += 1;
        Ok(set)
    })
}

/// Unblocks `sig` once the last listener for it on this thread is
/// dropped.
fn unblock(sig: i32) -> io::Result<()> {
    REGISTERED.with_borrow_mut(|map| {
        let count = map.entry(sig).or_default();
        *count = count.saturating_sub(1);
        if *count == 0 {
            let set = sigset(sig)?;
            rinoo_driver::syscall!(libc::pthread_sigmask(libc::SIG_UNBLOCK, &set, ptr::null_mut()))?;
        }
        Ok(())
    })
}

/// Information about a single delivered signal.
#[derive(Debug, Clone, Copy)]
pub struct SignalInfo {
    pub signo: i32,
    pub pid: u32,
    pub uid: u32,
}

impl From<libc::signalfd_siginfo> for SignalInfo {
    fn from(info: libc::signalfd_siginfo) -> Self {
        Self {
            signo: info.ssi_signo as i32,
            pid: info.ssi_pid,
            uid: info.ssi_uid,
        }
    }
}

/// A long-lived listener for one signal number, suitable for running as
/// a regular task's receive loop (spec.md §5).
pub struct SignalListener {
    fd: OwnedFd,
    sig: i32,
}

impl SignalListener {
    /// Blocks `sig` on this thread and opens a `signalfd` for it.
    pub fn new(sig: i32) -> Result<Self> {
        let set = block(sig)?;
        let raw = rinoo_driver::syscall!(libc::signalfd(
            -1,
            &set,
            libc::SFD_NONBLOCK | libc::SFD_CLOEXEC
        ))?;
        trace!("listening for signal {} on fd {}", sig, raw);
        // SAFETY: `signalfd` just returned a freshly owned descriptor.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(Self { fd, sig })
    }

    /// Waits for the next delivery of this listener's signal. Callable
    /// repeatedly — `signalfd` stays armed for the listener's lifetime.
    pub async fn recv(&self) -> Result<SignalInfo> {
        let fd = self.fd.as_raw_fd();
        loop {
            let mut info = MaybeUninit::<libc::signalfd_siginfo>::uninit();
            let n = rinoo_driver::syscall!(libc::read(
                fd,
                info.as_mut_ptr().cast(),
                std::mem::size_of::<libc::signalfd_siginfo>(),
            ));
            match n {
                Ok(n) if n as usize == std::mem::size_of::<libc::signalfd_siginfo>() => {
                    // SAFETY: the read filled exactly one signalfd_siginfo.
                    let info = unsafe { info.assume_init() };
                    return Ok(info.into());
                }
                Ok(_) => return Err(Error::Io(io::Error::from(io::ErrorKind::UnexpectedEof))),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => readable(fd).await.map_err(Error::from)?,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl AsRawFd for SignalListener {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        unblock(self.sig).ok();
    }
}

/// Resolves the next time the process receives `SIGINT` ("ctrl-c").
pub async fn ctrl_c() -> Result<()> {
    SignalListener::new(libc::SIGINT)?.recv().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rinoo_runtime::Runtime;

    #[test]
    fn delivers_a_raised_signal() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let listener = SignalListener::new(libc::SIGUSR1).unwrap();
            unsafe {
                libc::raise(libc::SIGUSR1);
            }
            let info = listener.recv().await.unwrap();
            assert_eq!(info.signo, libc::SIGUSR1);
        });
    }

    #[test]
    fn listener_receives_repeated_signals() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let listener = SignalListener::new(libc::SIGUSR2).unwrap();
            for _ in 0..3 {
                unsafe {
                    libc::raise(libc::SIGUSR2);
                }
                let info = listener.recv().await.unwrap();
                assert_eq!(info.signo, libc::SIGUSR2);
            }
        });
    }
}
