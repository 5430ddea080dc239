//! System call helper, grounded in `compio-driver`'s `syscall!`.
//!
//! Snapshots `errno` via [`std::io::Error::last_os_error`] immediately
//! after the call returns, before any other code (allocation, logging,
//! further libc calls) gets a chance to clobber it.

/// Runs a libc call returning `-1` on error, converting that into
/// `io::Result` with the errno captured right away.
#[macro_export]
#[doc(hidden)]
macro_rules! syscall {
    (break $e:expr) => {
        loop {
            match $crate::syscall!($e) {
                Ok(res) => break ::std::task::Poll::Ready(Ok(res as usize)),
                Err(e)
                    if e.kind() == ::std::io::ErrorKind::WouldBlock
                        || e.raw_os_error() == Some(::libc::EINPROGRESS) =>
                {
                    break ::std::task::Poll::Pending
                }
                Err(e) if e.kind() == ::std::io::ErrorKind::Interrupted => {}
                Err(e) => break ::std::task::Poll::Ready(Err(e)),
            }
        }
    };
    ($e:expr) => {{
        #[allow(unused_unsafe)]
        let res = unsafe { $e };
        if res == -1 {
            Err(::std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}
