//! Sleep future on top of [`rinoo_driver::TimerWheel`].
//!
//! Grounded in `compio_runtime::runtime::time::TimerFuture`: cancels its
//! timer wheel entry on drop, so a dropped/cancelled sleep never leaves a
//! dangling waker behind.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use rinoo_driver::TimerKey;

use crate::Runtime;

/// Returns a future that resolves after `duration` has elapsed, driven by
/// the current runtime's timer wheel.
pub fn sleep(duration: Duration) -> Sleep {
    Sleep {
        deadline: Instant::now() + duration,
        key: None,
    }
}

/// Returns a future that resolves at `deadline`.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep { deadline, key: None }
}

pub struct Sleep {
    deadline: Instant,
    key: Option<TimerKey>,
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if Instant::now() >= self.deadline {
            self.key = None;
            return Poll::Ready(());
        }
        match self.key {
            Some(key) => {
                Runtime::with_current(|rt| rt.update_timer_waker(key, cx.waker().clone()));
            }
            None => {
                let deadline = self.deadline;
                let key = Runtime::with_current(|rt| rt.arm_timer(deadline, cx.waker().clone()));
                self.key = Some(key);
            }
        }
        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let _ = Runtime::try_with_current(|rt| rt.cancel_timer(key));
        }
    }
}
