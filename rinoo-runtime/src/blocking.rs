//! One-off blocking task support.
//!
//! Grounded in `compio_runtime::Runtime::spawn_blocking`'s contract (runs
//! `f` on another thread, resolves once it's done, never cancelled once
//! started), but without the teacher's managed thread pool — a plain
//! `std::thread::spawn` per call. A managed pool with round-robin handoff
//! is `rinoo-dispatcher`'s job (the specification's spawn pool), which is
//! a distinct concern from this runtime's single-shot escape hatch for
//! calling blocking code from async context.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use rinoo_driver::NotifyHandle;

struct Shared<T> {
    result: Mutex<Option<std::thread::Result<T>>>,
    waker: Mutex<Option<Waker>>,
}

/// A join handle for a task spawned onto its own OS thread.
pub struct Blocking<T> {
    shared: Arc<Shared<T>>,
}

pub(crate) fn spawn_blocking<T, F>(f: F, handle: NotifyHandle) -> Blocking<T>
where
    T: Send + 'static,
    F: (FnOnce() -> T) + Send + 'static,
{
    let shared = Arc::new(Shared {
        result: Mutex::new(None),
        waker: Mutex::new(None),
    });
    let thread_shared = shared.clone();
    std::thread::spawn(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(f));
        *thread_shared.result.lock().unwrap() = Some(result);
        if let Some(waker) = thread_shared.waker.lock().unwrap().take() {
            waker.wake();
        }
        handle.notify().ok();
    });
    Blocking { shared }
}

impl<T> Future for Blocking<T> {
    type Output = std::thread::Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut result = self.shared.result.lock().unwrap();
        if let Some(result) = result.take() {
            return Poll::Ready(result);
        }
        *self.shared.waker.lock().unwrap() = Some(cx.waker().clone());
        Poll::Pending
    }
}
