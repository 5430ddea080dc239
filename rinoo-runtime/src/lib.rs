//! The single-threaded task scheduler.
//!
//! Grounded in `compio_runtime::runtime::Runtime`: a thread-local
//! executor that owns one [`rinoo_driver::Poller`] and one
//! [`rinoo_driver::TimerWheel`], runs a tick of ready tasks, then blocks
//! in the poller for the next batch of readiness/timer events. Multiple
//! independent `Runtime`s, one per OS thread, are what `rinoo-dispatcher`
//! fans work out across — this crate only concerns itself with running
//! one.

mod blocking;
mod io;
mod queue;
mod send_wrapper;
mod time;
mod yield_now;

use std::any::Any;
use std::cell::RefCell;
use std::future::Future;
use std::io as stdio;
use std::marker::PhantomData;
use std::os::fd::{AsRawFd, RawFd};
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::task::Waker;
use std::time::{Duration, Instant};

use async_task::{Runnable, Task};
use futures_util::FutureExt;
use rinoo_driver::{Interest, NotifyHandle, Poller, TimerKey, TimerWheel};

pub use blocking::Blocking;
pub use io::{readable, writable, Readiness};
pub use time::{sleep, sleep_until, Sleep};
pub use yield_now::yield_now;

use queue::RunnableQueue;

scoped_tls::scoped_thread_local!(static CURRENT_RUNTIME: Runtime);

/// A spawned task's handle. Resolves to `Err` if the task panicked.
pub type JoinHandle<T> = Task<Result<T, Box<dyn Any + Send>>>;

/// The thread-local scheduler.
///
/// `!Send` by construction (`_not_send` below): a `Runtime` never leaves
/// the thread that created it, matching the "N worker threads, each with
/// an independent scheduler" design.
pub struct Runtime {
    runnables: Box<RunnableQueue>,
    driver: RefCell<Poller>,
    timers: RefCell<TimerWheel>,
    event_interval: usize,
    _not_send: PhantomData<Rc<()>>,
}

impl Runtime {
    pub fn new() -> stdio::Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    fn with_builder(builder: &RuntimeBuilder) -> stdio::Result<Self> {
        Ok(Self {
            runnables: Box::new(RunnableQueue::new()),
            driver: RefCell::new(Poller::new()?),
            timers: RefCell::new(TimerWheel::new()),
            event_interval: builder.event_interval,
            _not_send: PhantomData,
        })
    }

    /// Runs `f` with this runtime set as the current one, if any is set.
    pub fn try_with_current<T, F: FnOnce(&Self) -> T>(f: F) -> Result<T, F> {
        if CURRENT_RUNTIME.is_set() {
            Ok(CURRENT_RUNTIME.with(f))
        } else {
            Err(f)
        }
    }

    /// Runs `f` with this runtime set as the current one.
    ///
    /// # Panics
    /// Panics if there is no runtime running on this thread.
    pub fn with_current<T, F: FnOnce(&Self) -> T>(f: F) -> T {
        if CURRENT_RUNTIME.is_set() {
            CURRENT_RUNTIME.with(f)
        } else {
            panic!("not inside a rinoo runtime");
        }
    }

    /// Spawns `future`, without requiring it to be `'static` or `Send`.
    ///
    /// # Safety
    /// The caller must ensure the future does not outlive data it
    /// borrows.
    pub unsafe fn spawn_unchecked<F: Future>(&self, future: F) -> Task<F::Output> {
        let runnables = self.runnables.as_ref() as *const RunnableQueue;
        let handle = self.driver.borrow().handle();
        let schedule = move |runnable: Runnable| {
            let runnables = &*runnables;
            runnables.schedule(runnable, &handle);
        };
        let (runnable, task) = async_task::spawn_unchecked(future, schedule);
        runnable.schedule();
        task
    }

    /// Runs at most `event_interval` scheduled tasks. Returns whether any
    /// tasks remain after this tick.
    pub fn run(&self) -> bool {
        // SAFETY: `Runtime` is `!Send`, so this call always happens on the
        // thread that owns `self.runnables`.
        unsafe { self.runnables.run(self.event_interval) }
    }

    /// Drives `future` to completion, running the scheduler and polling
    /// the driver for readiness/timer events as needed.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        CURRENT_RUNTIME.set(self, || {
            let mut result = None;
            unsafe { self.spawn_unchecked(async { result = Some(future.await) }) }.detach();
            loop {
                let remaining = self.run();
                if let Some(result) = result.take() {
                    return result;
                }
                if remaining {
                    self.poll_with(Some(Duration::ZERO));
                } else {
                    self.poll();
                }
            }
        })
    }

    /// Spawns a task, catching panics so they surface through the
    /// returned [`JoinHandle`] rather than unwinding across the
    /// scheduler.
    pub fn spawn<F: Future + 'static>(&self, future: F) -> JoinHandle<F::Output> {
        unsafe { self.spawn_unchecked(AssertUnwindSafe(future).catch_unwind()) }
    }

    /// Runs `f` on its own OS thread and resolves once it's done.
    pub fn spawn_blocking<T: Send + 'static>(
        &self,
        f: impl (FnOnce() -> T) + Send + 'static,
    ) -> Blocking<T> {
        blocking::spawn_blocking(f, self.driver.borrow().handle())
    }

    /// A cheaply cloneable handle that wakes this runtime's blocked
    /// [`Runtime::poll_with`] from another thread.
    ///
    /// This is the cross-thread half of `rinoo-dispatcher`'s per-worker
    /// inbox: a job pushed from another thread wakes the owning runtime
    /// via this handle rather than by sharing the `!Send` `Runtime`
    /// itself.
    pub fn notify_handle(&self) -> NotifyHandle {
        self.driver.borrow().handle()
    }

    pub(crate) fn register(&self, fd: RawFd, interest: Interest, waker: Waker) -> stdio::Result<()> {
        self.driver.borrow_mut().register(fd, interest, waker)
    }

    pub(crate) fn deregister(&self, fd: RawFd, interest: Interest) -> stdio::Result<()> {
        self.driver.borrow_mut().deregister(fd, interest)
    }

    pub(crate) fn arm_timer(&self, deadline: Instant, waker: Waker) -> TimerKey {
        self.timers.borrow_mut().insert(deadline, waker)
    }

    pub(crate) fn update_timer_waker(&self, key: TimerKey, waker: Waker) {
        self.timers.borrow_mut().update_waker(key, waker);
    }

    pub(crate) fn cancel_timer(&self, key: TimerKey) {
        self.timers.borrow_mut().cancel(key);
    }

    /// How long the next [`Runtime::poll_with`] should block for, given
    /// the earliest-armed timer.
    pub fn current_timeout(&self) -> Option<Duration> {
        self.timers.borrow().next_timeout()
    }

    /// Polls the driver once, using [`Runtime::current_timeout`].
    pub fn poll(&self) {
        let timeout = self.current_timeout();
        self.poll_with(timeout);
    }

    /// Polls the driver once with an explicit timeout, then expires any
    /// due timers.
    pub fn poll_with(&self, timeout: Option<Duration>) {
        match self.driver.borrow_mut().wait(timeout) {
            Ok(()) => {}
            Err(e) => match e.kind() {
                stdio::ErrorKind::TimedOut | stdio::ErrorKind::Interrupted => {}
                _ => panic!("{e:?}"),
            },
        }
        self.timers.borrow_mut().expire();
    }
}

impl AsRawFd for Runtime {
    fn as_raw_fd(&self) -> RawFd {
        self.driver.borrow().as_raw_fd()
    }
}

/// Builder for [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeBuilder {
    event_interval: usize,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self { event_interval: 61 }
    }

    /// Sets how many ready tasks the scheduler runs per tick before it
    /// checks the driver for new events again.
    pub fn event_interval(&mut self, val: usize) -> &mut Self {
        self.event_interval = val;
        self
    }

    pub fn build(&self) -> stdio::Result<Runtime> {
        Runtime::with_builder(self)
    }
}

/// Spawns `future` on the current thread's runtime.
///
/// # Panics
/// Panics if no runtime is running on this thread.
pub fn spawn<F: Future + 'static>(future: F) -> JoinHandle<F::Output> {
    Runtime::with_current(|rt| rt.spawn(future))
}

/// Runs `f` on its own OS thread via the current runtime.
///
/// # Panics
/// Panics if no runtime is running on this thread.
pub fn spawn_blocking<T: Send + 'static>(f: impl (FnOnce() -> T) + Send + 'static) -> Blocking<T> {
    Runtime::with_current(|rt| rt.spawn_blocking(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn block_on_resolves_a_ready_future() {
        let rt = Runtime::new().unwrap();
        assert_eq!(rt.block_on(async { 1 + 1 }), 2);
    }

    #[test]
    fn spawned_tasks_run_before_block_on_returns() {
        let rt = Runtime::new().unwrap();
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        rt.block_on(async move {
            let handle = spawn(async move {
                ran2.set(true);
            });
            handle.await.unwrap();
        });
        assert!(ran.get());
    }

    #[test]
    fn sleep_resolves_after_its_deadline() {
        let rt = Runtime::new().unwrap();
        let start = Instant::now();
        rt.block_on(sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn spawn_blocking_returns_its_closures_result() {
        let rt = Runtime::new().unwrap();
        let result = rt.block_on(async { spawn_blocking(|| 6 * 7).await.unwrap() });
        assert_eq!(result, 42);
    }

    #[test]
    fn readable_resolves_once_fd_has_data() {
        use std::io::Write;
        use std::os::fd::AsRawFd as _;

        let rt = Runtime::new().unwrap();
        let (mut reader, mut writer) = std::os::unix::net::UnixStream::pair().unwrap();
        reader.set_nonblocking(true).unwrap();
        let fd = reader.as_raw_fd();
        writer.write_all(b"x").unwrap();
        rt.block_on(async move {
            readable(fd).await.unwrap();
            let mut buf = [0u8; 1];
            std::io::Read::read_exact(&mut reader, &mut buf).unwrap();
            assert_eq!(&buf, b"x");
        });
    }
}
