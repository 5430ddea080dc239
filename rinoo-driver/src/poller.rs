//! The readiness poller: one per scheduler, wrapping a single
//! `polling::Poller` and a table of per-fd waiter slots.
//!
//! Grounded in `compio_driver::poll::{Driver, FdQueue}`, stripped of its
//! completion-IO (`OpCode`/`Decision`/AIO) machinery — rinoo's operations
//! are plain futures that register interest and get polled again when
//! woken, so there is no "operate on event" dispatch step here, only
//! readiness delivery.

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::sync::Arc;
use std::task::Waker;
use std::time::Duration;

use polling::{Event, Events, Poller as RawPoller};
use rinoo_log::{instrument, trace};

use crate::interest::Interest;

/// Per-fd record: at most one waiter per direction, matching the
/// "IN/OUT waiter slot" scheduler node from the design notes. A second
/// `register` call for the same direction replaces the previous waker —
/// callers are expected to register once per poll and re-register after
/// being woken, the same protocol `Future::poll` already implies.
#[derive(Default)]
struct SchedulerNode {
    read: Option<Waker>,
    write: Option<Waker>,
    /// Set when `polling` reports an error/hangup condition for this fd;
    /// surfaced to both waiters on the next wake.
    error: Option<io::Error>,
}

impl SchedulerNode {
    fn event(&self, fd: RawFd) -> Event {
        Event {
            key: fd as usize,
            readable: self.read.is_some(),
            writable: self.write.is_some(),
        }
    }

    fn is_empty(&self) -> bool {
        self.read.is_none() && self.write.is_none()
    }
}

/// The readiness-event driver. Not `Sync`: a scheduler owns exactly one
/// of these on whichever thread it runs on, and cross-thread wakeups go
/// through [`NotifyHandle`] instead.
pub struct Poller {
    poll: Arc<RawPoller>,
    registry: HashMap<RawFd, SchedulerNode>,
    events: Events,
}

impl Poller {
    pub fn new() -> io::Result<Self> {
        trace!("creating readiness poller");
        Ok(Self {
            poll: Arc::new(RawPoller::new()?),
            registry: HashMap::new(),
            events: Events::new(),
        })
    }

    /// Registers interest in `fd` becoming ready for `interest`, waking
    /// `waker` exactly once when it does (or when an error/hangup is
    /// observed on the fd). Safe to call repeatedly to refresh the
    /// waker; must not be called with different fds sharing the same
    /// raw value while one is still registered.
    pub fn register(&mut self, fd: RawFd, interest: Interest, waker: Waker) -> io::Result<()> {
        instrument!(rinoo_log::Level::TRACE, "register", fd, ?interest);
        let need_add = !self.registry.contains_key(&fd);
        let node = self.registry.entry(fd).or_default();
        match interest {
            Interest::Readable => node.read = Some(waker),
            Interest::Writable => node.write = Some(waker),
        }
        let event = node.event(fd);
        if need_add {
            self.poll.add(fd, event)?;
        } else {
            let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
            self.poll.modify(borrowed, event)?;
        }
        Ok(())
    }

    /// Cancels a previously registered interest without waking it.
    pub fn deregister(&mut self, fd: RawFd, interest: Interest) -> io::Result<()> {
        let Some(node) = self.registry.get_mut(&fd) else {
            return Ok(());
        };
        match interest {
            Interest::Readable => node.read = None,
            Interest::Writable => node.write = None,
        }
        self.renew(fd)
    }

    fn renew(&mut self, fd: RawFd) -> io::Result<()> {
        let node = self.registry.get(&fd).expect("fd must be registered");
        if node.is_empty() {
            let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
            self.poll.delete(borrowed)?;
            self.registry.remove(&fd);
        } else {
            let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
            self.poll.modify(borrowed, node.event(fd))?;
        }
        Ok(())
    }

    /// Blocks until at least one registered fd is ready, a pending
    /// wakeup notification arrives, or `timeout` elapses. Wakes every
    /// waiter whose interest was satisfied.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        instrument!(rinoo_log::Level::TRACE, "wait", ?timeout);
        self.events.clear();
        self.poll.wait(&mut self.events, timeout)?;
        let ready: Vec<(RawFd, Event)> = self
            .events
            .iter()
            .map(|event| (event.key as RawFd, event))
            .collect();
        for (fd, event) in ready {
            self.deliver(fd, event)?;
        }
        Ok(())
    }

    fn deliver(&mut self, fd: RawFd, event: Event) -> io::Result<()> {
        let Some(node) = self.registry.get_mut(&fd) else {
            trace!("spurious event for unregistered fd {}", fd);
            return Ok(());
        };
        if event.readable {
            if let Some(waker) = node.read.take() {
                waker.wake();
            }
        }
        if event.writable {
            if let Some(waker) = node.write.take() {
                waker.wake();
            }
        }
        self.renew(fd)
    }

    pub fn handle(&self) -> NotifyHandle {
        NotifyHandle {
            poll: self.poll.clone(),
        }
    }
}

impl AsRawFd for Poller {
    fn as_raw_fd(&self) -> RawFd {
        self.poll.as_raw_fd()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        for fd in self.registry.keys() {
            let borrowed = unsafe { BorrowedFd::borrow_raw(*fd) };
            self.poll.delete(borrowed).ok();
        }
    }
}

/// A cheaply cloneable, `Send + Sync` handle used to wake a scheduler
/// blocked in [`Poller::wait`] from another thread — the cross-thread
/// half of the `SegQueue`-based wakeup path used by `rinoo-runtime`.
#[derive(Clone)]
pub struct NotifyHandle {
    poll: Arc<RawPoller>,
}

impl NotifyHandle {
    pub fn notify(&self) -> io::Result<()> {
        self.poll.notify()
    }
}
