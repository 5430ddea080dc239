//! Cross-thread job inbox.
//!
//! The specification's "mpsc of pending registrations" (spec.md §5): a
//! worker's own [`rinoo_runtime::Runtime`] is `!Send` and exclusively
//! touched by its owning thread, so a job submitted from another thread
//! cannot be pushed directly onto its run queue. Instead it lands here,
//! and a single long-lived pump task (spawned on the target runtime)
//! `.await`s [`Inbox::next`] and re-spawns each job locally.
//!
//! Grounded in `rinoo_runtime::queue::RunnableQueue`'s cross-thread half
//! (`SegQueue` + a stored [`Waker`]) and in `rinoo_runtime::Blocking`'s
//! single-slot waker bookkeeping.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crossbeam_queue::SegQueue;
use rinoo_driver::NotifyHandle;

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()>>>;

/// A job submitted to a scheduler: a `Send` closure (it crosses threads)
/// that, once run on the target thread, produces a `!Send` future (it
/// never crosses threads again).
pub(crate) type Job = Box<dyn FnOnce() -> BoxFuture + Send>;

pub(crate) enum Message {
    Job(Job),
    Stop,
}

pub(crate) struct Inbox {
    jobs: SegQueue<Message>,
    waker: Mutex<Option<Waker>>,
}

impl Inbox {
    pub(crate) fn new() -> Self {
        Self {
            jobs: SegQueue::new(),
            waker: Mutex::new(None),
        }
    }

    /// Pushes `message` and wakes whichever side is waiting on it,
    /// either locally (a stored [`Waker`]) or across threads (`notify`).
    pub(crate) fn push(&self, message: Message, notify: &NotifyHandle) {
        self.jobs.push(message);
        if let Some(waker) = self.waker.lock().unwrap().take() {
            waker.wake();
        }
        let _ = notify.notify();
    }

    pub(crate) fn next(self: &Arc<Self>) -> Next {
        Next {
            inbox: self.clone(),
        }
    }
}

pub(crate) struct Next {
    inbox: Arc<Inbox>,
}

impl Future for Next {
    type Output = Message;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(message) = self.inbox.jobs.pop() {
            return Poll::Ready(message);
        }
        *self.inbox.waker.lock().unwrap() = Some(cx.waker().clone());
        // A message may have arrived between the pop above and storing
        // the waker; check once more before yielding.
        match self.inbox.jobs.pop() {
            Some(message) => Poll::Ready(message),
            None => Poll::Pending,
        }
    }
}
