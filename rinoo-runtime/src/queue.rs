//! The scheduler's ready queue.
//!
//! Grounded in `compio_runtime::runtime::RunnableQueue`: a fast, `!Send`
//! local queue for the common case (a task wakes itself, or is woken by
//! another task on the same thread), and a `SegQueue` for the cross-thread
//! case (a task's waker is woken from a different OS thread, as happens
//! once `rinoo-signal`'s signalfd reader or a blocking task's completion
//! notification crosses threads).

use std::cell::RefCell;
use std::collections::VecDeque;

use async_task::Runnable;
use crossbeam_queue::SegQueue;
use rinoo_driver::NotifyHandle;

use crate::send_wrapper::SendWrapper;

pub(crate) struct RunnableQueue {
    local: SendWrapper<RefCell<VecDeque<Runnable>>>,
    cross_thread: SegQueue<Runnable>,
}

impl RunnableQueue {
    pub fn new() -> Self {
        Self {
            local: SendWrapper::new(RefCell::new(VecDeque::new())),
            cross_thread: SegQueue::new(),
        }
    }

    /// Schedules a runnable task, waking the owning thread's poller if
    /// this call came from a different thread.
    pub fn schedule(&self, runnable: Runnable, handle: &NotifyHandle) {
        if let Some(local) = self.local.get() {
            local.borrow_mut().push_back(runnable);
        } else {
            self.cross_thread.push(runnable);
            handle.notify().ok();
        }
    }

    /// Runs up to `budget` runnables this tick, alternating local and
    /// cross-thread so neither queue can starve the other. Returns
    /// whether any runnables remain.
    ///
    /// # Safety
    /// Must be called from the thread that created this queue.
    pub unsafe fn run(&self, budget: usize) -> bool {
        let local = self.local.get_unchecked();
        for _ in 0..budget {
            let next_local = local.borrow_mut().pop_front();
            let had_local = next_local.is_some();
            if let Some(task) = next_local {
                task.run();
            }
            let had_cross_thread = !self.cross_thread.is_empty();
            if had_cross_thread {
                if let Some(task) = self.cross_thread.pop() {
                    task.run();
                }
            } else if !had_local {
                break;
            }
        }
        !(local.borrow().is_empty() && self.cross_thread.is_empty())
    }
}
