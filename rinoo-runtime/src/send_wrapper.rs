// Copyright 2017 Thomas Keh.
// Copyright 2024 compio-rs
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lets a `!Send` value travel inside a `Send` closure, panicking if it's
//! ever actually touched from a thread other than the one that created it.
//!
//! The scheduler's runnable queue needs this: `async_task`'s `schedule`
//! closure must be `Send` because a task's waker can be woken from any
//! thread, but the local queue it usually pushes into only makes sense on
//! the owning thread. [`SendWrapper::get`] returns `None` off-thread so
//! the scheduler can fall back to the cross-thread-safe queue instead.

use std::{
    cell::Cell,
    mem::{self, ManuallyDrop},
    thread::{self, ThreadId},
};

thread_local! {
    static THREAD_ID: Cell<ThreadId> = Cell::new(thread::current().id());
}

fn current_id() -> ThreadId {
    THREAD_ID.get()
}

pub struct SendWrapper<T> {
    data: ManuallyDrop<T>,
    thread_id: ThreadId,
}

impl<T> SendWrapper<T> {
    #[inline]
    pub fn new(data: T) -> SendWrapper<T> {
        SendWrapper {
            data: ManuallyDrop::new(data),
            thread_id: current_id(),
        }
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.thread_id == current_id()
    }

    /// # Safety
    /// The caller must be on the same thread as the creator.
    #[inline]
    pub unsafe fn get_unchecked(&self) -> &T {
        &self.data
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.valid() { Some(&self.data) } else { None }
    }
}

unsafe impl<T> Send for SendWrapper<T> {}
unsafe impl<T> Sync for SendWrapper<T> {}

impl<T> Drop for SendWrapper<T> {
    #[track_caller]
    fn drop(&mut self) {
        if !mem::needs_drop::<T>() || self.valid() {
            unsafe {
                ManuallyDrop::drop(&mut self.data);
            }
        } else if !thread::panicking() {
            panic!(
                "dropped a SendWrapper<T> from a thread different to the one it was created with"
            );
        }
    }
}
