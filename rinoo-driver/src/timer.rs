//! Timer wheel keyed by absolute deadline.
//!
//! Grounded in `compio_runtime::runtime::time::TimerRuntime`, with one
//! deliberate change: the teacher orders its `BinaryHeap<Reverse<TimerEntry>>`
//! by delay alone, so two timers armed for the same millisecond fire in
//! whatever order the heap happens to pop them. rinoo's timers are
//! required to tie-break by insertion order (the first deadline armed
//! fires first), so the wheel here is a `BTreeMap` keyed by
//! `(deadline_ms, insertion_seq)` instead — `BTreeMap`'s iteration order
//! already is the tie-break we need, with no extra bookkeeping.

use std::collections::BTreeMap;
use std::task::Waker;
use std::time::{Duration, Instant};

/// Handle to an armed timer, used to cancel it before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerKey {
    deadline_ms: u64,
    seq: u64,
}

/// A deadline-ordered queue of wakers.
///
/// `origin` is the instant `deadline_ms == 0` refers to; all deadlines
/// are milliseconds elapsed since `origin`, so ordering is a plain
/// integer comparison rather than repeated `Instant` subtraction.
pub struct TimerWheel {
    origin: Instant,
    next_seq: u64,
    entries: BTreeMap<TimerKey, Waker>,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            next_seq: 0,
            entries: BTreeMap::new(),
        }
    }

    fn deadline_ms(&self, deadline: Instant) -> u64 {
        deadline.saturating_duration_since(self.origin).as_millis() as u64
    }

    /// Arms a timer that fires at `deadline`, waking `waker` when it
    /// expires. Returns a key that can later be passed to
    /// [`TimerWheel::cancel`].
    pub fn insert(&mut self, deadline: Instant, waker: Waker) -> TimerKey {
        let key = TimerKey {
            deadline_ms: self.deadline_ms(deadline),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, waker);
        key
    }

    /// Arms a timer `delay` from now.
    pub fn insert_after(&mut self, delay: Duration, waker: Waker) -> TimerKey {
        self.insert(Instant::now() + delay, waker)
    }

    /// Replaces the waker for an already-armed timer (used when a future
    /// is polled again with a new waker before its deadline).
    pub fn update_waker(&mut self, key: TimerKey, waker: Waker) {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = waker;
        }
    }

    /// Cancels a timer before it fires. A no-op if it already fired.
    pub fn cancel(&mut self, key: TimerKey) {
        self.entries.remove(&key);
    }

    /// How long until the next timer expires, if any is armed.
    pub fn next_timeout(&self) -> Option<Duration> {
        let (key, _) = self.entries.iter().next()?;
        let now_ms = self.deadline_ms(Instant::now());
        Some(if key.deadline_ms <= now_ms {
            Duration::ZERO
        } else {
            Duration::from_millis(key.deadline_ms - now_ms)
        })
    }

    /// Wakes and removes every timer whose deadline has passed, in
    /// `(deadline, insertion order)` order.
    pub fn expire(&mut self) {
        let now_ms = self.deadline_ms(Instant::now());
        let expired: Vec<TimerKey> = self
            .entries
            .range(
                ..=TimerKey {
                    deadline_ms: now_ms,
                    seq: u64::MAX,
                },
            )
            .map(|(k, _)| *k)
            .collect();
        for key in expired {
            if let Some(waker) = self.entries.remove(&key) {
                waker.wake();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::task::Wake;

    struct TaggedWaker {
        id: u32,
        log: Arc<Mutex<Vec<u32>>>,
    }

    impl Wake for TaggedWaker {
        fn wake(self: Arc<Self>) {
            self.log.lock().unwrap().push(self.id);
        }
    }

    fn waker_for(id: u32, log: &Arc<Mutex<Vec<u32>>>) -> Waker {
        Waker::from(Arc::new(TaggedWaker { id, log: log.clone() }))
    }

    #[test]
    fn fires_ties_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut wheel = TimerWheel::new();
        let deadline = Instant::now();
        wheel.insert(deadline, waker_for(1, &log));
        wheel.insert(deadline, waker_for(2, &log));
        wheel.insert(deadline, waker_for(3, &log));
        std::thread::sleep(Duration::from_millis(5));
        wheel.expire();
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert!(wheel.is_empty());
    }

    #[test]
    fn cancel_prevents_firing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut wheel = TimerWheel::new();
        let key = wheel.insert_after(Duration::from_millis(0), waker_for(1, &log));
        wheel.cancel(key);
        std::thread::sleep(Duration::from_millis(5));
        wheel.expire();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn next_timeout_reflects_earliest_deadline() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut wheel = TimerWheel::new();
        assert!(wheel.next_timeout().is_none());
        wheel.insert_after(Duration::from_secs(10), waker_for(1, &log));
        let timeout = wheel.next_timeout().unwrap();
        assert!(timeout <= Duration::from_secs(10));
    }
}
