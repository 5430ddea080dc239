//! Cooperative, voluntary rescheduling.
//!
//! Grounded in the same pattern async-task-based executors use for a
//! task to give up its turn without waiting on any external event: wake
//! its own waker immediately (reinserting it at the tail of the ready
//! queue) and return `Pending` exactly once.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Yields once to the scheduler's ready queue, then resumes.
///
/// This is how `rinoo-net`'s `MAX_IO_CALLS` bound is honored: a hot fd
/// that keeps reporting readiness doesn't starve the rest of the ready
/// queue, since the retrying task steps aside for one tick before
/// resuming its retry loop (spec.md §4.4).
pub async fn yield_now() {
    YieldNow { yielded: false }.await;
}

struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runtime;

    #[test]
    fn yields_exactly_once() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let mut polls = 0;
            let fut = yield_now();
            futures_util::pin_mut!(fut);
            std::future::poll_fn(|cx| {
                polls += 1;
                fut.as_mut().poll(cx)
            })
            .await;
            assert_eq!(polls, 2, "first poll must return Pending, second Ready");
        });
    }

    #[test]
    fn lets_other_ready_tasks_run_first() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let rt = Runtime::new().unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));
        rt.block_on(async {
            let order2 = order.clone();
            let yielding = crate::spawn(async move {
                yield_now().await;
                order2.borrow_mut().push("yielding");
            });
            let order3 = order.clone();
            let immediate = crate::spawn(async move {
                order3.borrow_mut().push("immediate");
            });
            yielding.await.unwrap();
            immediate.await.unwrap();
        });
        assert_eq!(*order.borrow(), vec!["immediate", "yielding"]);
    }
}
