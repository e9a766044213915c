//! A minimal single-threaded executor.
//!
//! The fused-step evaluator and the stepping engine are hand-recursed
//! `Pin<Box<dyn Future>>` trees with no runtime of their own (see
//! `stepwise-compiler`'s `fused` module); something has to poll them.
//! This is that something, for embedders that don't already run one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

struct NoopWaker;

impl Wake for NoopWaker {
    fn wake(self: Arc<Self>) {}
    fn wake_by_ref(self: &Arc<Self>) {}
}

/// Drives `future` to completion by busy-polling with a waker that never
/// schedules a wakeup. Correct for this crate's own futures, which only
/// ever return `Pending` while waiting on a nested poll within the same
/// call (never on genuine external I/O) — an embedding host that awaits
/// real I/O from an `AsyncExpr`/`AsyncBuiltInFn` should drive `exec`
/// through its own runtime instead.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let waker = Waker::from(Arc::new(NoopWaker));
    let mut cx = Context::from_waker(&waker);
    let mut future = Box::pin(future);
    loop {
        if let Poll::Ready(value) = Pin::new(&mut future).poll(&mut cx) {
            return value;
        }
        std::hint::spin_loop();
    }
}
