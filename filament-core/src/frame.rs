//! Frame Queue
//!
//! A deferred-check scheduler: callbacks are queued and run once on the next
//! pump, never immediately. The tracker uses this to delay its first
//! connectivity check so a caller has a chance to finish inserting a node into
//! the tree before the check runs.
//!
//! Production hosts pump the queue from their render loop, one
//! [`FrameQueue::run_pending`] per frame. Tests pump it directly, which makes
//! the "next rendering opportunity" a deterministic, inspectable step.
//!
//! Callbacks scheduled while a drain is in progress land on the following
//! drain: one `run_pending` call is exactly one deferred-check cycle.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

type FrameCallback = Box<dyn FnOnce() + Send>;

/// A cloneable FIFO of deferred callbacks.
#[derive(Clone, Default)]
pub struct FrameQueue {
    pending: Arc<Mutex<VecDeque<FrameCallback>>>,
}

impl FrameQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback to run on the next pump.
    pub fn schedule<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.lock().push_back(Box::new(callback));
    }

    /// Run every callback queued before this call, in order. Returns how many
    /// ran. Callbacks queued during the drain wait for the next one.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<FrameCallback> = {
            let mut pending = self.pending.lock();
            pending.drain(..).collect()
        };
        let count = batch.len();
        if count > 0 {
            trace!(count, "frame queue drained");
        }
        for callback in batch {
            callback();
        }
        count
    }

    /// Number of callbacks currently queued.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn callbacks_do_not_run_until_pumped() {
        let frames = FrameQueue::new();
        let ran = Arc::new(AtomicI32::new(0));
        let ran_clone = ran.clone();

        frames.schedule(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(frames.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(frames.run_pending(), 0);
    }

    #[test]
    fn callbacks_run_in_order() {
        let frames = FrameQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            frames.schedule(move || order.lock().push(i));
        }

        frames.run_pending();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn callback_scheduled_during_drain_waits_for_next_drain() {
        let frames = FrameQueue::new();
        let ran = Arc::new(AtomicI32::new(0));

        let frames_clone = frames.clone();
        let ran_clone = ran.clone();
        frames.schedule(move || {
            let ran_inner = ran_clone.clone();
            frames_clone.schedule(move || {
                ran_inner.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert_eq!(frames.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        assert_eq!(frames.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
