//! Reactive Node Driver
//!
//! The driver is the core state machine of the crate. It owns one reactive
//! source, renders each produced value, and swaps the result into a fixed
//! placeholder position in the tree. It stops, releasing the source, when
//! told to, when the source exhausts, when the placeholder detaches, or when
//! an unrecovered error occurs.
//!
//! # Lifecycle
//!
//! `Idle -> Running -> Stopped`, with `Stopped` terminal. Constructing a
//! driver creates the placeholder but consumes nothing; the caller inserts the
//! placeholder wherever content should appear and then awaits
//! [`NodeDriver::run`].
//!
//! Each iteration has two named suspension points: the **produce step**
//! (waiting for the source's next slot) and the **resolve step** (waiting for
//! a deferred value). Both race against the stop signal and against the
//! placeholder's invalidation, so a stop or a detachment is observed promptly
//! rather than at the next natural yield.
//!
//! # Ordering
//!
//! Within one driver everything is strictly sequential: iteration N+1 never
//! begins before iteration N's render and swap complete. Independent drivers
//! progress independently.
//!
//! # Swap Ordering
//!
//! The swap checks placeholder attachment first, then removes the old node,
//! then inserts the new one before the placeholder. A detached placeholder
//! fails the swap without touching the tree, which ends the loop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::Error;
use crate::tree::{Document, NodeId};
use super::source::ReactiveSource;
use super::tracker::Tracker;
use super::value::{render, Value};

/// Lifecycle state of one driver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, not yet consuming.
    Idle,
    /// Consuming the source.
    Running,
    /// Terminal. No transition leaves this state.
    Stopped,
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Handler for produce/resolve failures. Returning `Ok` substitutes a value
/// for the failed slot (rendering an error indicator in place of content);
/// returning `Err` stops the driver. The default re-raises.
pub type ErrorHandler = Box<dyn FnMut(Error) -> Result<Value, Error> + Send>;

/// Swap operation: `(doc, placeholder, new, previous) -> succeeded`.
pub type SwapFn = Box<dyn FnMut(&Document, NodeId, Option<NodeId>, Option<NodeId>) -> bool + Send>;

/// The default swap: placeholder attachment is checked first, then the old
/// node is removed, then the new one is inserted before the placeholder.
pub fn default_swap(
    doc: &Document,
    placeholder: NodeId,
    new: Option<NodeId>,
    previous: Option<NodeId>,
) -> bool {
    if !doc.is_connected(placeholder) {
        return false;
    }
    if let Some(previous) = previous {
        if doc.detach(previous).is_err() {
            return false;
        }
    }
    if let Some(new) = new {
        if doc.insert_before(new, placeholder).is_err() {
            return false;
        }
    }
    true
}

/// Configuration record for a driver, with documented defaults: the
/// re-raising error handler and [`default_swap`].
#[derive(Default)]
pub struct DriverConfig {
    /// Overrides the error handler.
    pub on_error: Option<ErrorHandler>,
    /// Overrides the swap operation.
    pub swap: Option<SwapFn>,
}

impl DriverConfig {
    /// Empty configuration: all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error handler.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnMut(Error) -> Result<Value, Error> + Send + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Set the swap operation.
    pub fn swap<F>(mut self, swap: F) -> Self
    where
        F: FnMut(&Document, NodeId, Option<NodeId>, Option<NodeId>) -> bool + Send + 'static,
    {
        self.swap = Some(Box::new(swap));
        self
    }
}

pub(crate) struct DriverShared {
    state: AtomicU8,
    pub(crate) stop: watch::Sender<bool>,
}

impl DriverShared {
    pub(crate) fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            state: AtomicU8::new(IDLE),
            stop,
        }
    }

    /// Mark `Stopped` and release pending suspensions. Safe to call any
    /// number of times.
    pub(crate) fn request_stop(&self) {
        self.state.store(STOPPED, Ordering::SeqCst);
        self.stop.send_replace(true);
    }

    /// Atomically enter `Running`. Fails if a stop already happened.
    pub(crate) fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        match self.state.load(Ordering::SeqCst) {
            IDLE => Lifecycle::Idle,
            RUNNING => Lifecycle::Running,
            _ => Lifecycle::Stopped,
        }
    }
}

/// Cloneable stop handle for a driver.
///
/// `stop` is callable any time: before the driver starts, re-entrantly from
/// the error handler, or from a tracker callback. It triggers the stop
/// sequence immediately and does not wait for the loop to observe it.
#[derive(Clone)]
pub struct DriverHandle {
    placeholder: NodeId,
    shared: Arc<DriverShared>,
}

impl DriverHandle {
    /// The driver's placeholder node.
    pub fn placeholder(&self) -> NodeId {
        self.placeholder
    }

    /// Request the stop sequence.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.shared.lifecycle()
    }
}

impl std::fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverHandle")
            .field("placeholder", &self.placeholder)
            .field("state", &self.state())
            .finish()
    }
}

/// Drives one reactive source into one placeholder position.
pub struct NodeDriver<S: ReactiveSource> {
    tracker: Tracker,
    doc: Document,
    source: S,
    placeholder: NodeId,
    rendered: Option<NodeId>,
    on_error: ErrorHandler,
    swap: SwapFn,
    shared: Arc<DriverShared>,
    finalized: bool,
}

impl<S: ReactiveSource> NodeDriver<S> {
    /// Create a driver with default configuration. Does not begin consuming
    /// the source.
    pub fn new(tracker: &Tracker, source: S) -> Self {
        Self::with_config(tracker, source, DriverConfig::new())
    }

    /// Create a driver with explicit configuration.
    pub fn with_config(tracker: &Tracker, source: S, config: DriverConfig) -> Self {
        let doc = tracker.document().clone();
        let placeholder = doc.create_marker();
        Self {
            tracker: tracker.clone(),
            doc,
            source,
            placeholder,
            rendered: None,
            on_error: config.on_error.unwrap_or_else(|| Box::new(|error| Err(error))),
            swap: config.swap.unwrap_or_else(|| Box::new(default_swap)),
            shared: Arc::new(DriverShared::new()),
            finalized: false,
        }
    }

    /// The placeholder node, to be inserted by the caller at the desired
    /// position.
    pub fn placeholder(&self) -> NodeId {
        self.placeholder
    }

    /// A cloneable stop handle.
    pub fn handle(&self) -> DriverHandle {
        DriverHandle {
            placeholder: self.placeholder,
            shared: Arc::clone(&self.shared),
        }
    }

    /// The `start` operation: consume the source until stopped, exhausted,
    /// detached, or failed. Ownership makes repeated starts impossible; a
    /// stop requested before the first call yields zero renders and runs the
    /// stop sequence exactly once.
    pub async fn run(mut self) {
        if !self.shared.try_begin() {
            self.finalize("stopped before start");
            return;
        }
        debug!(placeholder = self.placeholder.raw(), "driver running");

        let mut invalidated = self.tracker.invalidation(self.placeholder);
        let mut stop_rx = self.shared.stop.subscribe();
        let mut reason = "stop requested";

        loop {
            // Produce step.
            let slot = tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stopped| *stopped) => break,
                _ = &mut invalidated => {
                    self.shared.request_stop();
                    reason = "placeholder detached";
                    break;
                }
                slot = self.source.produce() => slot,
            };
            let Some(slot) = slot else {
                reason = "source exhausted";
                break;
            };
            if self.shared.stop_requested() {
                break;
            }
            let value = match slot {
                Ok(value) => value,
                Err(error) => match (self.on_error)(error) {
                    Ok(substitute) => substitute,
                    Err(error) => {
                        debug!(error = %error, "produce step failed");
                        reason = "unhandled produce error";
                        break;
                    }
                },
            };

            // Resolve step.
            let value = match value {
                Value::Deferred(future) => {
                    let resolved = tokio::select! {
                        biased;
                        _ = stop_rx.wait_for(|stopped| *stopped) => break,
                        _ = &mut invalidated => {
                            self.shared.request_stop();
                            reason = "placeholder detached";
                            break;
                        }
                        resolved = future => resolved,
                    };
                    if self.shared.stop_requested() {
                        break;
                    }
                    match resolved {
                        Ok(value) => value,
                        Err(error) => match (self.on_error)(error) {
                            Ok(substitute) => substitute,
                            Err(error) => {
                                debug!(error = %error, "resolve step failed");
                                reason = "unhandled resolve error";
                                break;
                            }
                        },
                    }
                }
                value => value,
            };
            if self.shared.stop_requested() {
                break;
            }

            // Render and, when identity changed, swap.
            if let Some(new) = render(&self.doc, &value) {
                if Some(new) != self.rendered {
                    if !(self.swap)(&self.doc, self.placeholder, Some(new), self.rendered) {
                        reason = "swap failed";
                        break;
                    }
                    trace!(node = new.raw(), "rendered");
                    self.rendered = Some(new);
                }
            }
        }

        self.finalize(reason);
    }

    /// The placeholder/start/stop triple in boxed form, for callers that hold
    /// heterogeneous drivers.
    pub fn into_task(self) -> (NodeId, BoxFuture<'static, ()>, DriverHandle)
    where
        S: 'static,
    {
        let placeholder = self.placeholder;
        let handle = self.handle();
        (placeholder, self.run().boxed(), handle)
    }

    /// The stop sequence. Idempotent: only the first call has effect. Marks
    /// the terminal state, cancels the source, and releases any pending
    /// suspension.
    fn finalize(&mut self, reason: &str) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.shared.request_stop();
        self.source.cancel();
        debug!(placeholder = self.placeholder.raw(), reason, "driver stopped");
    }
}

impl<S: ReactiveSource> Drop for NodeDriver<S> {
    fn drop(&mut self) {
        // A driver dropped without running still releases its source.
        if !self.finalized {
            self.finalize("dropped");
        }
    }
}
