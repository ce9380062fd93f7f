//! View Binder
//!
//! An alternate entry point over the same produce/resolve loop as the driver.
//! Instead of swapping rendered nodes into a placeholder position, the binder
//! owns one host element and three ordered hook lists: init hooks fire once
//! before consumption begins, update hooks fire per resolved value with the
//! new and previous values, and teardown hooks fire exactly once when the
//! loop ends, whether by stop, detachment, exhaustion, or failure.
//!
//! Init and update hooks run in registration order; teardown hooks run in
//! reverse registration order. A hook that returns an error is handed to the
//! configured reporter and the remaining hooks of that same run still fire.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::Error;
use crate::tree::{Document, NodeId};
use super::driver::{DriverShared, ErrorHandler, Lifecycle};
use super::source::ReactiveSource;
use super::tracker::Tracker;
use super::value::Value;

/// Runs once, before the first produce.
pub type InitHook = Box<dyn FnOnce(&Document, NodeId) -> Result<(), Error> + Send>;

/// Runs per resolved value with `(doc, element, new, previous)`.
pub type UpdateHook =
    Box<dyn FnMut(&Document, NodeId, &Value, Option<&Value>) -> Result<(), Error> + Send>;

/// Runs once, after the loop ends.
pub type TeardownHook = Box<dyn FnOnce(&Document, NodeId) -> Result<(), Error> + Send>;

/// Receives hook errors. The default logs and continues.
pub type HookReporter = Box<dyn FnMut(Error) + Send>;

/// Hook registrar handed to the setup function of [`bind_view`].
#[derive(Default)]
pub struct ViewHooks {
    element: Option<NodeId>,
    init: Vec<InitHook>,
    update: Vec<UpdateHook>,
    teardown: Vec<TeardownHook>,
}

impl ViewHooks {
    /// Use `node` as the host element instead of a fresh `div`.
    pub fn set_element(&mut self, node: NodeId) {
        self.element = Some(node);
    }

    /// Register an init hook.
    pub fn on_init<F>(&mut self, hook: F)
    where
        F: FnOnce(&Document, NodeId) -> Result<(), Error> + Send + 'static,
    {
        self.init.push(Box::new(hook));
    }

    /// Register an update hook.
    pub fn on_update<F>(&mut self, hook: F)
    where
        F: FnMut(&Document, NodeId, &Value, Option<&Value>) -> Result<(), Error> + Send + 'static,
    {
        self.update.push(Box::new(hook));
    }

    /// Register a teardown hook.
    pub fn on_teardown<F>(&mut self, hook: F)
    where
        F: FnOnce(&Document, NodeId) -> Result<(), Error> + Send + 'static,
    {
        self.teardown.push(Box::new(hook));
    }
}

/// Configuration record for a bound view.
#[derive(Default)]
pub struct BindConfig {
    /// Overrides the produce/resolve error handler. The default re-raises,
    /// which stops the view.
    pub on_error: Option<ErrorHandler>,
    /// Overrides the hook error reporter.
    pub report: Option<HookReporter>,
}

impl BindConfig {
    /// Empty configuration: all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the produce/resolve error handler.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnMut(Error) -> Result<Value, Error> + Send + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Set the hook error reporter.
    pub fn report<F>(mut self, reporter: F) -> Self
    where
        F: FnMut(Error) + Send + 'static,
    {
        self.report = Some(Box::new(reporter));
        self
    }
}

/// Cloneable stop handle for a bound view.
#[derive(Clone)]
pub struct ViewHandle {
    element: NodeId,
    shared: Arc<DriverShared>,
}

impl ViewHandle {
    /// The host element.
    pub fn element(&self) -> NodeId {
        self.element
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

impl std::fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandle")
            .field("element", &self.element)
            .field("state", &self.state())
            .finish()
    }
}

/// A source bound to a host element through hooks.
pub struct BoundView<S: ReactiveSource> {
    tracker: Tracker,
    doc: Document,
    source: S,
    element: NodeId,
    hooks: ViewHooks,
    on_error: ErrorHandler,
    report: HookReporter,
    shared: Arc<DriverShared>,
    initialized: bool,
    finalized: bool,
}

/// Bind `source` to a host element. `setup` registers hooks before
/// consumption begins; if it sets no element a fresh `div` is created.
pub fn bind_view<S, F>(tracker: &Tracker, source: S, setup: F, config: BindConfig) -> BoundView<S>
where
    S: ReactiveSource,
    F: FnOnce(&mut ViewHooks),
{
    let doc = tracker.document().clone();
    let mut hooks = ViewHooks::default();
    setup(&mut hooks);
    let element = hooks
        .element
        .take()
        .unwrap_or_else(|| doc.create_element("div"));
    BoundView {
        tracker: tracker.clone(),
        doc,
        source,
        element,
        hooks,
        on_error: config.on_error.unwrap_or_else(|| Box::new(|error| Err(error))),
        report: config.report.unwrap_or_else(|| {
            Box::new(|hook_error| error!(error = %hook_error, "view hook failed"))
        }),
        shared: Arc::new(DriverShared::new()),
        initialized: false,
        finalized: false,
    }
}

impl<S: ReactiveSource> BoundView<S> {
    /// The host element, to be inserted by the caller.
    pub fn element(&self) -> NodeId {
        self.element
    }

    /// A cloneable stop handle.
    pub fn handle(&self) -> ViewHandle {
        ViewHandle {
            element: self.element,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Fire init hooks once, then consume the source, firing update hooks
    /// per resolved value. The loop's suspension, stop, and cancellation
    /// contract matches the driver's.
    pub async fn run(mut self) {
        if !self.shared.try_begin() {
            self.finalize("stopped before start");
            return;
        }
        debug!(element = self.element.raw(), "view running");

        for hook in std::mem::take(&mut self.hooks.init) {
            if let Err(hook_error) = hook(&self.doc, self.element) {
                (self.report)(hook_error);
            }
        }
        self.initialized = true;

        let mut invalidated = self.tracker.invalidation(self.element);
        let mut stop_rx = self.shared.stop.subscribe();
        let mut previous: Option<Value> = None;
        let mut reason = "stop requested";

        loop {
            let slot = tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stopped| *stopped) => break,
                _ = &mut invalidated => {
                    self.shared.request_stop();
                    reason = "element detached";
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
                Err(produce_error) => match (self.on_error)(produce_error) {
                    Ok(substitute) => substitute,
                    Err(produce_error) => {
                        debug!(error = %produce_error, "produce step failed");
                        reason = "unhandled produce error";
                        break;
                    }
                },
            };

            let value = match value {
                Value::Deferred(future) => {
                    let resolved = tokio::select! {
                        biased;
                        _ = stop_rx.wait_for(|stopped| *stopped) => break,
                        _ = &mut invalidated => {
                            self.shared.request_stop();
                            reason = "element detached";
                            break;
                        }
                        resolved = future => resolved,
                    };
                    if self.shared.stop_requested() {
                        break;
                    }
                    match resolved {
                        Ok(value) => value,
                        Err(resolve_error) => match (self.on_error)(resolve_error) {
                            Ok(substitute) => substitute,
                            Err(resolve_error) => {
                                debug!(error = %resolve_error, "resolve step failed");
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

            for hook in &mut self.hooks.update {
                if let Err(hook_error) =
                    hook(&self.doc, self.element, &value, previous.as_ref())
                {
                    (self.report)(hook_error);
                }
            }
            previous = Some(value);
        }

        self.finalize(reason);
    }

    /// Idempotent stop sequence: cancels the source and, when init already
    /// ran, fires teardown hooks in reverse registration order.
    fn finalize(&mut self, reason: &str) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.shared.request_stop();
        self.source.cancel();
        if self.initialized {
            for hook in std::mem::take(&mut self.hooks.teardown).into_iter().rev() {
                if let Err(hook_error) = hook(&self.doc, self.element) {
                    (self.report)(hook_error);
                }
            }
        }
        debug!(element = self.element.raw(), reason, "view stopped");
    }
}

impl<S: ReactiveSource> Drop for BoundView<S> {
    fn drop(&mut self) {
        if !self.finalized {
            self.finalize("dropped");
        }
    }
}
