//! Fragment Composer
//!
//! A thin fan-out/fan-in layer over the driver. Given an ordered list of
//! template arguments, every reactive source is lifted into its own
//! [`NodeDriver`](super::driver::NodeDriver) and replaced by that driver's
//! placeholder; nested lists are composed recursively; everything else passes
//! through unchanged. The result carries a combined `start` and a combined
//! `stop` for the whole set.
//!
//! The composer holds no lifecycle state of its own. Starting the fragment
//! takes the accumulated driver tasks and awaits them together, so a second
//! `start` finds nothing left to drive and returns immediately. Stopping
//! forwards to every child handle and is as repeatable as the handles are.

use futures_util::future::{join_all, BoxFuture};

use crate::error::Error;
use crate::tree::{Document, NodeId};
use super::driver::{DriverHandle, NodeDriver};
use super::source::ReactiveSource;
use super::tracker::Tracker;
use super::value::{render, Value};

/// One argument to a fragment template.
pub enum TemplateArg {
    /// A reactive source. Composition wraps it in a driver and substitutes
    /// the driver's placeholder.
    Source(Box<dyn ReactiveSource + 'static>),
    /// A nested ordered list, composed recursively.
    List(Vec<TemplateArg>),
    /// Anything else, passed through unchanged.
    Static(Value),
}

impl TemplateArg {
    /// Wrap a source argument.
    pub fn source<S: ReactiveSource + 'static>(source: S) -> Self {
        Self::Source(Box::new(source))
    }

    /// Wrap a static value argument.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Static(value.into())
    }
}

/// One argument after composition.
#[derive(Debug)]
pub enum ComposedArg {
    /// Passed through unchanged.
    Static(Value),
    /// A driver placeholder substituted for a source argument.
    Placeholder(NodeId),
    /// A recursively composed list substituted for a nested list.
    List(Vec<ComposedArg>),
}

/// The substituted argument list plus combined start/stop for its drivers.
pub struct ComposedFragment {
    args: Vec<ComposedArg>,
    tasks: Vec<BoxFuture<'static, ()>>,
    handles: Vec<DriverHandle>,
}

impl ComposedFragment {
    /// The substituted arguments, in the original order.
    pub fn args(&self) -> &[ComposedArg] {
        &self.args
    }

    /// Stop handles of every child driver, in composition order.
    pub fn handles(&self) -> &[DriverHandle] {
        &self.handles
    }

    /// Number of child drivers.
    pub fn driver_count(&self) -> usize {
        self.handles.len()
    }

    /// Drive every child driver to completion. The tasks are taken on the
    /// first call; a second call has nothing left and returns immediately.
    pub async fn start(&mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        join_all(tasks).await;
    }

    /// Request the stop sequence of every child driver.
    pub fn stop(&self) {
        for handle in &self.handles {
            handle.stop();
        }
    }

    /// Append the substituted arguments under `parent`, in order. Static
    /// values are rendered, placeholders are appended as-is, and nested lists
    /// are flattened into the same parent.
    pub fn append_to(&self, doc: &Document, parent: NodeId) -> Result<(), Error> {
        append_args(doc, parent, &self.args)
    }
}

impl std::fmt::Debug for ComposedFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedFragment")
            .field("args", &self.args.len())
            .field("drivers", &self.handles.len())
            .field("started", &self.tasks.is_empty())
            .finish()
    }
}

fn append_args(doc: &Document, parent: NodeId, args: &[ComposedArg]) -> Result<(), Error> {
    for arg in args {
        match arg {
            ComposedArg::Static(value) => {
                if let Some(node) = render(doc, value) {
                    doc.append_child(parent, node)?;
                }
            }
            ComposedArg::Placeholder(placeholder) => {
                doc.append_child(parent, *placeholder)?;
            }
            ComposedArg::List(nested) => append_args(doc, parent, nested)?,
        }
    }
    Ok(())
}

/// Scan `args`, lifting every source into a driver and recursing into nested
/// lists. Pure substitution: no driver starts here.
pub fn compose(tracker: &Tracker, args: Vec<TemplateArg>) -> ComposedFragment {
    let mut tasks = Vec::new();
    let mut handles = Vec::new();
    let args = compose_args(tracker, args, &mut tasks, &mut handles);
    ComposedFragment {
        args,
        tasks,
        handles,
    }
}

fn compose_args(
    tracker: &Tracker,
    args: Vec<TemplateArg>,
    tasks: &mut Vec<BoxFuture<'static, ()>>,
    handles: &mut Vec<DriverHandle>,
) -> Vec<ComposedArg> {
    args.into_iter()
        .map(|arg| match arg {
            TemplateArg::Source(source) => {
                let driver = NodeDriver::new(tracker, source);
                let (placeholder, task, handle) = driver.into_task();
                tasks.push(task);
                handles.push(handle);
                ComposedArg::Placeholder(placeholder)
            }
            TemplateArg::List(nested) => {
                ComposedArg::List(compose_args(tracker, nested, tasks, handles))
            }
            TemplateArg::Static(value) => ComposedArg::Static(value),
        })
        .collect()
}
