//! Reactive Bindings
//!
//! This module implements the reactive half of the crate: sources, values,
//! invalidation, tracking, and the drivers that tie an asynchronous sequence
//! of values to a position in the document.
//!
//! # Concepts
//!
//! ## Sources
//!
//! A [`ReactiveSource`] is anything with an asynchronous "produce next"
//! operation and an optional cancel. Streams, in-memory queues, and channels
//! all adapt to it; a driver requires nothing else of its input.
//!
//! ## Values
//!
//! Each produced slot is a [`Value`]: a primitive, an existing node, an
//! iterable, an opaque marker, or a deferred computation that resolves to
//! another value. [`render`] turns a value into a node in the document.
//!
//! ## Invalidation
//!
//! Every tracked node has at most one [`Invalidation`]: a cloneable future
//! that completes when the node leaves the live tree. Entries are memoized in
//! a side table, so repeated lookups for one node share one future.
//!
//! ## Drivers
//!
//! A [`NodeDriver`] consumes one source and swaps each rendered value into a
//! fixed placeholder position, stopping deterministically on stop, source
//! exhaustion, detachment, or unrecovered error. [`compose`] fans a template
//! argument list out into many drivers with a combined start and stop, and
//! [`bind_view`] runs the same loop against caller-registered hooks instead
//! of a placeholder swap.
//!
//! # Implementation Notes
//!
//! Detachment is observed through the document's observer primitive plus the
//! frame queue's deferred check, never by polling. All driver suspensions
//! race the stop signal and the invalidation future, so stops are observed
//! promptly rather than at the next natural yield.

mod bind;
mod compose;
mod driver;
mod invalidation;
mod source;
mod tracker;
mod value;

pub use bind::{
    bind_view, BindConfig, BoundView, HookReporter, InitHook, TeardownHook, UpdateHook,
    ViewHandle, ViewHooks,
};
pub use compose::{compose, ComposedArg, ComposedFragment, TemplateArg};
pub use driver::{
    default_swap, DriverConfig, DriverHandle, ErrorHandler, Lifecycle, NodeDriver, SwapFn,
};
pub use invalidation::{Invalidation, InvalidationTable};
pub use source::{
    channel_source, from_values, ChannelSource, Produced, QueueSource, ReactiveSource,
    SourceSender, StreamSource,
};
pub use tracker::{TrackOptions, Tracker};
pub use value::{render, Value, ValueClass, ValueFuture};
