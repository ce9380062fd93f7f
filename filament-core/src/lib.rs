//! Filament Core
//!
//! This crate binds the lifecycle of a node in an in-memory visual tree to an
//! asynchronous sequence of values. It implements:
//!
//! - An in-memory document tree with an attach/detach observer primitive
//! - A deferred-check frame queue (one run per rendering opportunity)
//! - Reactive sources, values, and per-node invalidation futures
//! - The reactive node driver, fragment composer, and view binder
//!
//! A node is created, incrementally updated as values arrive, and cleaned up
//! exactly once when it leaves the live tree. Node identity equality, not
//! structural diffing, decides whether a re-render swaps content.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `tree`: Document tree, node kinds, observers, and subtree helpers
//! - `frame`: Deferred-check scheduling queue
//! - `reactive`: Sources, values, invalidation, tracking, and drivers
//! - `error`: The crate-wide error type
//!
//! # Example
//!
//! ```rust,ignore
//! use filament_core::{Document, FrameQueue, NodeDriver, Tracker};
//! use filament_core::reactive::{from_values, Value};
//!
//! let doc = Document::new();
//! let tracker = Tracker::new(doc.clone(), FrameQueue::new());
//!
//! // Drive a finite sequence into the root.
//! let driver = NodeDriver::new(&tracker, from_values([
//!     Value::from("hello"),
//!     Value::from("world"),
//! ]));
//! doc.append_child(doc.root(), driver.placeholder())?;
//! driver.run().await;
//!
//! assert_eq!(doc.text_content(doc.root()), "world");
//! ```

pub mod error;
pub mod frame;
pub mod reactive;
pub mod tree;

pub use error::Error;
pub use frame::FrameQueue;
pub use reactive::{
    bind_view, compose, BindConfig, DriverConfig, DriverHandle, Lifecycle, NodeDriver,
    ReactiveSource, TemplateArg, Tracker, Value,
};
pub use tree::{Document, NodeId, NodeKind};
