//! Document Tree
//!
//! This module implements the in-memory visual tree the reactive layer renders
//! into: a node arena with parent/child links, connectivity and containment
//! queries, and a narrow mutation-observation primitive.
//!
//! # Design Decisions
//!
//! 1. Nodes are identified by `NodeId` and owned by a central arena rather
//!    than by each other. The reactive layer compares identities to decide
//!    whether content actually changed, so identity has to be stable and
//!    copyable.
//!
//! 2. Observers report only "something changed under this subtree". Watchers
//!    that need detail re-inspect the document; this keeps mutation paths
//!    cheap and the observer contract small.
//!
//! 3. The node-creation surface (`create_element` / `create_text` /
//!    `create_marker`) is the whole interface the reactive core needs, so the
//!    core stays testable without a live rendering surface.

mod content;
mod document;
mod node;

pub use content::{render_into, replace_content};
pub use document::{Document, ObserverId};
pub use node::{Node, NodeId, NodeKind};
