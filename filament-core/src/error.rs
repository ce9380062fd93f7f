//! Error Types
//!
//! The crate uses a single error enum for everything that can fail inside the
//! library: document operations on unknown nodes, produce/resolve failures
//! raised by a reactive source, and view hook failures.
//!
//! # Routing Policy
//!
//! Errors never escape a driver's internal loop to an uninvolved caller.
//! Produce and resolve failures are routed to the driver's configured error
//! handler, which may substitute a replacement value or re-raise (the default,
//! which stops that driver). Hook failures in the view binder are reported and
//! never abort sibling hooks. Document errors surface as ordinary `Result`s
//! from document operations.

use thiserror::Error;

use crate::tree::NodeId;

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The source raised while producing its next slot.
    #[error("source error: {0}")]
    Source(String),

    /// A deferred value raised while resolving.
    #[error("resolve error: {0}")]
    Resolve(String),

    /// A document operation referenced a node that is not in the document.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// An insertion referenced a node that has no parent.
    #[error("node {0:?} has no parent")]
    NoParent(NodeId),

    /// An insertion would make a node its own ancestor.
    #[error("inserting {0:?} here would create a cycle")]
    Cycle(NodeId),

    /// A view hook failed. Reported, never fatal to the loop.
    #[error("hook error: {0}")]
    Hook(String),
}

impl Error {
    /// Build a produce-step error from anything displayable.
    pub fn source(message: impl std::fmt::Display) -> Self {
        Self::Source(message.to_string())
    }

    /// Build a resolve-step error from anything displayable.
    pub fn resolve(message: impl std::fmt::Display) -> Self {
        Self::Resolve(message.to_string())
    }

    /// Build a hook error from anything displayable.
    pub fn hook(message: impl std::fmt::Display) -> Self {
        Self::Hook(message.to_string())
    }
}
