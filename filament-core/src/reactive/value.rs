//! Values and the Renderer
//!
//! A produced value is classified by an explicit tagged union rather than by
//! probing runtime capabilities: every variant names exactly how it renders.
//! The renderer converts one value into at most one node; the driver then
//! decides by node identity whether a swap is needed.
//!
//! # Rendering Rules
//!
//! | Value                  | Renders to                                      |
//! |------------------------|-------------------------------------------------|
//! | `Missing`              | nothing (the driver must not swap)              |
//! | `Null`                 | an empty text node                              |
//! | `Bool`, `Int`, `Float` | a text node with the value's string form        |
//! | `Text`                 | a text node                                     |
//! | `Node`                 | the existing node, unchanged                    |
//! | `List`                 | a new container element, items rendered in order|
//! | `Opaque`               | a text node holding the stable type tag         |
//! | `Deferred`             | normally resolved by the driver first; one that |
//! |                        | survives into rendering shows a fixed tag       |
//!
//! Every render of a non-`Node` value allocates a fresh node, so repeated
//! renders of equal text still differ by identity. Only `Node` preserves
//! identity across renders, which is what suppresses redundant swaps.

use futures_util::future::BoxFuture;

use crate::error::Error;
use crate::tree::{Document, NodeId};

/// Future resolving a deferred value.
pub type ValueFuture = BoxFuture<'static, Result<Value, Error>>;

/// A value produced by a reactive source.
pub enum Value {
    /// No value: render nothing, keep whatever is currently shown.
    Missing,

    /// An explicit empty value: renders as an empty text node.
    Null,

    /// A boolean primitive.
    Bool(bool),

    /// An integer primitive.
    Int(i64),

    /// A floating-point primitive.
    Float(f64),

    /// A string.
    Text(String),

    /// An existing node in the document. Rendering returns it unchanged.
    Node(NodeId),

    /// An ordered collection, rendered into a fresh container element.
    List(Vec<Value>),

    /// A value the renderer has no structural knowledge of, carrying a stable
    /// human-readable type tag.
    Opaque(String),

    /// A value that is not available yet. The driver resolves it in its
    /// resolve step before rendering.
    Deferred(ValueFuture),
}

/// The explicit classification the renderer works from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// Renders to nothing.
    Nothing,
    /// Renders to a fresh text node.
    Primitive,
    /// An existing renderable unit; rendering preserves identity.
    ExistingUnit,
    /// Renders to a fresh container wrapping its items.
    Iterable,
    /// Renders to a fresh text node holding a type tag.
    Opaque,
    /// Needs a resolve step before it can be classified further.
    Deferred,
}

impl Value {
    /// Build a deferred value from a future.
    pub fn deferred<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<Value, Error>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    /// Build an opaque value tagged with `T`'s type name.
    pub fn opaque<T>() -> Self {
        Self::Opaque(format!("[opaque {}]", std::any::type_name::<T>()))
    }

    /// Classify this value.
    pub fn class(&self) -> ValueClass {
        match self {
            Self::Missing => ValueClass::Nothing,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Text(_) => {
                ValueClass::Primitive
            }
            Self::Node(_) => ValueClass::ExistingUnit,
            Self::List(_) => ValueClass::Iterable,
            Self::Opaque(_) => ValueClass::Opaque,
            Self::Deferred(_) => ValueClass::Deferred,
        }
    }

    /// The string form primitives render as. `None` for non-primitives.
    pub fn primitive_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(t) => Some(t.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NodeId> for Value {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "Missing"),
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Node(id) => f.debug_tuple("Node").field(id).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Opaque(tag) => f.debug_tuple("Opaque").field(tag).finish(),
            Self::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

/// Render `value` into `doc`, returning the node representing it.
///
/// Pure apart from node allocation: safe to call repeatedly for the same
/// input. Returns `None` only for values that render to nothing.
pub fn render(doc: &Document, value: &Value) -> Option<NodeId> {
    match value {
        Value::Missing => None,
        Value::Node(id) => Some(*id),
        Value::List(items) => {
            let container = doc.create_element("div");
            for item in items {
                if let Some(child) = render(doc, item) {
                    // A foreign node ID is the only way this can fail; skip it.
                    let _ = doc.append_child(container, child);
                }
            }
            Some(container)
        }
        Value::Opaque(tag) => Some(doc.create_text(tag.clone())),
        Value::Deferred(_) => Some(doc.create_text("[deferred]")),
        primitive => Some(doc.create_text(
            primitive
                .primitive_text()
                .expect("non-primitive variants handled above"),
        )),
    }
}
