//! Identity and provenance shared by every IR node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(0);
static NEXT_NAME: AtomicU64 = AtomicU64::new(0);

/// Dense numeric identity of an IR node, allocated from a monotonic counter
/// on creation. Operator ids key the circuit's arena; edges between
/// operators are ids, never owning references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn fresh() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Opaque back-reference to the front-end construct that produced an IR
/// node, kept in printed form. Diagnostics only; structural equality of
/// types ignores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin(Option<String>);

impl Origin {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn of(node: &impl fmt::Display) -> Self {
        Self(Some(node.to_string()))
    }

    pub fn describe(&self) -> &str {
        self.0.as_deref().unwrap_or("<unknown>")
    }
}

/// Metadata carried by every IR node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMeta {
    pub id: NodeId,
    pub origin: Origin,
}

impl NodeMeta {
    pub fn new(origin: Origin) -> Self {
        Self {
            id: NodeId::fresh(),
            origin,
        }
    }
}

impl Default for NodeMeta {
    fn default() -> Self {
        Self::new(Origin::none())
    }
}

/// Generator of collision-free output binding names for operators without an
/// explicit name.
#[derive(Debug, Default)]
pub struct NameGen;

impl NameGen {
    /// Returns a fresh binding name, unique for the lifetime of the process.
    pub fn fresh() -> String {
        format!("s{}", NEXT_NAME.fetch_add(1, Ordering::Relaxed))
    }
}
