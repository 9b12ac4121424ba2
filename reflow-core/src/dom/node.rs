//! Document Nodes
//!
//! Node identifiers and the node kinds a document tree holds.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a node in a document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of sentinel node bracketing a rendered region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Opens a single-value render region.
    FragmentStart,
    /// Closes a single-value render region.
    FragmentEnd,
    /// Opens a list render region.
    ListStart,
    /// Closes a list render region.
    ListEnd,
}

impl MarkerKind {
    /// The class name the marker node is tagged with.
    pub fn class_name(&self) -> &'static str {
        match self {
            MarkerKind::FragmentStart => "rMStart",
            MarkerKind::FragmentEnd => "rMEnd",
            MarkerKind::ListStart => "rLStart",
            MarkerKind::ListEnd => "rLEnd",
        }
    }

    /// The start/end kinds for a region.
    pub fn pair(list: bool) -> (MarkerKind, MarkerKind) {
        if list {
            (MarkerKind::ListStart, MarkerKind::ListEnd)
        } else {
            (MarkerKind::FragmentStart, MarkerKind::FragmentEnd)
        }
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root. Holds children, has no tag.
    Root,
    /// An element with a tag name.
    Element(String),
    /// A text node.
    Text(String),
    /// An empty sentinel node.
    Marker(MarkerKind),
}

impl NodeKind {
    /// Whether nodes of this kind may hold children.
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Element(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn marker_class_names() {
        let (start, end) = MarkerKind::pair(false);
        assert_eq!(start.class_name(), "rMStart");
        assert_eq!(end.class_name(), "rMEnd");

        let (start, end) = MarkerKind::pair(true);
        assert_eq!(start.class_name(), "rLStart");
        assert_eq!(end.class_name(), "rLEnd");
    }

    #[test]
    fn only_roots_and_elements_contain() {
        assert!(NodeKind::Root.is_container());
        assert!(NodeKind::Element("div".into()).is_container());
        assert!(!NodeKind::Text("x".into()).is_container());
        assert!(!NodeKind::Marker(MarkerKind::FragmentEnd).is_container());
    }
}
