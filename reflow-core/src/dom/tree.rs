//! The document tree contract consumed by the render scheduler.

use super::node::{MarkerKind, NodeId};
use crate::error::TreeError;

/// A mutable document tree.
///
/// Every insertion takes a parent and an optional `before` node; `None`
/// appends. Implementations are not expected to serialize concurrent
/// mutations of the same region; the render scheduler guarantees a single
/// writer per rendered region.
pub trait DocumentTree: Send + Sync {
    /// Insert an element with the given tag.
    fn create_element(
        &self,
        parent: NodeId,
        before: Option<NodeId>,
        tag: &str,
    ) -> Result<NodeId, TreeError>;

    /// Insert a text node.
    fn create_text(
        &self,
        parent: NodeId,
        before: Option<NodeId>,
        text: &str,
    ) -> Result<NodeId, TreeError>;

    /// Insert an empty sentinel node tagged for identification.
    fn create_marker(
        &self,
        parent: NodeId,
        before: Option<NodeId>,
        kind: MarkerKind,
    ) -> Result<NodeId, TreeError>;

    /// Set an attribute on an element.
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError>;

    /// Remove every node strictly between two children of `parent`, keeping
    /// the markers themselves. Returns the number of direct children removed.
    fn remove_nodes_between(
        &self,
        parent: NodeId,
        start: NodeId,
        end: NodeId,
    ) -> Result<usize, TreeError>;

    /// Whether a batch is currently open.
    fn is_batching(&self) -> bool {
        false
    }

    /// Run `f` with all mutations it issues shipped as one unit.
    ///
    /// Nested calls join the outer batch.
    fn batch(&self, f: &mut dyn FnMut()) {
        f()
    }
}
