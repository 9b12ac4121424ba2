//! Error Types
//!
//! Errors raised by the document tree, observable values, and the command
//! codec. [`RenderError`] wraps all of them so builder code inside a render
//! callback can use `?` freely.
//!
//! Scheduling races are not errors: they are resolved by the render state
//! machine and never surface here.

use std::fmt;

use thiserror::Error;

use crate::dom::NodeId;

/// Why an observable value was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    explanation: String,
}

impl CloseReason {
    /// Create a close reason with a human-readable explanation.
    pub fn new(explanation: impl Into<String>) -> Self {
        Self {
            explanation: explanation.into(),
        }
    }

    /// The explanation given when the value was closed.
    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.explanation)
    }
}

/// Errors produced by a document tree.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The node does not exist (never created, or already removed).
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The node cannot hold children (text and marker nodes).
    #[error("node {0} cannot contain children")]
    NotAContainer(NodeId),

    /// The node is not a direct child of the given parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        /// The expected parent.
        parent: NodeId,
        /// The node that was looked up.
        child: NodeId,
    },

    /// The start marker does not precede the end marker.
    #[error("marker {start} does not precede marker {end}")]
    MarkersOutOfOrder {
        /// The start marker.
        start: NodeId,
        /// The end marker.
        end: NodeId,
    },
}

/// Errors produced by an observable value.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObservableError {
    /// The value has been closed; it can no longer be written or subscribed to.
    #[error("observable closed: {reason}")]
    Closed {
        /// The reason given to `close`.
        reason: CloseReason,
    },

    /// The value is a read-only derivation.
    #[error("observable is read-only")]
    ReadOnly,
}

/// Errors produced while encoding or decoding command batches.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CodecError {
    /// MessagePack encoding failed.
    #[error("failed to encode command batch: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding failed.
    #[error("failed to decode command batch: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// JSON rendering failed.
    #[error("failed to render command batch as json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Umbrella error for render callbacks and scope operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RenderError {
    /// A document tree operation failed.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// An observable operation failed.
    #[error(transparent)]
    Observable(#[from] ObservableError),

    /// Command batch serialization failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Configuration could not be loaded.
    #[error("invalid render configuration: {0}")]
    Config(#[source] serde_json::Error),

    /// A render callback failed for a reason of its own.
    #[error("render callback failed: {0}")]
    Callback(String),
}

impl RenderError {
    /// Short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RenderError::Tree(TreeError::UnknownNode(_)) => "tree_unknown_node",
            RenderError::Tree(TreeError::NotAContainer(_)) => "tree_not_a_container",
            RenderError::Tree(TreeError::NotAChild { .. }) => "tree_not_a_child",
            RenderError::Tree(TreeError::MarkersOutOfOrder { .. }) => "tree_markers_out_of_order",
            RenderError::Observable(ObservableError::Closed { .. }) => "observable_closed",
            RenderError::Observable(ObservableError::ReadOnly) => "observable_read_only",
            RenderError::Codec(_) => "codec",
            RenderError::Config(_) => "config",
            RenderError::Callback(_) => "callback",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = RenderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = RenderError::from(TreeError::UnknownNode(NodeId::from(7)));
        assert_eq!(err.as_label(), "tree_unknown_node");

        let err = RenderError::from(ObservableError::Closed {
            reason: CloseReason::new("gone"),
        });
        assert_eq!(err.as_label(), "observable_closed");
        assert_eq!(err.to_string(), "observable closed: gone");
    }

    #[test]
    fn tree_errors_name_the_nodes() {
        let err = TreeError::MarkersOutOfOrder {
            start: NodeId::from(3),
            end: NodeId::from(1),
        };
        assert_eq!(err.to_string(), "marker #3 does not precede marker #1");
    }
}
