//! Document Tree
//!
//! The render scheduler does not own a document representation. It talks to
//! one through the [`DocumentTree`] trait: create nodes before an anchor,
//! remove everything between two markers, and optionally group mutations
//! into batches for transport.
//!
//! [`Document`] is the in-memory implementation used by tests and by hosts
//! that ship the recorded [`CommandBatch`]es to a remote display surface.

mod command;
mod document;
mod node;
mod tree;

pub use command::{Command, CommandBatch};
pub use document::Document;
pub use node::{MarkerKind, NodeId, NodeKind};
pub use tree::DocumentTree;
