//! Tree Mutation Commands
//!
//! Every mutation of a [`Document`](super::Document) is recorded as a
//! [`Command`]. Commands are shipped in [`CommandBatch`]es: one command per
//! batch outside of a tree batch, or everything issued inside a tree batch as
//! a single unit. Batching is a transport concern only; it never changes the
//! order in which mutations are applied.

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use crate::error::CodecError;

/// A single tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Insert an element.
    CreateElement {
        id: NodeId,
        parent: NodeId,
        before: Option<NodeId>,
        tag: String,
    },
    /// Insert a text node.
    CreateText {
        id: NodeId,
        parent: NodeId,
        before: Option<NodeId>,
        text: String,
    },
    /// Insert an empty marker node tagged with a class name.
    CreateMarker {
        id: NodeId,
        parent: NodeId,
        before: Option<NodeId>,
        class: String,
    },
    /// Set an attribute on an element.
    SetAttribute {
        id: NodeId,
        name: String,
        value: String,
    },
    /// Remove every node strictly between two markers.
    RemoveBetween {
        parent: NodeId,
        start: NodeId,
        end: NodeId,
    },
}

/// A group of commands shipped as one logical unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBatch {
    commands: Vec<Command>,
}

impl CommandBatch {
    /// Wrap a list of commands.
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// A batch holding exactly one command.
    pub fn single(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }

    /// The commands in issue order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of commands in the batch.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the batch carries no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Encode as MessagePack for transport.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode a batch produced by [`CommandBatch::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Render as JSON, for logs and debugging.
    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }
}
