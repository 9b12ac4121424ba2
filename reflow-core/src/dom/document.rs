//! In-Memory Document
//!
//! A [`DocumentTree`] that keeps its nodes in memory and records every
//! mutation as a [`Command`]. It stands in for a remote display surface:
//! the recorded batches are what a transport layer would ship.
//!
//! # Concurrency
//!
//! Nodes live in a `DashMap` so unrelated regions can be mutated from
//! different threads. A shard guard is never held while another node is
//! looked up, so lookups never deadlock against each other.

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;

use super::command::{Command, CommandBatch};
use super::node::{MarkerKind, NodeId, NodeKind};
use super::tree::DocumentTree;
use crate::error::TreeError;

/// Stored state of one node.
#[derive(Debug, Clone)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: IndexMap<String, String>,
}

impl NodeRecord {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            attributes: IndexMap::new(),
        }
    }
}

/// An in-memory document tree.
///
/// # Example
///
/// ```rust
/// use reflow_core::dom::{Document, DocumentTree};
///
/// let doc = Document::new();
/// let p = doc.create_element(doc.root(), None, "p").unwrap();
/// doc.create_text(p, None, "hello").unwrap();
///
/// assert_eq!(doc.to_html(doc.root()), "<p>hello</p>");
/// ```
pub struct Document {
    root: NodeId,
    nodes: DashMap<NodeId, NodeRecord>,
    /// Commands issued inside the open batch, if any.
    pending: Mutex<Option<Vec<Command>>>,
    /// Batches ready for transport.
    outbound: Mutex<Vec<CommandBatch>>,
}

impl Document {
    /// Create an empty document holding only its root.
    pub fn new() -> Self {
        let root = NodeId::new();
        let nodes = DashMap::new();
        nodes.insert(root, NodeRecord::new(NodeKind::Root, None));
        Self {
            root,
            nodes,
            pending: Mutex::new(None),
            outbound: Mutex::new(Vec::new()),
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the node exists.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds nothing but its root.
    ///
    /// The root always counts towards [`len`](Self::len), so an empty
    /// document has a length of one.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// The kind of a node.
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|record| record.kind.clone())
    }

    /// The parent of a node.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|record| record.parent)
    }

    /// Direct children of a node, in document order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    /// An attribute value of an element.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .get(&node)
            .and_then(|record| record.attributes.get(name).cloned())
    }

    /// The children of `parent` strictly between two markers.
    pub fn nodes_between(
        &self,
        parent: NodeId,
        start: NodeId,
        end: NodeId,
    ) -> Result<Vec<NodeId>, TreeError> {
        let record = self
            .nodes
            .get(&parent)
            .ok_or(TreeError::UnknownNode(parent))?;
        let (from, to) = marker_range(&record.children, parent, start, end)?;
        Ok(record.children[from + 1..to].to_vec())
    }

    /// Concatenated text of every node strictly between two markers.
    pub fn text_between(
        &self,
        parent: NodeId,
        start: NodeId,
        end: NodeId,
    ) -> Result<String, TreeError> {
        let mut text = String::new();
        for node in self.nodes_between(parent, start, end)? {
            self.collect_text(node, &mut text);
        }
        Ok(text)
    }

    /// Concatenated text of a node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = String::new();
        self.collect_text(node, &mut text);
        text
    }

    /// Render a subtree as markup. The root renders as its children only.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut html = String::new();
        self.write_html(node, &mut html);
        html
    }

    /// Take every batch recorded so far, oldest first.
    pub fn take_batches(&self) -> Vec<CommandBatch> {
        std::mem::take(&mut *self.outbound.lock())
    }

    fn record(&self, node: NodeId) -> Option<NodeRecord> {
        self.nodes.get(&node).map(|record| record.clone())
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            let Some(record) = self.record(node) else {
                continue;
            };
            if let NodeKind::Text(text) = &record.kind {
                out.push_str(text);
            }
            stack.extend(record.children.into_iter().rev());
        }
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let mut stack = vec![HtmlStep::Open(node)];
        while let Some(step) = stack.pop() {
            let node = match step {
                HtmlStep::Open(node) => node,
                HtmlStep::Close(tag) => {
                    out.push_str(&format!("</{tag}>"));
                    continue;
                }
            };
            let Some(record) = self.record(node) else {
                continue;
            };
            match record.kind {
                NodeKind::Root => {}
                NodeKind::Element(tag) => {
                    out.push('<');
                    out.push_str(&tag);
                    for (name, value) in &record.attributes {
                        out.push_str(&format!(" {name}=\"{}\"", escape(value)));
                    }
                    out.push('>');
                    stack.push(HtmlStep::Close(tag));
                }
                NodeKind::Text(text) => out.push_str(&escape(&text)),
                NodeKind::Marker(kind) => {
                    out.push_str(&format!("<span class=\"{}\"></span>", kind.class_name()));
                }
            }
            stack.extend(record.children.into_iter().rev().map(HtmlStep::Open));
        }
    }

    /// Store a new node and link it under `parent`.
    fn insert(
        &self,
        parent: NodeId,
        before: Option<NodeId>,
        kind: NodeKind,
    ) -> Result<NodeId, TreeError> {
        let id = NodeId::new();
        self.nodes.insert(id, NodeRecord::new(kind, Some(parent)));
        if let Err(err) = self.link(parent, before, id) {
            self.nodes.remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    fn link(&self, parent: NodeId, before: Option<NodeId>, child: NodeId) -> Result<(), TreeError> {
        let mut record = self
            .nodes
            .get_mut(&parent)
            .ok_or(TreeError::UnknownNode(parent))?;
        if !record.kind.is_container() {
            return Err(TreeError::NotAContainer(parent));
        }
        let index = match before {
            Some(anchor) => record
                .children
                .iter()
                .position(|c| *c == anchor)
                .ok_or(TreeError::NotAChild {
                    parent,
                    child: anchor,
                })?,
            None => record.children.len(),
        };
        record.children.insert(index, child);
        Ok(())
    }

    fn emit(&self, command: Command) {
        let mut pending = self.pending.lock();
        match pending.as_mut() {
            Some(buffer) => buffer.push(command),
            None => {
                drop(pending);
                self.outbound.lock().push(CommandBatch::single(command));
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("node_count", &self.len())
            .field("batching", &self.is_batching())
            .finish()
    }
}

impl DocumentTree for Document {
    fn create_element(
        &self,
        parent: NodeId,
        before: Option<NodeId>,
        tag: &str,
    ) -> Result<NodeId, TreeError> {
        let id = self.insert(parent, before, NodeKind::Element(tag.to_string()))?;
        self.emit(Command::CreateElement {
            id,
            parent,
            before,
            tag: tag.to_string(),
        });
        Ok(id)
    }

    fn create_text(
        &self,
        parent: NodeId,
        before: Option<NodeId>,
        text: &str,
    ) -> Result<NodeId, TreeError> {
        let id = self.insert(parent, before, NodeKind::Text(text.to_string()))?;
        self.emit(Command::CreateText {
            id,
            parent,
            before,
            text: text.to_string(),
        });
        Ok(id)
    }

    fn create_marker(
        &self,
        parent: NodeId,
        before: Option<NodeId>,
        kind: MarkerKind,
    ) -> Result<NodeId, TreeError> {
        let id = self.insert(parent, before, NodeKind::Marker(kind))?;
        self.emit(Command::CreateMarker {
            id,
            parent,
            before,
            class: kind.class_name().to_string(),
        });
        Ok(id)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        {
            let mut record = self
                .nodes
                .get_mut(&node)
                .ok_or(TreeError::UnknownNode(node))?;
            if !matches!(record.kind, NodeKind::Element(_)) {
                return Err(TreeError::NotAContainer(node));
            }
            record
                .attributes
                .insert(name.to_string(), value.to_string());
        }
        self.emit(Command::SetAttribute {
            id: node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_nodes_between(
        &self,
        parent: NodeId,
        start: NodeId,
        end: NodeId,
    ) -> Result<usize, TreeError> {
        let removed: Vec<NodeId> = {
            let mut record = self
                .nodes
                .get_mut(&parent)
                .ok_or(TreeError::UnknownNode(parent))?;
            let (from, to) = marker_range(&record.children, parent, start, end)?;
            record.children.drain(from + 1..to).collect()
        };

        let count = removed.len();
        let mut stack = removed;
        while let Some(node) = stack.pop() {
            if let Some((_, record)) = self.nodes.remove(&node) {
                stack.extend(record.children);
            }
        }

        self.emit(Command::RemoveBetween { parent, start, end });
        Ok(count)
    }

    fn is_batching(&self) -> bool {
        self.pending.lock().is_some()
    }

    fn batch(&self, f: &mut dyn FnMut()) {
        let nested = {
            let mut pending = self.pending.lock();
            if pending.is_some() {
                true
            } else {
                *pending = Some(Vec::new());
                false
            }
        };
        if nested {
            f();
            return;
        }

        let _flush = BatchFlush { document: self };
        f();
    }
}

/// Ships the open batch when dropped, even if the batched closure panics.
struct BatchFlush<'a> {
    document: &'a Document,
}

impl Drop for BatchFlush<'_> {
    fn drop(&mut self) {
        let commands = self.document.pending.lock().take().unwrap_or_default();
        if !commands.is_empty() {
            self.document
                .outbound
                .lock()
                .push(CommandBatch::new(commands));
        }
    }
}

/// Pending work while writing markup without recursion.
enum HtmlStep {
    Open(NodeId),
    Close(String),
}

/// Positions of two markers among `children`, start first.
fn marker_range(
    children: &[NodeId],
    parent: NodeId,
    start: NodeId,
    end: NodeId,
) -> Result<(usize, usize), TreeError> {
    let position = |child: NodeId| {
        children
            .iter()
            .position(|c| *c == child)
            .ok_or(TreeError::NotAChild { parent, child })
    };
    let from = position(start)?;
    let to = position(end)?;
    if from >= to {
        return Err(TreeError::MarkersOutOfOrder { start, end });
    }
    Ok((from, to))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
