//! Build Scopes
//!
//! A [`BuildScope`] is where tree-building code writes. It knows its
//! container and insertion point, and owns every resource registered against
//! it: child scopes, nested render instances, subscriptions. Releasing the
//! scope releases those resources in reverse registration order.
//!
//! # Cleanup Phases
//!
//! Each resource is registered for a [`CleanupPhase`]:
//!
//! - [`CleanupPhase::WithoutParent`] actions run only when this scope is
//!   released on its own, while its container survives.
//! - [`CleanupPhase::WithParent`] actions run on every release, including
//!   when an enclosing scope tears this one down together with its
//!   container.
//!
//! A scope is released at most once.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::RenderConfig;
use crate::dom::{DocumentTree, MarkerKind, NodeId};
use crate::error::{CloseReason, Result};
use crate::reactive::Observable;

/// When a cleanup action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    /// Only when the scope is released on its own.
    WithoutParent,
    /// Whenever the scope is released, including by its parent.
    WithParent,
}

type CleanupAction = Box<dyn FnOnce() + Send>;

static SCOPE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

struct ScopeInner {
    id: u64,
    tree: Arc<dyn DocumentTree>,
    container: NodeId,
    insert_before: Option<NodeId>,
    config: Arc<RenderConfig>,
    actions: Mutex<Vec<(CleanupPhase, CleanupAction)>>,
    released: AtomicBool,
}

/// A disposable scope for building part of a document tree.
///
/// Cloning shares the same scope.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use reflow_core::dom::Document;
/// use reflow_core::render::BuildScope;
/// use reflow_core::RenderConfig;
///
/// let doc = Arc::new(Document::new());
/// let root = BuildScope::root(doc.clone(), doc.root(), RenderConfig::default());
///
/// let list = root.element_scope("ul").unwrap();
/// list.element_scope("li").unwrap().text("one").unwrap();
///
/// assert_eq!(doc.to_html(doc.root()), "<ul><li>one</li></ul>");
/// ```
#[derive(Clone)]
pub struct BuildScope {
    inner: Arc<ScopeInner>,
}

impl BuildScope {
    /// Open a top-level scope that appends to `container`.
    pub fn root(tree: Arc<dyn DocumentTree>, container: NodeId, config: RenderConfig) -> Self {
        Self::anchored(tree, container, None, Arc::new(config))
    }

    /// Open a scope whose output is inserted into `container` right before
    /// `insert_before` (or appended when `None`).
    pub fn anchored(
        tree: Arc<dyn DocumentTree>,
        container: NodeId,
        insert_before: Option<NodeId>,
        config: Arc<RenderConfig>,
    ) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: SCOPE_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
                tree,
                container,
                insert_before,
                config,
                actions: Mutex::new(Vec::new()),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// The scope's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The node new content is inserted into.
    pub fn container(&self) -> NodeId {
        self.inner.container
    }

    /// The node new content is inserted before, if any.
    pub fn insert_before(&self) -> Option<NodeId> {
        self.inner.insert_before
    }

    /// The tree this scope writes to.
    pub fn tree(&self) -> &Arc<dyn DocumentTree> {
        &self.inner.tree
    }

    /// The configuration inherited by this scope.
    pub fn config(&self) -> &Arc<RenderConfig> {
        &self.inner.config
    }

    /// Insert an element.
    pub fn element(&self, tag: &str) -> Result<NodeId> {
        Ok(self
            .inner
            .tree
            .create_element(self.inner.container, self.inner.insert_before, tag)?)
    }

    /// Insert a text node.
    pub fn text(&self, text: &str) -> Result<NodeId> {
        Ok(self
            .inner
            .tree
            .create_text(self.inner.container, self.inner.insert_before, text)?)
    }

    /// Insert a marker node.
    pub fn marker(&self, kind: MarkerKind) -> Result<NodeId> {
        Ok(self
            .inner
            .tree
            .create_marker(self.inner.container, self.inner.insert_before, kind)?)
    }

    /// Set an attribute on an element built in this scope.
    pub fn attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        Ok(self.inner.tree.set_attribute(node, name, value)?)
    }

    /// Insert an element and open a scope that builds inside it.
    ///
    /// The child scope is released together with this one.
    pub fn element_scope(&self, tag: &str) -> Result<BuildScope> {
        let element = self.element(tag)?;
        Ok(self.child_scope(element, None))
    }

    /// Open a scope building into `container` before `insert_before`, owned
    /// by this scope.
    pub fn child_scope(&self, container: NodeId, insert_before: Option<NodeId>) -> BuildScope {
        let child = BuildScope::anchored(
            self.inner.tree.clone(),
            container,
            insert_before,
            self.inner.config.clone(),
        );
        let owned = child.clone();
        self.on_cleanup(CleanupPhase::WithParent, move || owned.release_from_parent());
        child
    }

    /// Register an action to run when this scope is released.
    ///
    /// On an already released scope the action runs immediately.
    pub fn on_cleanup<F>(&self, phase: CleanupPhase, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut actions = self.inner.actions.lock();
        if self.inner.released.load(Ordering::SeqCst) {
            drop(actions);
            debug!(scope = self.inner.id, ?phase, "cleanup registered on released scope; running now");
            action();
            return;
        }
        actions.push((phase, Box::new(action)));
    }

    /// Close `value` when this scope is released.
    pub fn close_on_cleanup<T>(&self, value: &Observable<T>)
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let value = value.clone();
        self.on_cleanup(CleanupPhase::WithParent, move || {
            value.close(CloseReason::new(
                "Closed because a parent scope was cleaned up",
            ));
        });
    }

    /// Release this scope on its own: run every registered action, in
    /// reverse registration order. Releasing twice is a no-op.
    pub fn cleanup(&self) {
        self.release(false);
    }

    /// Release this scope because its parent is being released: run only
    /// [`CleanupPhase::WithParent`] actions, in reverse registration order.
    pub(crate) fn release_from_parent(&self) {
        self.release(true);
    }

    /// Whether the scope has been released.
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// Number of resources waiting for release.
    pub fn resource_count(&self) -> usize {
        self.inner.actions.lock().len()
    }

    fn release(&self, by_parent: bool) {
        let actions = {
            let mut actions = self.inner.actions.lock();
            if self.inner.released.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *actions)
        };

        trace!(scope = self.inner.id, by_parent, count = actions.len(), "releasing scope");
        for (phase, action) in actions.into_iter().rev() {
            if by_parent && phase == CleanupPhase::WithoutParent {
                continue;
            }
            action();
        }
    }
}

impl fmt::Debug for BuildScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildScope")
            .field("id", &self.inner.id)
            .field("container", &self.inner.container)
            .field("insert_before", &self.inner.insert_before)
            .field("resource_count", &self.resource_count())
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn root() -> (Arc<Document>, BuildScope) {
        let doc = Arc::new(Document::new());
        let scope = BuildScope::root(doc.clone(), doc.root(), RenderConfig::default());
        (doc, scope)
    }

    #[test]
    fn builds_before_anchor() {
        let (doc, scope) = root();
        let anchor = scope.text("]").unwrap();
        let anchored = BuildScope::anchored(
            doc.clone(),
            doc.root(),
            Some(anchor),
            scope.config().clone(),
        );
        anchored.text("a").unwrap();
        anchored.text("b").unwrap();

        assert_eq!(doc.text_content(doc.root()), "ab]");
    }

    #[test]
    fn cleanup_runs_in_reverse_order_once() {
        let (_doc, scope) = root();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            scope.on_cleanup(CleanupPhase::WithParent, move || order.lock().push(i));
        }
        assert_eq!(scope.resource_count(), 3);

        scope.cleanup();
        scope.cleanup();

        assert_eq!(*order.lock(), vec![2, 1, 0]);
        assert!(scope.is_released());
    }

    #[test]
    fn own_release_runs_both_phases() {
        let (_doc, scope) = root();
        let order = Arc::new(Mutex::new(Vec::new()));
        let a = order.clone();
        let b = order.clone();
        scope.on_cleanup(CleanupPhase::WithoutParent, move || a.lock().push("without"));
        scope.on_cleanup(CleanupPhase::WithParent, move || b.lock().push("with"));

        scope.cleanup();
        assert_eq!(*order.lock(), vec!["with", "without"]);
    }

    #[test]
    fn parent_release_skips_without_parent_actions() {
        let (_doc, parent) = root();
        let child = parent.element_scope("div").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let a = order.clone();
        let b = order.clone();
        child.on_cleanup(CleanupPhase::WithoutParent, move || a.lock().push("without"));
        child.on_cleanup(CleanupPhase::WithParent, move || b.lock().push("with"));

        parent.cleanup();

        assert!(child.is_released());
        assert_eq!(*order.lock(), vec!["with"]);
    }

    #[test]
    fn late_registration_runs_immediately() {
        let (_doc, scope) = root();
        scope.cleanup();

        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        scope.on_cleanup(CleanupPhase::WithoutParent, move || {
            ran_clone.store(true, Ordering::SeqCst)
        });
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn nested_elements() {
        let (doc, scope) = root();
        let p = scope.element_scope("p").unwrap();
        p.attribute(p.container(), "class", "note").unwrap();
        p.text("hi").unwrap();

        assert_eq!(doc.to_html(doc.root()), r#"<p class="note">hi</p>"#);
    }

    #[test]
    fn close_on_cleanup_closes_value() {
        let (_doc, scope) = root();
        let value = Observable::new(1);
        scope.close_on_cleanup(&value);

        assert!(!value.is_closed());
        scope.cleanup();
        assert!(value.is_closed());
        assert_eq!(
            value.close_reason().map(|r| r.explanation().to_string()),
            Some("Closed because a parent scope was cleaned up".to_string())
        );
    }
}
