//! Render Fragments
//!
//! A fragment is the marker pair bracketing one rendered region, plus the
//! listeners to run when the region is permanently torn down.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::dom::{DocumentTree, MarkerKind, NodeId};
use crate::error::TreeError;

type DeletionListener = Box<dyn FnOnce() + Send>;

struct FragmentInner {
    start: NodeId,
    end: NodeId,
    listeners: Mutex<SmallVec<[DeletionListener; 2]>>,
    deleted: AtomicBool,
}

/// The bracketed region owned by one render instance.
///
/// Cloning shares the same fragment.
#[derive(Clone)]
pub struct RenderFragment {
    inner: Arc<FragmentInner>,
}

impl RenderFragment {
    /// Insert an empty start/end marker pair into `container` before `before`
    /// (or at the end), with nothing between them.
    pub fn create(
        tree: &dyn DocumentTree,
        container: NodeId,
        before: Option<NodeId>,
        list: bool,
    ) -> Result<Self, TreeError> {
        let (start_kind, end_kind) = MarkerKind::pair(list);
        let start = tree.create_marker(container, before, start_kind)?;
        let end = tree.create_marker(container, before, end_kind)?;
        Ok(Self::from_markers(start, end))
    }

    pub(crate) fn from_markers(start: NodeId, end: NodeId) -> Self {
        Self {
            inner: Arc::new(FragmentInner {
                start,
                end,
                listeners: Mutex::new(SmallVec::new()),
                deleted: AtomicBool::new(false),
            }),
        }
    }

    /// The start marker.
    pub fn start_id(&self) -> NodeId {
        self.inner.start
    }

    /// The end marker; rendered content is inserted right before it.
    pub fn end_id(&self) -> NodeId {
        self.inner.end
    }

    /// Register a listener to run when the fragment is deleted.
    ///
    /// On an already deleted fragment the listener runs immediately.
    pub fn add_deletion_listener<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut listeners = self.inner.listeners.lock();
        if self.inner.deleted.load(Ordering::SeqCst) {
            drop(listeners);
            listener();
            return;
        }
        listeners.push(Box::new(listener));
    }

    /// Run every deletion listener once, in registration order.
    ///
    /// Listeners run after the registry lock is released, so they may
    /// register further listeners or tear down other fragments. Deleting
    /// twice is a no-op.
    pub fn delete(&self) {
        let listeners = {
            let mut listeners = self.inner.listeners.lock();
            if self.inner.deleted.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *listeners)
        };
        for listener in listeners {
            listener();
        }
    }

    /// Whether [`delete`](Self::delete) has run.
    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::SeqCst)
    }

    /// Number of listeners waiting for deletion.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl fmt::Debug for RenderFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderFragment")
            .field("start", &self.inner.start)
            .field("end", &self.inner.end)
            .field("deleted", &self.is_deleted())
            .finish()
    }
}
