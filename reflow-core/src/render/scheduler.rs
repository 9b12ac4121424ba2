//! Render Scheduler
//!
//! Keeps the region between a fragment's markers in sync with an
//! [`Observable`]: every change erases the region and renders it again from
//! the current value.
//!
//! # Algorithm
//!
//! A pass (`erase_and_render`) does four things, in order:
//!
//! 1. Remove every node between the markers and release the scope that
//!    owned them.
//! 2. Open a fresh scope anchored at the end marker.
//! 3. Enter `RenderingNoPendingChange`.
//! 4. Call the render callback with the current value and the fresh scope.
//!
//! The loop repeats passes until one completes with no change recorded in
//! the meantime. A change notification either claims the loop (when idle),
//! marks one pending pass (when a pass is running), or does nothing (when a
//! pass is already pending). However many changes arrive during a pass, at
//! most one catch-up pass follows, and it renders the latest value.
//!
//! The notification handler never renders on its own; it only claims the
//! loop and runs it on the notifying thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use super::fragment::RenderFragment;
use super::scope::{BuildScope, CleanupPhase};
use super::state::{ChangeAction, RenderStateCell};
use crate::config::RenderConfig;
use crate::dom::{DocumentTree, NodeId};
use crate::error::Result;
use crate::reactive::Observable;

type RenderFn<T> = Box<dyn Fn(&T, &BuildScope) -> Result<()> + Send + Sync>;

/// Shared state of one render instance.
struct Scheduler<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    value: Observable<T>,
    render: RenderFn<T>,
    tree: Arc<dyn DocumentTree>,
    container: NodeId,
    config: Arc<RenderConfig>,
    fragment: RenderFragment,
    state: RenderStateCell,
    /// The scope owning the region's current content.
    current: Mutex<Option<BuildScope>>,
    /// Set once the fragment is deleted or the owning scope released.
    detached: AtomicBool,
    passes: AtomicU64,
}

impl<T> Scheduler<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn on_change(&self) {
        if self.detached.load(Ordering::SeqCst) {
            return;
        }
        match self.state.on_change() {
            ChangeAction::StartLoop => {
                debug!(fragment = %self.fragment.start_id(), "change while idle; starting render loop");
                self.render_loop();
            }
            ChangeAction::MarkedPending => {
                trace!(fragment = %self.fragment.start_id(), "change during pass; catch-up pass owed");
            }
            ChangeAction::AlreadyPending => {
                trace!(fragment = %self.fragment.start_id(), "change coalesced into pending pass");
            }
        }
    }

    /// Run passes until one completes without a change arriving.
    ///
    /// The caller must have claimed the state cell.
    fn render_loop(&self) {
        loop {
            if self.detached.load(Ordering::SeqCst) {
                self.state.reset();
                debug!(fragment = %self.fragment.start_id(), "render instance detached; loop stopped");
                return;
            }

            if self.config.batch_renders && !self.tree.is_batching() {
                self.tree.batch(&mut || self.erase_and_render());
            } else {
                self.erase_and_render();
            }

            if self.state.try_settle() {
                return;
            }
        }
    }

    fn erase_and_render(&self) {
        let started = Instant::now();

        self.erase();

        let scope = BuildScope::anchored(
            self.tree.clone(),
            self.container,
            Some(self.fragment.end_id()),
            self.config.clone(),
        );
        *self.current.lock() = Some(scope.clone());

        self.state.begin_pass();

        let value = self.value.read();
        if let Err(err) = (self.render)(&value, &scope) {
            error!(
                fragment = %self.fragment.start_id(),
                error = %err,
                label = err.as_label(),
                "render callback failed"
            );
        }

        let pass = self.passes.fetch_add(1, Ordering::Relaxed) + 1;
        let elapsed = started.elapsed();
        trace!(fragment = %self.fragment.start_id(), pass, ?elapsed, "render pass complete");
        if let Some(threshold) = self.config.slow_pass_threshold() {
            if elapsed > threshold {
                warn!(fragment = %self.fragment.start_id(), pass, ?elapsed, ?threshold, "slow render pass");
            }
        }
    }

    /// Remove the region's nodes and release the scope that owned them.
    fn erase(&self) {
        if let Err(err) = self.tree.remove_nodes_between(
            self.container,
            self.fragment.start_id(),
            self.fragment.end_id(),
        ) {
            error!(fragment = %self.fragment.start_id(), error = %err, "failed to erase render region");
        }
        let previous = self.current.lock().take();
        if let Some(previous) = previous {
            previous.cleanup();
        }
    }

    /// Stop scheduling passes. An in-flight pass still completes.
    fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    /// Release the scope owning the current content.
    fn release_current(&self) {
        let current = self.current.lock().take();
        if let Some(current) = current {
            current.cleanup();
        }
    }
}

impl BuildScope {
    /// Render `value` into this scope and re-render whenever it changes.
    ///
    /// A start/end marker pair is inserted first; every pass erases what lies
    /// between the markers and calls `render` with the current value and a
    /// fresh scope that inserts right before the end marker. The initial
    /// pass runs before this returns.
    ///
    /// The instance stops when the returned fragment is deleted or when this
    /// scope is released.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use reflow_core::dom::Document;
    /// use reflow_core::reactive::Observable;
    /// use reflow_core::render::BuildScope;
    /// use reflow_core::RenderConfig;
    ///
    /// let doc = Arc::new(Document::new());
    /// let root = BuildScope::root(doc.clone(), doc.root(), RenderConfig::default());
    /// let animal = Observable::new("dog".to_string());
    ///
    /// let fragment = root
    ///     .render(&animal, |value, scope| {
    ///         scope.text(value)?;
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// assert_eq!(doc.text_between(doc.root(), fragment.start_id(), fragment.end_id()).unwrap(), "dog");
    ///
    /// animal.set("cat".to_string()).unwrap();
    /// assert_eq!(doc.text_between(doc.root(), fragment.start_id(), fragment.end_id()).unwrap(), "cat");
    /// ```
    pub fn render<T, F>(&self, value: &Observable<T>, render: F) -> Result<RenderFragment>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T, &BuildScope) -> Result<()> + Send + Sync + 'static,
    {
        self.start_render(value, false, Box::new(render))
    }

    /// Render each item of a list value in its own child scope, between list
    /// markers, and re-render the whole list whenever it changes.
    pub fn render_each<T, F>(&self, items: &Observable<Vec<T>>, render: F) -> Result<RenderFragment>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T, &BuildScope) -> Result<()> + Send + Sync + 'static,
    {
        self.start_render(
            items,
            true,
            Box::new(move |items: &Vec<T>, scope: &BuildScope| {
                for item in items {
                    let item_scope = scope.child_scope(scope.container(), scope.insert_before());
                    render(item, &item_scope)?;
                }
                Ok(())
            }),
        )
    }

    fn start_render<T>(&self, value: &Observable<T>, list: bool, render: RenderFn<T>) -> Result<RenderFragment>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let fragment = self.create_fragment(list)?;

        let scheduler = Arc::new(Scheduler {
            value: value.clone(),
            render,
            tree: self.tree().clone(),
            container: self.container(),
            config: self.config().clone(),
            fragment: fragment.clone(),
            state: RenderStateCell::new(),
            current: Mutex::new(None),
            detached: AtomicBool::new(false),
            passes: AtomicU64::new(0),
        });

        let weak: Weak<Scheduler<T>> = Arc::downgrade(&scheduler);
        let handle = value.subscribe(move |_, _| {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.on_change();
            }
        })?;

        let weak = Arc::downgrade(&scheduler);
        let subscribed = value.clone();
        fragment.add_deletion_listener(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.detach();
            }
            subscribed.unsubscribe(handle);
        });

        if scheduler.state.try_claim() {
            scheduler.render_loop();
        }

        let start = fragment.start_id();
        self.on_cleanup(CleanupPhase::WithoutParent, move || {
            // Ownership of the region lives in the fragment; nothing to do.
            trace!(fragment = %start, "render released without its container");
        });

        let owned = scheduler.clone();
        let subscribed = value.clone();
        self.on_cleanup(CleanupPhase::WithParent, move || {
            owned.detach();
            owned.release_current();
            owned.fragment.delete();
            subscribed.unsubscribe(handle);
            debug!(
                fragment = %owned.fragment.start_id(),
                passes = owned.passes.load(Ordering::Relaxed),
                "render instance torn down"
            );
        });

        debug!(
            fragment = %fragment.start_id(),
            list,
            state = ?scheduler.state.load(),
            "render instance started"
        );
        Ok(fragment)
    }

    fn create_fragment(&self, list: bool) -> Result<RenderFragment> {
        let tree = self.tree();
        let create = || {
            RenderFragment::create(tree.as_ref(), self.container(), self.insert_before(), list)
        };
        if self.config().batch_renders && !tree.is_batching() {
            let mut created = None;
            tree.batch(&mut || created = Some(create()));
            if let Some(created) = created {
                return Ok(created?);
            }
        }
        Ok(create()?)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
