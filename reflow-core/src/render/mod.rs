//! Rendering
//!
//! This module keeps regions of a document tree in sync with observable
//! values.
//!
//! # Concepts
//!
//! ## Build scopes
//!
//! A [`BuildScope`] is where tree-building code writes. It owns whatever is
//! registered against it (child scopes, nested render instances, closers for
//! observables) and releases it in reverse order.
//!
//! ## Fragments
//!
//! [`BuildScope::render`] brackets its region with two marker nodes and
//! returns them as a [`RenderFragment`]. Deleting the fragment stops the
//! instance without touching the observable.
//!
//! ## The scheduler
//!
//! Each render instance owns a three-valued [`RenderState`]. A change that
//! finds the instance idle runs the render loop on the notifying thread; a
//! change during a pass marks one catch-up pass; further changes are folded
//! into that pass. At most one pass of an instance runs at any time and the
//! last pass always renders the latest value.

mod component;
mod fragment;
mod scheduler;
mod scope;
mod state;

pub use component::Component;
pub use fragment::RenderFragment;
pub use scope::{BuildScope, CleanupPhase};
pub use state::RenderState;
