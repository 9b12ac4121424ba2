//! Observable Values
//!
//! The render scheduler reacts to values through a narrow contract: read the
//! current value, subscribe with a handle, unsubscribe by handle, and close.
//! [`Observable`] implements that contract.
//!
//! # Concepts
//!
//! ## Notifications
//!
//! Every write that changes the value calls each listener once with the old
//! and the new value, after the new value is stored. Listeners are called in
//! subscription order.
//!
//! ## Derivations
//!
//! [`Observable::map`] follows a source read-only. [`Observable::property`]
//! projects one part of a structured value and writes back through the
//! source, so a write through the projection is indistinguishable from a
//! direct write to the source.
//!
//! ## Closing
//!
//! Closing detaches all listeners and rejects further writes and
//! subscriptions. It cascades to every derivation.

mod handle;
mod observable;

pub use handle::ListenerHandle;
pub use observable::Observable;
