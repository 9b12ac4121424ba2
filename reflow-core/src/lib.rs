//! Reflow Core
//!
//! This crate keeps regions of a live document tree synchronized with
//! observable values. It implements:
//!
//! - Observable values with projections and close cascading
//! - A document tree contract plus an in-memory, command-recording tree
//! - The render scheduler: erase-and-rebuild passes, coalescing of changes
//!   that arrive mid-pass, and scoped ownership of everything a pass builds
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Observable values and listener handles
//! - `dom`: Document tree contract, in-memory document, mutation commands
//! - `render`: Build scopes, render fragments and the render scheduler
//! - `config`: Render configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use reflow_core::dom::Document;
//! use reflow_core::reactive::Observable;
//! use reflow_core::render::BuildScope;
//! use reflow_core::RenderConfig;
//!
//! let doc = Arc::new(Document::new());
//! let root = BuildScope::root(doc.clone(), doc.root(), RenderConfig::default());
//!
//! let count = Observable::new(0);
//! root.render(&count, |count, scope| {
//!     let p = scope.element_scope("p")?;
//!     p.text(&format!("Count: {count}"))?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! count.set(5).unwrap();
//! assert_eq!(doc.text_content(doc.root()), "Count: 5");
//! ```
//!
//! # Tracing
//!
//! The crate logs through `tracing` and never installs a subscriber; hosts
//! choose where events go.

pub mod config;
pub mod dom;
pub mod error;
pub mod reactive;
pub mod render;

pub use config::RenderConfig;
pub use error::{CloseReason, RenderError, Result};
