//! # Render configuration.
//!
//! [`RenderConfig`] is attached to a root [`BuildScope`](crate::render::BuildScope)
//! and inherited by every scope created beneath it.
//!
//! # Example
//! ```
//! use reflow_core::RenderConfig;
//!
//! let mut cfg = RenderConfig::default();
//! cfg.batch_renders = false;
//! cfg.slow_pass_threshold_ms = 50;
//!
//! assert!(cfg.slow_pass_threshold().is_some());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// Configuration for render instances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Wrap marker creation and each render pass in a tree batch, unless the
    /// tree is already batching.
    pub batch_renders: bool,
    /// Log a warning when a single pass takes longer than this (0 = never).
    pub slow_pass_threshold_ms: u64,
}

impl Default for RenderConfig {
    /// Provides a default configuration:
    /// - `batch_renders = true`
    /// - `slow_pass_threshold_ms = 0` (disabled)
    fn default() -> Self {
        Self {
            batch_renders: true,
            slow_pass_threshold_ms: 0,
        }
    }
}

impl RenderConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(RenderError::Config)
    }

    /// The slow-pass threshold, if enabled.
    pub fn slow_pass_threshold(&self) -> Option<Duration> {
        (self.slow_pass_threshold_ms > 0).then(|| Duration::from_millis(self.slow_pass_threshold_ms))
    }
}
