//! Render State
//!
//! The three-valued coordination cell shared by a render loop and the
//! notification handler of the same render instance.
//!
//! ```text
//!              notify (idle)                      notify
//! NotRendering ─────────────► RenderingNoPending ─────────► RenderingWithPending
//!      ▲                        │        ▲                        │
//!      └────── pass settles ────┘        └──── next pass starts ──┘
//! ```
//!
//! Every transition is a compare-and-set, so the notification handler and the
//! loop never act on a stale read.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where a render instance stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RenderState {
    /// No pass is running.
    NotRendering = 0,

    /// A pass is running and no change arrived since it started.
    RenderingNoPendingChange = 1,

    /// A pass is running and at least one change arrived since it started.
    RenderingWithPendingChange = 2,
}

impl RenderState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => RenderState::NotRendering,
            1 => RenderState::RenderingNoPendingChange,
            _ => RenderState::RenderingWithPendingChange,
        }
    }
}

/// What the notification handler must do after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeAction {
    /// The instance was idle and this caller now owns the render loop.
    StartLoop,
    /// A pass is running; one more pass is now owed.
    MarkedPending,
    /// A pass is running and already owes another pass.
    AlreadyPending,
}

/// Atomic cell holding a [`RenderState`].
#[derive(Debug)]
pub(crate) struct RenderStateCell(AtomicU8);

impl RenderStateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(RenderState::NotRendering as u8))
    }

    pub(crate) fn load(&self) -> RenderState {
        RenderState::from_raw(self.0.load(Ordering::SeqCst))
    }

    /// Unconditionally enter `RenderingNoPendingChange` at the start of a pass.
    pub(crate) fn begin_pass(&self) {
        self.0
            .store(RenderState::RenderingNoPendingChange as u8, Ordering::SeqCst);
    }

    /// Claim the loop if idle. Returns whether the caller now owns it.
    pub(crate) fn try_claim(&self) -> bool {
        self.transition(RenderState::NotRendering, RenderState::RenderingNoPendingChange)
    }

    /// Return to idle if no change arrived during the pass.
    ///
    /// Returns `false` when a change is pending and another pass is owed.
    pub(crate) fn try_settle(&self) -> bool {
        self.transition(RenderState::RenderingNoPendingChange, RenderState::NotRendering)
    }

    /// Force the idle state; used when the instance is torn down mid-loop.
    pub(crate) fn reset(&self) {
        self.0
            .store(RenderState::NotRendering as u8, Ordering::SeqCst);
    }

    /// Record a change notification.
    pub(crate) fn on_change(&self) -> ChangeAction {
        loop {
            match self.load() {
                RenderState::NotRendering => {
                    if self.try_claim() {
                        return ChangeAction::StartLoop;
                    }
                }
                RenderState::RenderingNoPendingChange => {
                    if self.transition(
                        RenderState::RenderingNoPendingChange,
                        RenderState::RenderingWithPendingChange,
                    ) {
                        return ChangeAction::MarkedPending;
                    }
                }
                RenderState::RenderingWithPendingChange => return ChangeAction::AlreadyPending,
            }
        }
    }

    fn transition(&self, from: RenderState, to: RenderState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
