//! Listener handles.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque token returned by [`Observable::subscribe`](super::Observable::subscribe).
///
/// Handles compare by identity: every call to `subscribe` yields a handle
/// that is distinct from every other handle ever issued, across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique() {
        let h1 = ListenerHandle::new();
        let h2 = ListenerHandle::new();
        let h3 = ListenerHandle::new();

        assert_ne!(h1, h2);
        assert_ne!(h2, h3);
        assert_ne!(h1, h3);
    }
}
