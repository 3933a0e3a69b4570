//! Lifecycle of the view that owns a set of search results

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Query against the owning UI context
///
/// Asynchronous change handlers consult this before touching tracker state;
/// once the view is closed, late events are dropped.
pub trait ViewLifecycle: Send + Sync {
    fn is_closed(&self) -> bool;
}

/// A view that is never closed
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl ViewLifecycle for AlwaysOpen {
    fn is_closed(&self) -> bool {
        false
    }
}

/// Shared open/closed flag for a view
///
/// Clones share the same flag, so the view keeps one handle and gives
/// another to its trackers.
#[derive(Debug, Clone, Default)]
pub struct ViewHandle {
    closed: Arc<AtomicBool>,
}

impl ViewHandle {
    /// Create a handle for an open view
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the view as torn down
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl ViewLifecycle for ViewHandle {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_handle_clones_share_state() {
        let view = ViewHandle::new();
        let tracker_side = view.clone();

        assert!(!tracker_side.is_closed());
        view.close();
        assert!(tracker_side.is_closed());
        assert!(!AlwaysOpen.is_closed());
    }
}
