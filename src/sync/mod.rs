//! Revision-guarded view state for whole-table refetches.
//!
//! A view that refetches on every change notification can see responses
//! arrive out of order; with naive last-write-wins a late, stale response
//! overwrites fresher data. [`TableView`] keeps the revision of the last
//! applied response and rejects anything older.

use crate::auth::SessionState;

/// In-memory snapshot of one table, guarded by the envelope revision.
#[derive(Debug, Clone)]
pub struct TableView<T> {
    rows: Vec<T>,
    applied_revision: i64,
}

impl<T> Default for TableView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TableView<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            applied_revision: -1,
        }
    }

    /// Apply a fetch response taken at `revision`.
    ///
    /// Returns true if the response was applied, false if it was discarded
    /// as stale. Equal revisions are applied: two writes never share one
    /// revision, so an equal value is a harmless re-read of the same state.
    pub fn apply(&mut self, revision: i64, rows: Vec<T>) -> bool {
        if revision < self.applied_revision {
            tracing::debug!(
                "Discarding stale response (revision {} < applied {})",
                revision,
                self.applied_revision
            );
            return false;
        }
        self.applied_revision = revision;
        self.rows = rows;
        true
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn applied_revision(&self) -> i64 {
        self.applied_revision
    }
}

/// Session context threaded into a view at startup.
///
/// Starts `Unknown`; the view resolves it with one session lookup on mount
/// and never caches it across reloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewContext {
    pub session: SessionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_order() {
        let mut view = TableView::new();
        assert!(view.apply(1, vec!["a"]));
        assert!(view.apply(2, vec!["a", "b"]));
        assert_eq!(view.rows(), &["a", "b"]);
        assert_eq!(view.applied_revision(), 2);
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut view = TableView::new();
        assert!(view.apply(5, vec!["fresh"]));
        // A response issued earlier arrives late
        assert!(!view.apply(3, vec!["stale"]));
        assert_eq!(view.rows(), &["fresh"]);
        assert_eq!(view.applied_revision(), 5);
    }

    #[test]
    fn test_equal_revision_reapplied() {
        let mut view = TableView::new();
        assert!(view.apply(4, vec!["a"]));
        assert!(view.apply(4, vec!["a"]));
        assert_eq!(view.applied_revision(), 4);
    }

    #[test]
    fn test_initial_state_accepts_revision_zero() {
        let mut view: TableView<i32> = TableView::new();
        assert!(view.apply(0, vec![]));
    }

    #[test]
    fn test_view_context_starts_unknown() {
        let ctx = ViewContext::default();
        assert_eq!(ctx.session, SessionState::Unknown);
    }
}
