// ── Published dashboard state ──

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::model::ReconciledView;
use crate::selection::Selection;
use crate::stream::ViewStream;

/// Reconciled view, selection and the view derived from both.
///
/// Every write goes through `publish_lock`, so a rebuild and a selection
/// change never interleave and an older view never replaces a newer one.
pub struct LiveState {
    pub(crate) view: watch::Sender<Arc<ReconciledView>>,
    pub(crate) selection: watch::Sender<Selection>,
    pub(crate) filtered: watch::Sender<Arc<ReconciledView>>,
    publish_lock: Mutex<()>,
}

impl LiveState {
    pub fn new() -> Self {
        let (view, _) = watch::channel(Arc::new(ReconciledView::default()));
        let (selection, _) = watch::channel(Selection::all());
        let (filtered, _) = watch::channel(Arc::new(ReconciledView::default()));
        Self {
            view,
            selection,
            filtered,
            publish_lock: Mutex::new(()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`; a panicked holder leaves nothing torn.
        self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn view(&self) -> Arc<ReconciledView> {
        Arc::clone(&self.view.borrow())
    }

    pub fn filtered_view(&self) -> Arc<ReconciledView> {
        Arc::clone(&self.filtered.borrow())
    }

    pub fn selection(&self) -> Selection {
        self.selection.borrow().clone()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_view(&self) -> ViewStream {
        ViewStream::new(self.view.subscribe())
    }

    pub fn subscribe_filtered(&self) -> ViewStream {
        ViewStream::new(self.filtered.subscribe())
    }
}

impl Default for LiveState {
    fn default() -> Self {
        Self::new()
    }
}
