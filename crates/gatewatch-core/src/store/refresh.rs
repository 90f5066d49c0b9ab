// ── View recomputation ──
//
// Applies a freshly reconciled view, or a new selection, and republishes
// the derived filtered view.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::trace;

use super::LiveState;
use crate::ingest::TelemetryState;
use crate::model::ReconciledView;
use crate::reconcile::reconcile;
use crate::registry::RegistryState;
use crate::selection::Selection;

/// Inputs of one rebuild, read while the publish lock is held.
pub(crate) struct RebuildInputs {
    pub registry: RegistryState,
    pub telemetry: TelemetryState,
    pub now: DateTime<Utc>,
}

impl LiveState {
    /// Reconcile the inputs and publish the result.
    ///
    /// `inputs` runs under the publish lock, so concurrent rebuilds
    /// publish in the order they read their inputs.
    pub(crate) fn rebuild(
        &self,
        inputs: impl FnOnce() -> RebuildInputs,
        staleness_threshold: Duration,
    ) -> Arc<ReconciledView> {
        let _guard = self.lock();
        let RebuildInputs {
            registry,
            telemetry,
            now,
        } = inputs();

        let view = Arc::new(reconcile(
            &registry,
            &telemetry.snapshots,
            &telemetry.health,
            now,
            staleness_threshold,
        ));
        trace!(devices = view.len(), "view rebuilt");

        self.view.send_replace(Arc::clone(&view));
        let mut selection = self.selection();
        if selection.track(&view) {
            self.selection.send_replace(selection.clone());
        }
        self.refilter(&view, &selection);
        view
    }

    /// Replace the selection and republish the filtered view.
    pub(crate) fn apply_selection(&self, mut selection: Selection) -> Arc<ReconciledView> {
        let _guard = self.lock();
        let view = self.view();
        selection.track(&view);
        self.selection.send_replace(selection.clone());
        self.refilter(&view, &selection)
    }

    /// Turn "show all" on or off against the current view.
    pub(crate) fn set_show_all(&self, on: bool) -> Arc<ReconciledView> {
        let _guard = self.lock();
        let view = self.view();
        let mut selection = self.selection();
        selection.set_show_all(on, &view);
        self.selection.send_replace(selection.clone());
        self.refilter(&view, &selection)
    }

    fn refilter(&self, view: &ReconciledView, selection: &Selection) -> Arc<ReconciledView> {
        let filtered = Arc::new(selection.apply(view));
        self.filtered.send_replace(Arc::clone(&filtered));
        filtered
    }
}
