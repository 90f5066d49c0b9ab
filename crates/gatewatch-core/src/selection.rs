// ── Selection state ──
//
// The operator's choice of which devices to display. Applying a selection
// derives a new view and never touches the reconciled one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::ReconciledView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    All,
    Selected,
}

/// Which devices are shown.
///
/// Under [`SelectionMode::All`] every device is shown regardless of
/// `names`. Under [`SelectionMode::Selected`] only the named ones are, and
/// an empty set shows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub mode: SelectionMode,
    pub names: BTreeSet<String>,
}

impl Selection {
    /// Show everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Show exactly `names`.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: SelectionMode::Selected,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.mode == SelectionMode::All
    }

    /// Turn "show all" on or off.
    ///
    /// Turning it on resets the selected set to every device currently in
    /// `view`, so switching it off again starts from a full selection.
    pub fn set_show_all(&mut self, on: bool, view: &ReconciledView) {
        if on {
            self.mode = SelectionMode::All;
            self.track(view);
        } else {
            self.mode = SelectionMode::Selected;
        }
    }

    /// While showing all, keep the selected set equal to the devices in
    /// `view`. Returns whether the set changed.
    ///
    /// A `NoData` view leaves the set alone.
    pub fn track(&mut self, view: &ReconciledView) -> bool {
        if !self.is_all() || view.is_no_data() {
            return false;
        }
        let names: BTreeSet<String> = view.names().map(str::to_owned).collect();
        if names == self.names {
            return false;
        }
        self.names = names;
        true
    }

    /// Flip one device in or out of the selected set and switch to
    /// explicit selection.
    pub fn toggle(&mut self, name: &str) {
        self.mode = SelectionMode::Selected;
        if !self.names.remove(name) {
            self.names.insert(name.to_owned());
        }
    }

    pub fn includes(&self, name: &str) -> bool {
        match self.mode {
            SelectionMode::All => true,
            SelectionMode::Selected => self.names.contains(name),
        }
    }

    /// Derive the displayed view. Order follows `view`; `NoData` passes
    /// through unchanged.
    pub fn apply(&self, view: &ReconciledView) -> ReconciledView {
        match view {
            ReconciledView::NoData { .. } => view.clone(),
            ReconciledView::Devices { devices } => ReconciledView::Devices {
                devices: devices
                    .iter()
                    .filter(|d| self.includes(d.name()))
                    .cloned()
                    .collect(),
            },
        }
    }
}
