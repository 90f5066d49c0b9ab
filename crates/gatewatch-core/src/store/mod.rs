// ── Live view store ──
//
// Holds the published reconciled view and the operator's selection.
// Each value lives in its own `watch` channel and is replaced whole.

mod live_state;
mod refresh;

pub use live_state::LiveState;
pub(crate) use refresh::RebuildInputs;
