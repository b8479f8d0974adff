//! Last known display state.
//!
//! Kept in memory only. A failed fetch never clears it, so the matrix keeps
//! showing the previous forecast while the network is down.

use crate::types::DisplayState;

#[derive(Debug, Default)]
pub struct DisplayCache {
    data: Option<DisplayState>,
}

impl DisplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached state with a fresh one
    pub fn store(&mut self, state: DisplayState) {
        tracing::debug!(icon = %state.icon_key, label = %state.label, "Caching display state");
        self.data = Some(state);
    }

    pub fn get(&self) -> Option<&DisplayState> {
        self.data.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}
