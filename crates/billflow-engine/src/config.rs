//! Engine configuration.

use std::time::Duration;

/// Tunables for the orchestration engine.  Hosts may override the
/// defaults; the values here match the behavior of the shipped product.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Trailing-edge debounce for client-suggestion keystrokes.
    pub suggest_debounce: Duration,

    /// Trailing-edge debounce for session autosave after draft mutations.
    pub autosave_debounce: Duration,

    /// Maximum candidates requested from a document search.
    pub search_limit: u32,

    /// Maximum suggestions requested from a client lookup.
    pub suggest_limit: u32,

    /// Queries shorter than this return no suggestions (too noisy).
    pub min_suggest_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suggest_debounce: Duration::from_millis(300),
            autosave_debounce: Duration::from_millis(2000),
            search_limit: 5,
            suggest_limit: 5,
            min_suggest_len: 2,
        }
    }
}
