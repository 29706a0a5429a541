//! Trailing-edge debouncer with last-write-wins generation tracking.
//!
//! Each trigger bumps a generation counter and then sleeps for the
//! configured delay; only the call whose generation is still current when
//! the delay elapses "settles" and may proceed.  A superseding trigger
//! within the window therefore cancels every earlier one, and an explicit
//! [`Debouncer::cancel`] invalidates all pending triggers without starting
//! a new one (used when navigating away).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Coalesces rapid triggers down to the trailing edge.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// Wait out the debounce window.
    ///
    /// Returns `true` if this trigger is still the latest when the window
    /// closes, `false` if it was superseded (the caller must discard its
    /// work).
    pub async fn settle(&self) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Invalidate all pending triggers so none of them settle.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
