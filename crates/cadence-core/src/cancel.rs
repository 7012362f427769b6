//! Cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop flag, sampled by the scheduler between batches.
///
/// Raising the token never interrupts a batch mid-execution: every unit
/// due at the current instant still runs, and the scheduler halts at the
/// next batch boundary with all clocks at a consistent, resumable time.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    raised: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, unraised token
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Request a stop at the next batch boundary
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Clear the token so a stopped schedule can be resumed
    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }
}
