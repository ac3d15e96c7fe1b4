//! Time Reference
//!
//! The single clock cell subtitle matching reads from. Only the primary
//! video's time updates write it.

use std::cell::Cell;

/// Current playback time in seconds.
///
/// Written through a shared reference; readers never take a mutable borrow.
#[derive(Debug, Default)]
pub struct TimeReference {
    seconds: Cell<f64>,
}

impl TimeReference {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.seconds.get()
    }

    #[inline]
    pub fn set(&self, seconds: f64) {
        self.seconds.set(if seconds.is_finite() { seconds } else { 0.0 });
    }

    pub fn reset(&self) {
        self.seconds.set(0.0);
    }
}
