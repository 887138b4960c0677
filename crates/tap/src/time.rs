//! Wall-clock port.
//!
//! The observer never reads the system clock directly: every timestamp it
//! stamps comes through a [`Clock`] supplied at construction. Production code
//! uses [`SystemClock`]; tests substitute a hand-driven clock so timing
//! assertions are deterministic.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in milliseconds since the UNIX epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// [`Clock`] backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as i64)
    }
}
