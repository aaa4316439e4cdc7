//! Simulation time shared between the engine and the session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Nanosecond simulation clock. The engine advances it; the session reads
/// it to stamp events. Clones observe the same time.
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    now: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ns)),
        }
    }

    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }

    #[inline]
    pub fn advance(&self, ns: u64) {
        self.now.fetch_add(ns, Ordering::Release);
    }

    /// Jumps to an absolute time, e.g. the timestamp of the event being processed.
    #[inline]
    pub fn set(&self, ns: u64) {
        self.now.store(ns, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = SimClock::new(100);
        let engine_side = clock.clone();
        engine_side.advance(250);
        assert_eq!(clock.now_ns(), 350);
        engine_side.set(10);
        assert_eq!(clock.now_ns(), 10);
    }
}
