//! Millisecond clock abstraction.
//!
//! The engine never reads a platform timer itself. The caller hands a
//! [`Clock`] to [`crate::Agent::tick`] and every subsystem derives its
//! elapsed time from that single source, so tests can drive time by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Milliseconds on a monotonic clock.
pub type Millis = u64;

/// A monotonic millisecond source.
pub trait Clock {
    /// Current time in milliseconds. Must never go backwards.
    fn now_ms(&self) -> Millis;
}

/// Wall-independent clock backed by [`Instant`], starting at zero.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is the moment of construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Millis {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A hand-driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock reading `start_ms`.
    #[must_use]
    pub fn new(start_ms: Millis) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Move the clock forward by `delta_ms`.
    pub fn advance(&self, delta_ms: Millis) {
        self.now.fetch_add(delta_ms, Ordering::Relaxed);
    }

    /// Jump to an absolute reading. Callers must not move time backwards.
    pub fn set(&self, now_ms: Millis) {
        self.now.store(now_ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::Relaxed)
    }
}

/// Low 32 bits of a millisecond reading, as stored in snapshot records.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn wire_timestamp(now: Millis) -> u32 {
    (now & u64::from(u32::MAX)) as u32
}

/// Tracks the last time a subsystem ran and reports elapsed time.
///
/// The first observation only anchors the tracker, so a subsystem is never
/// charged for time that passed before it was first ticked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickTracker {
    last: Option<Millis>,
}

impl TickTracker {
    /// Elapsed milliseconds since the last anchor, without moving it.
    #[must_use]
    pub fn peek(&self, now: Millis) -> Millis {
        self.last.map_or(0, |last| now.saturating_sub(last))
    }

    /// Elapsed milliseconds since the last anchor; re-anchors at `now`.
    pub fn advance(&mut self, now: Millis) -> Millis {
        let elapsed = self.peek(now);
        self.last = Some(now);
        elapsed
    }

    /// Whether the tracker has seen a tick yet.
    #[must_use]
    pub fn is_anchored(&self) -> bool {
        self.last.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 350);
        clock.set(1_000);
        assert_eq!(clock.now_ms(), 1_000);
    }

    #[test]
    fn first_tick_only_anchors() {
        let mut tracker = TickTracker::default();
        assert!(!tracker.is_anchored());
        assert_eq!(tracker.advance(5_000), 0);
        assert_eq!(tracker.advance(5_400), 400);
        assert_eq!(tracker.peek(6_000), 600);
    }

    #[test]
    fn wire_timestamp_keeps_low_bits() {
        assert_eq!(wire_timestamp(42), 42);
        assert_eq!(wire_timestamp(u64::from(u32::MAX) + 5), 4);
    }
}
