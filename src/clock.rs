/*!
 * Monotonic Clock Source
 * Absolute deadlines for expiry arithmetic, immune to wall-clock adjustment
 */

use std::time::{Duration, Instant};

/// Absolute monotonic timestamp after which a bounded call is expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    at: Instant,
}

/// Cap applied when `now + duration` is unrepresentable; effectively
/// unbounded for any real call
const DISTANT_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 100);

impl Deadline {
    /// Deadline `duration` from now, saturating for durations too large
    /// for the platform clock to represent
    pub fn after(duration: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(duration)
            .unwrap_or_else(|| now + DISTANT_FUTURE);
        Self { at }
    }

    /// Deadline at an explicit instant
    pub fn at(instant: Instant) -> Self {
        Self { at: instant }
    }

    /// Time left before expiry (zero once passed)
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has been reached
    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// The underlying instant
    pub fn instant(&self) -> Instant {
        self.at
    }
}
