//! Monotonic timestamps for buffer entries.
//!
//! Timestamps are nanoseconds since the owning clock's origin. Wall-clock
//! time never enters the engine, so an entry's age can only grow.

use core::fmt;
use core::time::Duration;

/// Monotonic instant in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Clock origin.
    pub const ZERO: Self = Self(0);

    /// Create from whole seconds.
    #[inline(always)]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Create from whole milliseconds.
    #[inline(always)]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Raw nanoseconds.
    #[inline(always)]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Time elapsed from `self` until `now`. Zero if `now` is earlier.
    #[inline(always)]
    pub const fn age_at(self, now: Self) -> Duration {
        Duration::from_nanos(now.0.saturating_sub(self.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0 as f64 / 1_000_000_000.0)
    }
}

/// Source of "now" for the matcher.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// TSC-backed monotonic clock.
///
/// Wraps `quanta::Clock`; construct it with [`MonotonicClock::from_quanta`]
/// and a `quanta::Clock::mock()` to drive time by hand in tests.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    clock: quanta::Clock,
    origin: quanta::Instant,
}

impl MonotonicClock {
    /// Clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self::from_quanta(quanta::Clock::new())
    }

    /// Wrap an existing `quanta` clock (real or mocked).
    pub fn from_quanta(clock: quanta::Clock) -> Self {
        let origin = clock.now();
        Self { clock, origin }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Timestamp {
        let elapsed = self.clock.now().duration_since(self.origin);
        Timestamp(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
    }
}
