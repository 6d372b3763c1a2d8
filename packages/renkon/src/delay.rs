//! Wide-range durations for configured delays.
//!
//! Delays and stream lifetimes are described as `(seconds, attoseconds)`
//! pairs of signed 64-bit integers. Conversion to the platform sleep
//! primitive clamps negatives to zero and saturates at the platform
//! maximum; sub-nanosecond precision is truncated.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attoseconds per second.
pub const ATTOSECONDS_PER_SECOND: i64 = 1_000_000_000_000_000_000;

/// Attoseconds per nanosecond.
pub const ATTOSECONDS_PER_NANOSECOND: i64 = 1_000_000_000;

/// A duration as `(seconds, attoseconds)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Delay {
    /// Whole seconds. Negative values clamp to zero on conversion.
    pub seconds: i64,
    /// Attosecond remainder.
    pub attoseconds: i64,
}

impl Delay {
    /// The largest representable delay; effectively unbounded.
    pub const MAX: Delay = Delay {
        seconds: i64::MAX,
        attoseconds: ATTOSECONDS_PER_SECOND - 1,
    };

    /// A zero delay.
    pub const ZERO: Delay = Delay {
        seconds: 0,
        attoseconds: 0,
    };

    /// Creates a delay from a `(seconds, attoseconds)` pair.
    pub fn new(seconds: i64, attoseconds: i64) -> Self {
        Self {
            seconds,
            attoseconds,
        }
    }

    /// Creates a whole-second delay.
    pub fn from_secs(seconds: i64) -> Self {
        Self::new(seconds, 0)
    }

    /// Creates a delay from milliseconds.
    pub fn from_millis(milliseconds: i64) -> Self {
        Self::new(
            milliseconds / 1_000,
            (milliseconds % 1_000) * ATTOSECONDS_PER_NANOSECOND * 1_000_000,
        )
    }

    /// Whether the clamped delay is zero.
    pub fn is_zero(&self) -> bool {
        self.to_std() == Duration::ZERO
    }

    /// Converts to a [`Duration`] for the sleep primitive.
    ///
    /// Negative delays clamp to zero. An attosecond remainder outside
    /// `[0, 10^18)` is clamped rather than carried, and precision finer
    /// than a nanosecond is truncated. Sleeps beyond the platform's
    /// maximum bound are saturated there.
    pub fn to_std(&self) -> Duration {
        if self.seconds < 0 {
            return Duration::ZERO;
        }
        if self.seconds == 0 && self.attoseconds <= 0 {
            return Duration::ZERO;
        }
        let nanos = (self.attoseconds.clamp(0, ATTOSECONDS_PER_SECOND - 1)
            / ATTOSECONDS_PER_NANOSECOND) as u32;
        Duration::new(self.seconds as u64, nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds() {
        assert_eq!(Delay::from_secs(2).to_std(), Duration::from_secs(2));
    }

    #[test]
    fn test_attosecond_remainder_truncates_to_nanos() {
        // 1.5s expressed as attoseconds.
        let delay = Delay::new(1, ATTOSECONDS_PER_SECOND / 2);
        assert_eq!(delay.to_std(), Duration::from_millis(1_500));

        // Below one nanosecond truncates away.
        let tiny = Delay::new(0, ATTOSECONDS_PER_NANOSECOND - 1);
        assert_eq!(tiny.to_std(), Duration::ZERO);
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(Delay::from_secs(-5).to_std(), Duration::ZERO);
        assert_eq!(Delay::new(0, -1).to_std(), Duration::ZERO);
        assert!(Delay::from_secs(-5).is_zero());
    }

    #[test]
    fn test_overflowing_attoseconds_clamp() {
        let delay = Delay::new(1, i64::MAX);
        assert_eq!(delay.to_std(), Duration::new(1, 999_999_999));
    }

    #[test]
    fn test_from_millis() {
        assert_eq!(Delay::from_millis(2_250).to_std(), Duration::from_millis(2_250));
    }

    #[test]
    fn test_max_is_effectively_unbounded() {
        assert_eq!(Delay::MAX.to_std(), Duration::new(i64::MAX as u64, 999_999_999));
    }

    #[test]
    fn test_serde_shape() {
        let delay = Delay::new(3, 250_000_000_000_000_000);
        let json = serde_json::to_string(&delay).unwrap();
        assert_eq!(json, r#"{"seconds":3,"attoseconds":250000000000000000}"#);
        let back: Delay = serde_json::from_str(&json).unwrap();
        assert_eq!(delay, back);
    }
}
