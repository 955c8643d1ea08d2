use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Signed position on the media timeline in microseconds.
///
/// Two positions are equal only when their microsecond ticks match; this is
/// what the coalescer compares against the player's current time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaTime(i64);

impl MediaTime {
    pub const ZERO: Self = Self(0);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    /// Converts seconds to the nearest microsecond tick. NaN maps to zero.
    ///
    /// # Example
    /// ```
    /// use scrub_engine::MediaTime;
    ///
    /// assert_eq!(MediaTime::from_secs_f64(1.5), MediaTime::from_millis(1_500));
    /// ```
    pub fn from_secs_f64(seconds: f64) -> Self {
        Self((seconds * MICROS_PER_SECOND).round() as i64)
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND
    }
}

impl Add for MediaTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for MediaTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Display for MediaTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}
