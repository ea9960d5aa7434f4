use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A point (or duration) in the simulation's virtual timeline, in whole
/// milliseconds. Integer rather than floating point so the event queue's
/// total order is exact and reproducible across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualTime(i64);

impl VirtualTime {
    pub const ZERO: VirtualTime = VirtualTime(0);

    pub fn from_millis(ms: i64) -> Self {
        VirtualTime(ms)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        VirtualTime((secs * 1000.0).round() as i64)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Returns `None` if `delay` is negative, per the clock's contract that
    /// events may never be scheduled strictly before the time they're
    /// scheduled from.
    pub fn checked_add_millis(self, delay_ms: i64) -> Option<VirtualTime> {
        if delay_ms < 0 {
            None
        } else {
            Some(VirtualTime(self.0 + delay_ms))
        }
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl Add<i64> for VirtualTime {
    type Output = VirtualTime;
    fn add(self, rhs: i64) -> VirtualTime {
        VirtualTime(self.0 + rhs)
    }
}

impl AddAssign<i64> for VirtualTime {
    fn add_assign(&mut self, rhs: i64) {
        self.0 += rhs;
    }
}

impl Sub for VirtualTime {
    type Output = i64;
    fn sub(self, rhs: VirtualTime) -> i64 {
        self.0 - rhs.0
    }
}
