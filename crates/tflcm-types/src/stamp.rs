//! [`Stamp`] – the observation time carried by every transform.
//!
//! A stamp is a `(sec, nsec)` pair counted from the Unix epoch, the same
//! shape the transform messages use on the wire.  Ordering is lexicographic
//! on seconds then nanoseconds, which is what "newest" means everywhere in
//! the buffer.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A point in time with nanosecond resolution.
///
/// `nsec` is always normalised into `0..1_000_000_000`; times before the
/// epoch carry a negative `sec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i64,
    pub nsec: u32,
}

impl Stamp {
    /// Build a stamp, carrying any nanosecond overflow into `sec`.
    pub fn new(sec: i64, nsec: u32) -> Self {
        let carry = i64::from(nsec / 1_000_000_000);
        Self {
            sec: sec.saturating_add(carry),
            nsec: nsec % 1_000_000_000,
        }
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    pub fn from_nanos(nanos: i128) -> Self {
        let sec = nanos.div_euclid(NANOS_PER_SEC);
        let nsec = nanos.rem_euclid(NANOS_PER_SEC);
        Self {
            sec: sec.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
            nsec: nsec as u32,
        }
    }

    pub fn as_nanos(self) -> i128 {
        i128::from(self.sec) * NANOS_PER_SEC + i128::from(self.nsec)
    }

    /// Build a stamp from fractional seconds since the epoch.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::from_nanos((secs * 1e9).round() as i128)
    }

    pub fn as_secs_f64(self) -> f64 {
        self.sec as f64 + f64::from(self.nsec) * 1e-9
    }

    /// Signed distance `self - earlier` in nanoseconds.
    pub fn signed_nanos_since(self, earlier: Stamp) -> i128 {
        self.as_nanos() - earlier.as_nanos()
    }

    /// Absolute distance between two stamps.
    pub fn abs_diff(self, other: Stamp) -> Duration {
        nanos_to_duration(self.signed_nanos_since(other).unsigned_abs())
    }

    pub fn saturating_add(self, d: Duration) -> Self {
        Self::from_nanos(self.as_nanos().saturating_add(d.as_nanos() as i128))
    }

    pub fn saturating_sub(self, d: Duration) -> Self {
        Self::from_nanos(self.as_nanos().saturating_sub(d.as_nanos() as i128))
    }

    /// Convert to a UTC calendar time.  Returns `None` outside chrono's range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sec, self.nsec)
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = nanos / NANOS_PER_SEC as u128;
    let sub = (nanos % NANOS_PER_SEC as u128) as u32;
    Duration::new(u64::try_from(secs).unwrap_or(u64::MAX), sub)
}

impl From<SystemTime> for Stamp {
    fn from(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => Self::from_nanos(-(e.duration().as_nanos() as i128)),
        }
    }
}

impl From<Stamp> for SystemTime {
    fn from(s: Stamp) -> Self {
        let nanos = s.as_nanos();
        if nanos >= 0 {
            UNIX_EPOCH + nanos_to_duration(nanos as u128)
        } else {
            UNIX_EPOCH - nanos_to_duration(nanos.unsigned_abs())
        }
    }
}

impl From<DateTime<Utc>> for Stamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::new(dt.timestamp(), dt.timestamp_subsec_nanos())
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_carries_nanosecond_overflow() {
        let s = Stamp::new(10, 2_500_000_000);
        assert_eq!(s, Stamp { sec: 12, nsec: 500_000_000 });
    }

    #[test]
    fn ordering_is_seconds_then_nanos() {
        assert!(Stamp::new(1, 999_999_999) < Stamp::new(2, 0));
        assert!(Stamp::new(2, 1) > Stamp::new(2, 0));
    }

    #[test]
    fn negative_nanos_normalise_below_epoch() {
        let s = Stamp::from_nanos(-1);
        assert_eq!(s.sec, -1);
        assert_eq!(s.nsec, 999_999_999);
        assert_eq!(s.as_nanos(), -1);
    }

    #[test]
    fn abs_diff_is_symmetric() {
        let a = Stamp::new(100, 0);
        let b = Stamp::new(98, 500_000_000);
        assert_eq!(a.abs_diff(b), Duration::from_millis(1500));
        assert_eq!(b.abs_diff(a), Duration::from_millis(1500));
    }

    #[test]
    fn system_time_conversion_preserves_value() {
        let t = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let s = Stamp::from(t);
        assert_eq!(s, Stamp::new(1_700_000_000, 123_456_789));
        assert_eq!(SystemTime::from(s), t);
    }

    #[test]
    fn datetime_conversion_preserves_value() {
        let dt = DateTime::from_timestamp(1_600_000_000, 42).expect("valid timestamp");
        let s = Stamp::from(dt);
        assert_eq!(s.to_datetime(), Some(dt));
    }

    #[test]
    fn secs_f64_conversion() {
        let s = Stamp::from_secs_f64(12.25);
        assert_eq!(s, Stamp::new(12, 250_000_000));
        assert!((s.as_secs_f64() - 12.25).abs() < 1e-9);
    }

    #[test]
    fn saturating_arithmetic() {
        let s = Stamp::new(5, 0);
        assert_eq!(s.saturating_sub(Duration::from_secs(7)), Stamp::new(-2, 0));
        assert_eq!(s.saturating_add(Duration::from_millis(250)), Stamp::new(5, 250_000_000));
    }

    #[test]
    fn display_pads_nanoseconds() {
        assert_eq!(Stamp::new(3, 5).to_string(), "3.000000005");
    }
}
