//! Scale-aware point in time.
//!
//! `Instant` is the authoritative representation of "when" in this crate:
//! internally every instant is stored as a signed nanosecond count from the
//! J2000 epoch in TAI, the one time scale that never steps and never drifts.
//! Conversions to and from the other six scales happen only at the seams
//! (construction and query) via [`crate::scales::scale_offset`].
//!
//! The teacher crate's `Epoch` stores `(days, seconds, nanoseconds)` with
//! Kahan-compensated summation to avoid losing precision over long
//! accumulations of small increments. A plain `i64` nanosecond count gives
//! up that compensation, but it is exact (no floating-point drift at all)
//! and covers +-292 years from J2000, which matches what this crate needs
//! to guarantee. Arithmetic overflow is reported rather than wrapped, the
//! same contract `Duration` uses.

use crate::constants::TAI_TT;
use crate::datetime::DateTime;
use crate::duration::Duration;
use crate::error::{AstrodyneError, Result};
use crate::scales::{self, TimeScale};
use std::cmp::Ordering;
use std::fmt;
use std::ops;
use std::time::{SystemTime, UNIX_EPOCH};

/// Julian Date (TAI) of the J2000 epoch, 2000-01-01T12:00:00 TT.
const J2000_JD_TAI: f64 = 2451545.0 + TAI_TT / 86400.0;

const SECONDS_PER_DAY: f64 = 86400.0;
const NS_PER_SECOND: f64 = 1.0e9;

/// A scale-aware point in time.
///
/// Two `Instant`s compare equal when they denote the same physical instant,
/// regardless of which scale each was constructed or is displayed in -- the
/// `declared_scale` carried by `Defined` only affects formatting and is
/// ignored by `PartialEq`/`PartialOrd`. As with [`Duration`], `Undefined` is
/// a NaN-like sentinel: it compares unequal to everything, including itself,
/// and it propagates through arithmetic instead of panicking.
#[derive(Debug, Clone, Copy)]
pub enum Instant {
    Undefined,
    Defined { ns: i64, declared_scale: TimeScale },
}

impl Instant {
    /// The J2000 epoch, 2000-01-01T12:00:00 TT.
    pub fn j2000() -> Instant {
        Instant::Defined {
            ns: 0,
            declared_scale: TimeScale::TT,
        }
    }

    pub fn undefined() -> Instant {
        Instant::Undefined
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Instant::Defined { .. })
    }

    /// The instant the host clock currently reads, in UTC.
    ///
    /// There is no teacher-crate equivalent (the teacher never samples the
    /// system clock); the calendar conversion below follows Howard
    /// Hinnant's `civil_from_days` algorithm, the standard constant-time
    /// Gregorian day-number decomposition.
    pub fn now() -> Instant {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let unix_days = (since_epoch.as_secs() / 86400) as i64;
        let day_seconds = since_epoch.as_secs() % 86400;
        let (year, month, day) = civil_from_days(unix_days);
        let hour = (day_seconds / 3600) as u8;
        let minute = ((day_seconds % 3600) / 60) as u8;
        let second = (day_seconds % 60) as u8;
        let nanosecond = since_epoch.subsec_nanos() as f64;

        let dt = match DateTime::new(year, month, day, hour, minute, second, nanosecond) {
            Ok(dt) => dt,
            Err(_) => return Instant::Undefined,
        };
        Instant::from_datetime(dt, TimeScale::UTC).unwrap_or(Instant::Undefined)
    }

    /// Construct from a decomposed calendar date and time in the given
    /// scale.
    ///
    /// `scale == UTC` with `dt.second == 60` is handled as an explicit
    /// special case: the day/fraction mapping SOFA's `iauDtf2d` performs
    /// (shared with every other scale via [`DateTime::to_jd`]) folds a
    /// 60th second into the following midnight, collapsing exactly the
    /// instant a leap second exists to represent. Every other combination
    /// of scale and seconds value goes through the ordinary
    /// calendar-to-Julian-Date-to-offset path.
    pub fn from_datetime(dt: DateTime, scale: TimeScale) -> Result<Instant> {
        if scale == TimeScale::UTC && dt.second == 60 {
            let day_start = DateTime::new(dt.year, dt.month, dt.day, 0, 0, 0, 0.0)?;
            let mjd_day = day_start.to_mjd().floor();
            let delta_at = scales::tai_minus_utc_at_mjd_utc(mjd_day)?;
            let day_seconds =
                dt.hour as f64 * 3600.0 + dt.minute as f64 * 60.0 + dt.second as f64
                    + dt.nanosecond / NS_PER_SECOND;
            let tai_jd = mjd_day + crate::constants::MJD_ZERO
                + (day_seconds + delta_at) / SECONDS_PER_DAY;
            return Instant::from_tai_jd(tai_jd, scale);
        }

        let jd = dt.to_jd();
        let offset = scales::scale_offset(jd, 0.0, scale, TimeScale::TAI)?;
        Instant::from_tai_jd(jd + offset / SECONDS_PER_DAY, scale)
    }

    /// Construct from a Julian Date in the given scale. A negative Julian
    /// Date is rejected: this crate has no concept of "before Julian Date
    /// zero" (4713 BC).
    pub fn from_julian_date(jd: f64, scale: TimeScale) -> Result<Instant> {
        if !jd.is_finite() || jd < 0.0 {
            return Err(AstrodyneError::DomainError(format!(
                "Julian date {} is negative or non-finite",
                jd
            )));
        }
        let offset = scales::scale_offset(jd, 0.0, scale, TimeScale::TAI)?;
        Instant::from_tai_jd(jd + offset / SECONDS_PER_DAY, scale)
    }

    /// Construct from a Modified Julian Date in the given scale.
    pub fn from_modified_julian_date(mjd: f64, scale: TimeScale) -> Result<Instant> {
        Instant::from_julian_date(mjd + crate::constants::MJD_ZERO, scale)
    }

    fn from_tai_jd(tai_jd: f64, declared_scale: TimeScale) -> Result<Instant> {
        let ns_f = (tai_jd - J2000_JD_TAI) * SECONDS_PER_DAY * NS_PER_SECOND;
        if !ns_f.is_finite() || ns_f.abs() >= i64::MAX as f64 {
            return Err(AstrodyneError::ArithmeticOverflow(
                "instant outside the +-292 year representable range".to_string(),
            ));
        }
        Ok(Instant::Defined {
            ns: ns_f.round() as i64,
            declared_scale,
        })
    }

    fn ns(&self) -> Option<i64> {
        match self {
            Instant::Undefined => None,
            Instant::Defined { ns, .. } => Some(*ns),
        }
    }

    /// Exact signed TAI nanosecond count from J2000. Used as a transform
    /// cache key, where an exact integer avoids the rounding a round trip
    /// through Julian Date would introduce.
    pub(crate) fn tai_nanoseconds(&self) -> Result<i64> {
        self.ns()
            .ok_or_else(|| AstrodyneError::DomainError("instant is undefined".to_string()))
    }

    fn tai_jd(&self) -> Option<f64> {
        self.ns().map(|ns| J2000_JD_TAI + ns as f64 / (SECONDS_PER_DAY * NS_PER_SECOND))
    }

    /// Julian Date of this instant, expressed in `scale`.
    pub fn julian_date(&self, scale: TimeScale) -> Result<f64> {
        let tai_jd = self
            .tai_jd()
            .ok_or_else(|| AstrodyneError::DomainError("instant is undefined".to_string()))?;
        let offset = scales::scale_offset(tai_jd, 0.0, TimeScale::TAI, scale)?;
        Ok(tai_jd + offset / SECONDS_PER_DAY)
    }

    /// Modified Julian Date of this instant, expressed in `scale`.
    pub fn modified_julian_date(&self, scale: TimeScale) -> Result<f64> {
        Ok(self.julian_date(scale)? - crate::constants::MJD_ZERO)
    }

    /// Decomposed calendar date and time of this instant, expressed in
    /// `scale`.
    pub fn datetime(&self, scale: TimeScale) -> Result<DateTime> {
        Ok(DateTime::from_jd(self.julian_date(scale)?))
    }

    /// Number of leap seconds inserted since 1972-01-01, per SOFA's
    /// `iauDat` table, up to and including this instant's UTC date.
    pub fn leap_second_count(&self) -> Result<u32> {
        let mjd_utc = self.modified_julian_date(TimeScale::UTC)?;
        scales::leap_second_count_at_mjd_utc(mjd_utc)
    }

    /// Render this instant as an ISO-8601 calendar string in the given
    /// scale, with `decimals` fractional-second digits.
    pub fn to_string_as(&self, scale: TimeScale, decimals: usize) -> Result<String> {
        Ok(format!("{} {}", self.datetime(scale)?.to_isostring(decimals), scale))
    }

    /// Whether `self` and `other` denote physical instants no further
    /// apart than `tolerance` (absolute value). `false` if either side is
    /// undefined.
    pub fn is_near(&self, other: &Instant, tolerance: Duration) -> bool {
        match (self.ns(), other.ns(), tolerance.is_defined()) {
            (Some(a), Some(b), true) => {
                let diff_ns = (a - b).unsigned_abs();
                diff_ns as f64 <= tolerance.abs().as_nanoseconds()
            }
            _ => false,
        }
    }
}

impl PartialEq for Instant {
    fn eq(&self, other: &Self) -> bool {
        match (self.ns(), other.ns()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.ns(), other.ns()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instant::Undefined => write!(f, "Instant::Undefined"),
            Instant::Defined { declared_scale, .. } => match self.to_string_as(*declared_scale, 3) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => write!(f, "Instant::Undefined"),
            },
        }
    }
}

impl ops::Sub for Instant {
    type Output = Duration;
    fn sub(self, rhs: Instant) -> Duration {
        match (self.ns(), rhs.ns()) {
            (Some(a), Some(b)) => a
                .checked_sub(b)
                .map(Duration::from_nanoseconds)
                .unwrap_or(Duration::Undefined),
            _ => Duration::Undefined,
        }
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;
    fn add(self, rhs: Duration) -> Instant {
        match (self.ns(), rhs.is_defined().then(|| rhs.as_nanoseconds())) {
            (Some(a), Some(b)) if b.is_finite() => {
                let sum = a as f64 + b;
                if sum.abs() >= i64::MAX as f64 {
                    Instant::Undefined
                } else {
                    match self {
                        Instant::Defined { declared_scale, .. } => Instant::Defined {
                            ns: sum.round() as i64,
                            declared_scale,
                        },
                        Instant::Undefined => Instant::Undefined,
                    }
                }
            }
            _ => Instant::Undefined,
        }
    }
}

impl ops::Sub<Duration> for Instant {
    type Output = Instant;
    fn sub(self, rhs: Duration) -> Instant {
        self + (-rhs)
    }
}

/// Howard Hinnant's `civil_from_days`: map a day count (days since
/// 1970-01-01) to a proleptic Gregorian `(year, month, day)`.
fn civil_from_days(unix_days: i64) -> (u32, u8, u8) {
    let z = unix_days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let y = if m <= 2 { y + 1 } else { y };
    (y as u32, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn j2000_epoch_matches_tt_and_jd() {
        let j2000 = Instant::j2000();
        let dt = j2000.datetime(TimeScale::TT).unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2000, 1, 1));
        assert_eq!((dt.hour, dt.minute, dt.second), (12, 0, 0));
        assert_abs_diff_eq!(j2000.julian_date(TimeScale::TT).unwrap(), 2451545.0, epsilon = 1e-9);
    }

    #[test]
    fn j2000_epoch_in_utc_reflects_accumulated_offset() {
        let j2000 = Instant::j2000();
        let dt = j2000.datetime(TimeScale::UTC).unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2000, 1, 1));
        assert_eq!((dt.hour, dt.minute, dt.second), (11, 58, 55));
        assert_abs_diff_eq!(dt.nanosecond, 816_000_000.0, epsilon = 1.0e6);
    }

    #[test]
    fn utc_tai_leap_second_offset_in_2017() {
        let utc = Instant::from_datetime(
            DateTime::new(2017, 1, 1, 0, 0, 0, 0.0).unwrap(),
            TimeScale::UTC,
        )
        .unwrap();
        let tai = Instant::from_datetime(
            DateTime::new(2017, 1, 1, 0, 0, 37, 0.0).unwrap(),
            TimeScale::TAI,
        )
        .unwrap();
        assert!(utc.is_near(&tai, Duration::from_seconds(1.0e-6)));
    }

    #[test]
    fn leap_second_instant_is_one_second_after_previous_second() {
        let before = Instant::from_datetime(
            DateTime::new(2016, 12, 31, 23, 59, 59, 0.0).unwrap(),
            TimeScale::UTC,
        )
        .unwrap();
        let leap = Instant::from_datetime(
            DateTime::new(2016, 12, 31, 23, 59, 60, 0.0).unwrap(),
            TimeScale::UTC,
        )
        .unwrap();
        let delta = leap - before;
        assert_abs_diff_eq!(delta.as_seconds(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn leap_second_count_increases_across_insertion() {
        let before = Instant::from_datetime(
            DateTime::new(2016, 12, 31, 0, 0, 0, 0.0).unwrap(),
            TimeScale::UTC,
        )
        .unwrap();
        let after = Instant::from_datetime(
            DateTime::new(2017, 1, 2, 0, 0, 0, 0.0).unwrap(),
            TimeScale::UTC,
        )
        .unwrap();
        assert_eq!(
            after.leap_second_count().unwrap() - before.leap_second_count().unwrap(),
            1
        );
    }

    #[test]
    fn subtraction_yields_duration() {
        let a = Instant::from_julian_date(2451545.0, TimeScale::TAI).unwrap();
        let b = Instant::from_julian_date(2451546.0, TimeScale::TAI).unwrap();
        assert_abs_diff_eq!((b - a).as_seconds(), 86400.0, epsilon = 1e-6);
    }

    #[test]
    fn add_and_subtract_duration_round_trip() {
        let a = Instant::j2000();
        let b = a + Duration::from_seconds(3600.0);
        assert_abs_diff_eq!((b - a).as_seconds(), 3600.0, epsilon = 1e-6);
        let c = b - Duration::from_seconds(3600.0);
        assert!(c.is_near(&a, Duration::from_seconds(1e-6)));
    }

    #[test]
    fn negative_julian_date_is_rejected() {
        assert!(Instant::from_julian_date(-1.0, TimeScale::TAI).is_err());
    }

    #[test]
    fn undefined_propagates() {
        let undef = Instant::undefined();
        let defined = Instant::j2000();
        assert_ne!(undef, undef);
        assert!(!(defined - undef).is_defined());
        assert!(!(undef + Duration::from_seconds(1.0)).is_defined());
    }

    #[test]
    fn equality_is_scale_invariant() {
        let utc = Instant::from_datetime(
            DateTime::new(2017, 1, 1, 0, 0, 0, 0.0).unwrap(),
            TimeScale::UTC,
        )
        .unwrap();
        let tai = Instant::from_datetime(
            DateTime::new(2017, 1, 1, 0, 0, 37, 0.0).unwrap(),
            TimeScale::TAI,
        )
        .unwrap();
        assert!(utc.is_near(&tai, Duration::from_nanoseconds(1)));
    }
}
