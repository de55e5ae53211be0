//! Signed, nanosecond-resolution time interval.

use crate::error::{AstrodyneError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::ops;

static ISO8601_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$").unwrap()
});

const NS_PER_US: i64 = 1_000;
const NS_PER_MS: i64 = 1_000_000;
const NS_PER_S: i64 = 1_000_000_000;
const NS_PER_MIN: i64 = 60 * NS_PER_S;
const NS_PER_HOUR: i64 = 60 * NS_PER_MIN;
const NS_PER_DAY: i64 = 24 * NS_PER_HOUR;

/// A signed time interval with nanosecond resolution.
///
/// `Duration` carries a distinct `Undefined` state, analogous to a
/// floating-point `NaN`: it is not equal to anything, including another
/// `Undefined` duration, and it propagates through arithmetic. Well-defined
/// durations are backed by a signed 64-bit nanosecond count; operations that
/// would overflow that range return an `ArithmeticOverflow` error rather
/// than wrapping.
#[derive(Debug, Clone, Copy)]
pub enum Duration {
    Undefined,
    Defined(i64),
}

impl Duration {
    pub const ZERO: Duration = Duration::Defined(0);

    pub fn undefined() -> Duration {
        Duration::Undefined
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Duration::Defined(_))
    }

    pub fn from_nanoseconds(ns: i64) -> Duration {
        Duration::Defined(ns)
    }

    pub fn from_microseconds(us: f64) -> Duration {
        Duration::Defined((us * NS_PER_US as f64).round() as i64)
    }

    pub fn from_milliseconds(ms: f64) -> Duration {
        Duration::Defined((ms * NS_PER_MS as f64).round() as i64)
    }

    pub fn from_seconds(s: f64) -> Duration {
        Duration::Defined((s * NS_PER_S as f64).round() as i64)
    }

    pub fn from_minutes(m: f64) -> Duration {
        Duration::from_seconds(m * 60.0)
    }

    pub fn from_hours(h: f64) -> Duration {
        Duration::from_seconds(h * 3600.0)
    }

    pub fn from_days(d: f64) -> Duration {
        Duration::from_seconds(d * 86400.0)
    }

    /// Parse an interval given as `"[-]HH:MM:SS[.fffffffff]"`.
    pub fn from_hms_string(s: &str) -> Result<Duration> {
        let (sign, rest) = if let Some(stripped) = s.strip_prefix('-') {
            (-1.0, stripped)
        } else {
            (1.0, s)
        };

        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() != 3 {
            return Err(AstrodyneError::ParseError(format!(
                "expected HH:MM:SS[.fff], got '{}'",
                s
            )));
        }

        let hours: f64 = parts[0]
            .parse()
            .map_err(|_| AstrodyneError::ParseError(format!("invalid hours in '{}'", s)))?;
        let minutes: f64 = parts[1]
            .parse()
            .map_err(|_| AstrodyneError::ParseError(format!("invalid minutes in '{}'", s)))?;
        let seconds: f64 = parts[2]
            .parse()
            .map_err(|_| AstrodyneError::ParseError(format!("invalid seconds in '{}'", s)))?;

        Ok(Duration::from_seconds(
            sign * (hours * 3600.0 + minutes * 60.0 + seconds),
        ))
    }

    /// Parse an ISO-8601 duration, e.g. `"PT1H30M"`, `"-P1DT12H"`. Only the
    /// day/hour/minute/second designators are supported -- years and months
    /// are calendar-dependent and have no fixed length in seconds.
    pub fn from_iso8601_string(s: &str) -> Result<Duration> {
        let captures = ISO8601_DURATION_RE
            .captures(s)
            .ok_or_else(|| AstrodyneError::ParseError(format!("invalid ISO-8601 duration '{}'", s)))?;

        if captures.iter().skip(2).all(|g| g.is_none()) {
            return Err(AstrodyneError::ParseError(format!(
                "ISO-8601 duration '{}' has no designators",
                s
            )));
        }

        let sign = if captures.get(1).is_some() { -1.0 } else { 1.0 };
        let field = |i: usize| -> f64 {
            captures
                .get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        let days = field(2);
        let hours = field(3);
        let minutes = field(4);
        let seconds = field(5);

        Ok(Duration::from_seconds(
            sign * (days * 86400.0 + hours * 3600.0 + minutes * 60.0 + seconds),
        ))
    }

    fn ns(&self) -> Option<i64> {
        match self {
            Duration::Undefined => None,
            Duration::Defined(ns) => Some(*ns),
        }
    }

    pub fn as_nanoseconds(&self) -> f64 {
        self.ns().map(|v| v as f64).unwrap_or(f64::NAN)
    }

    pub fn as_microseconds(&self) -> f64 {
        self.as_nanoseconds() / NS_PER_US as f64
    }

    pub fn as_milliseconds(&self) -> f64 {
        self.as_nanoseconds() / NS_PER_MS as f64
    }

    pub fn as_seconds(&self) -> f64 {
        self.as_nanoseconds() / NS_PER_S as f64
    }

    pub fn as_minutes(&self) -> f64 {
        self.as_seconds() / 60.0
    }

    pub fn as_hours(&self) -> f64 {
        self.as_seconds() / 3600.0
    }

    pub fn as_days(&self) -> f64 {
        self.as_seconds() / 86400.0
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Duration::Defined(0))
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Duration::Defined(ns) if *ns > 0)
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Duration::Defined(ns) if *ns < 0)
    }

    pub fn abs(&self) -> Duration {
        match self.ns() {
            Some(ns) => Duration::Defined(ns.abs()),
            None => Duration::Undefined,
        }
    }

    pub fn checked_add(&self, other: &Duration) -> Result<Duration> {
        match (self.ns(), other.ns()) {
            (Some(a), Some(b)) => a
                .checked_add(b)
                .map(Duration::Defined)
                .ok_or_else(|| AstrodyneError::ArithmeticOverflow("duration addition".to_string())),
            _ => Ok(Duration::Undefined),
        }
    }

    pub fn checked_sub(&self, other: &Duration) -> Result<Duration> {
        match (self.ns(), other.ns()) {
            (Some(a), Some(b)) => a
                .checked_sub(b)
                .map(Duration::Defined)
                .ok_or_else(|| AstrodyneError::ArithmeticOverflow("duration subtraction".to_string())),
            _ => Ok(Duration::Undefined),
        }
    }

    pub fn checked_mul(&self, scalar: f64) -> Result<Duration> {
        match self.ns() {
            Some(a) => {
                let scaled = a as f64 * scalar;
                if scaled.abs() > i64::MAX as f64 {
                    Err(AstrodyneError::ArithmeticOverflow(
                        "duration scalar multiplication".to_string(),
                    ))
                } else {
                    Ok(Duration::Defined(scaled.round() as i64))
                }
            }
            None => Ok(Duration::Undefined),
        }
    }

    pub fn checked_div(&self, scalar: f64) -> Result<Duration> {
        if scalar == 0.0 {
            return Err(AstrodyneError::ArithmeticOverflow(
                "duration division by zero".to_string(),
            ));
        }
        self.checked_mul(1.0 / scalar)
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        match (self.ns(), other.ns()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.ns(), other.ns()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.ns() {
            None => write!(f, "Duration::Undefined"),
            Some(_) => {
                let total = self.as_seconds();
                let sign = if total < 0.0 { "-" } else { "" };
                let total = total.abs();
                let hours = (total / 3600.0).floor();
                let minutes = ((total - hours * 3600.0) / 60.0).floor();
                let seconds = total - hours * 3600.0 - minutes * 60.0;
                write!(f, "{}{:02}:{:02}:{:09.6}", sign, hours, minutes, seconds)
            }
        }
    }
}

impl ops::Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Duration) -> Duration {
        self.checked_add(&rhs).unwrap_or(Duration::Undefined)
    }
}

impl ops::Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Duration) -> Duration {
        self.checked_sub(&rhs).unwrap_or(Duration::Undefined)
    }
}

impl ops::Neg for Duration {
    type Output = Duration;
    fn neg(self) -> Duration {
        match self.ns() {
            Some(ns) => Duration::Defined(-ns),
            None => Duration::Undefined,
        }
    }
}

impl ops::Mul<f64> for Duration {
    type Output = Duration;
    fn mul(self, rhs: f64) -> Duration {
        self.checked_mul(rhs).unwrap_or(Duration::Undefined)
    }
}

impl ops::Div<f64> for Duration {
    type Output = Duration;
    fn div(self, rhs: f64) -> Duration {
        self.checked_div(rhs).unwrap_or(Duration::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn undefined_is_never_equal() {
        assert_ne!(Duration::Undefined, Duration::Undefined);
        assert_ne!(Duration::Undefined, Duration::ZERO);
    }

    #[test]
    fn roundtrip_seconds() {
        let d = Duration::from_seconds(3661.5);
        assert_abs_diff_eq!(d.as_seconds(), 3661.5, epsilon = 1e-9);
    }

    #[test]
    fn addition_and_subtraction() {
        let a = Duration::from_seconds(10.0);
        let b = Duration::from_seconds(4.0);
        assert_abs_diff_eq!((a + b).as_seconds(), 14.0, epsilon = 1e-9);
        assert_abs_diff_eq!((a - b).as_seconds(), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn overflow_is_reported() {
        let a = Duration::Defined(i64::MAX);
        let b = Duration::Defined(1);
        assert!(a.checked_add(&b).is_err());
    }

    #[test]
    fn undefined_propagates_through_arithmetic() {
        let result = Duration::Undefined + Duration::from_seconds(1.0);
        assert!(!result.is_defined());
    }

    #[test]
    fn parses_hms_string() {
        let d = Duration::from_hms_string("-01:02:03.5").unwrap();
        assert_abs_diff_eq!(d.as_seconds(), -3723.5, epsilon = 1e-9);
    }

    #[test]
    fn parses_iso8601_string() {
        let d = Duration::from_iso8601_string("PT1H30M").unwrap();
        assert_abs_diff_eq!(d.as_seconds(), 5400.0, epsilon = 1e-9);

        let d = Duration::from_iso8601_string("-P1DT12H").unwrap();
        assert_abs_diff_eq!(d.as_seconds(), -129600.0, epsilon = 1e-9);

        let d = Duration::from_iso8601_string("PT30.5S").unwrap();
        assert_abs_diff_eq!(d.as_seconds(), 30.5, epsilon = 1e-9);
    }

    #[test]
    fn rejects_malformed_iso8601_string() {
        assert!(Duration::from_iso8601_string("1H30M").is_err());
        assert!(Duration::from_iso8601_string("P").is_err());
    }

    #[test]
    fn is_positive_and_negative() {
        assert!(Duration::from_seconds(1.0).is_positive());
        assert!(Duration::from_seconds(-1.0).is_negative());
        assert!(Duration::ZERO.is_zero());
    }
}
