//! Decomposed calendar representation used for human-readable conversion
//! and string parsing. `Instant` is the authoritative representation;
//! `DateTime` exists only at the seams where calendar fields are the
//! natural unit (construction from a date, ISO-8601 parsing/formatting).

use crate::constants::MJD_ZERO;
use crate::error::{AstrodyneError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::CString;
use std::fmt;
use std::os::raw::{c_char, c_int};

/// Regular expressions accepted by [`DateTime::from_string`], in the order
/// they are tried.
static VALID_DATETIME_REGEX: Lazy<[Regex; 5]> = Lazy::new(|| {
    [
        Regex::new(r"^(\d{4})\-(\d{2})\-(\d{2})$").unwrap(),
        Regex::new(r"^(\d{4})\-(\d{2})\-(\d{2})[T](\d{2}):(\d{2}):(\d{2})[Z]$").unwrap(),
        Regex::new(r"^(\d{4})\-(\d{2})\-(\d{2})[T](\d{2}):(\d{2}):(\d{2})[.](\d*)[Z]$").unwrap(),
        Regex::new(r"^(\d{4})(\d{2})(\d{2})[T](\d{2})(\d{2})(\d{2})[Z]$").unwrap(),
        Regex::new(r"^(\d{4})\-(\d{2})\-(\d{2})\s(\d{2}):(\d{2}):(\d{2})\.*\s*(\d*)\s*([A-Z]*)$")
            .unwrap(),
    ]
});

/// A decomposed Gregorian calendar date and time of day.
///
/// Seconds range `[0, 60]` inclusive to admit the leap-second calendar
/// instant `23:59:60`. `DateTime` performs no scale conversion of its own;
/// pair it with a [`crate::scales::TimeScale`] (usually via `Instant`) to
/// give it meaning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateTime {
    pub year: u32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: f64,
}

impl DateTime {
    pub fn new(
        year: u32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        nanosecond: f64,
    ) -> Result<DateTime> {
        if !(1..=12).contains(&month) {
            return Err(AstrodyneError::DomainError(format!(
                "month {} out of range [1, 12]",
                month
            )));
        }
        if !(1..=31).contains(&day) {
            return Err(AstrodyneError::DomainError(format!(
                "day {} out of range [1, 31]",
                day
            )));
        }
        if hour > 23 {
            return Err(AstrodyneError::DomainError(format!(
                "hour {} out of range [0, 23]",
                hour
            )));
        }
        if minute > 59 {
            return Err(AstrodyneError::DomainError(format!(
                "minute {} out of range [0, 59]",
                minute
            )));
        }
        if second > 60 {
            return Err(AstrodyneError::DomainError(format!(
                "second {} out of range [0, 60]",
                second
            )));
        }

        Ok(DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            nanosecond,
        })
    }

    /// Parse one of the ISO-8601-adjacent formats the teacher's `Epoch`
    /// string constructor accepted.
    pub fn from_string(s: &str) -> Result<DateTime> {
        for (idx, re) in VALID_DATETIME_REGEX.iter().enumerate() {
            if let Some(caps) = re.captures(s) {
                let year: u32 = caps[1].parse().unwrap();
                let month: u8 = caps[2].parse().unwrap();
                let day: u8 = caps[3].parse().unwrap();

                let (hour, minute, second, nanosecond) = if idx == 0 {
                    (0, 0, 0, 0.0)
                } else {
                    let hour: u8 = caps[4].parse().unwrap();
                    let minute: u8 = caps[5].parse().unwrap();
                    let second: u8 = caps[6].parse().unwrap();
                    let nanosecond: f64 = if caps.len() > 7 && !caps[7].is_empty() {
                        let frac: f64 = format!("0.{}", &caps[7]).parse().unwrap_or(0.0);
                        frac * 1.0e9
                    } else {
                        0.0
                    };
                    (hour, minute, second, nanosecond)
                };

                return DateTime::new(year, month, day, hour, minute, second, nanosecond);
            }
        }

        Err(AstrodyneError::ParseError(format!(
            "'{}' does not match any recognized datetime format",
            s
        )))
    }

    /// Julian Date of this calendar instant, interpreted in whatever scale
    /// the caller has in mind (leap seconds are not applied by this
    /// conversion -- it is a pure calendar/JD map).
    #[allow(temporary_cstring_as_ptr)]
    pub fn to_jd(&self) -> f64 {
        let mut jd: f64 = 0.0;
        let mut fd: f64 = 0.0;

        unsafe {
            rsofa::iauDtf2d(
                CString::new("TAI").unwrap().as_ptr() as *const c_char,
                self.year as i32,
                self.month as i32,
                self.day as i32,
                self.hour as i32,
                self.minute as i32,
                self.second as f64 + self.nanosecond / 1.0e9,
                &mut jd as *mut f64,
                &mut fd as *mut f64,
            );
        }

        jd + fd
    }

    pub fn to_mjd(&self) -> f64 {
        self.to_jd() - MJD_ZERO
    }

    #[allow(temporary_cstring_as_ptr)]
    pub fn from_jd(jd: f64) -> DateTime {
        let mut iy: i32 = 0;
        let mut im: i32 = 0;
        let mut id: i32 = 0;
        let mut ihmsf: [c_int; 4] = [0; 4];

        unsafe {
            rsofa::iauD2dtf(
                CString::new("TAI").unwrap().as_ptr() as *const c_char,
                9,
                jd,
                0.0,
                &mut iy,
                &mut im,
                &mut id,
                &mut ihmsf as *mut i32,
            );
        }

        DateTime {
            year: iy as u32,
            month: im as u8,
            day: id as u8,
            hour: ihmsf[0] as u8,
            minute: ihmsf[1] as u8,
            second: ihmsf[2] as u8,
            nanosecond: ihmsf[3] as f64,
        }
    }

    pub fn from_mjd(mjd: f64) -> DateTime {
        DateTime::from_jd(mjd + MJD_ZERO)
    }
}

impl DateTime {
    /// ISO-8601 instant string with `decimals` fractional-second digits
    /// (clamped to `[0, 9]`), mirroring the teacher's `Epoch::isostringd`.
    pub fn to_isostring(&self, decimals: usize) -> String {
        let decimals = decimals.min(9);
        let base = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        if decimals == 0 {
            return format!("{}Z", base);
        }
        let scale = 10f64.powi(decimals as i32);
        let frac = ((self.nanosecond / 1.0e9) * scale).trunc() as u64;
        format!("{}.{:0width$}Z", base, frac, width = decimals)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_isostring(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn j2000_noon_round_trips() {
        let dt = DateTime::new(2000, 1, 1, 12, 0, 0, 0.0).unwrap();
        assert_abs_diff_eq!(dt.to_jd(), 2451545.0, epsilon = 1e-9);
    }

    #[test]
    fn parses_basic_date() {
        let dt = DateTime::from_string("2018-01-01").unwrap();
        assert_eq!(dt.year, 2018);
        assert_eq!(dt.month, 1);
        assert_eq!(dt.day, 1);
    }

    #[test]
    fn parses_iso_instant() {
        let dt = DateTime::from_string("2018-01-01T00:00:00Z").unwrap();
        assert_eq!(dt.hour, 0);
        assert_eq!(dt.minute, 0);
        assert_eq!(dt.second, 0);
    }

    #[test]
    fn rejects_out_of_range_month() {
        assert!(DateTime::new(2018, 13, 1, 0, 0, 0, 0.0).is_err());
    }

    #[test]
    fn accepts_leap_second_calendar_instant() {
        assert!(DateTime::new(2016, 12, 31, 23, 59, 60, 0.0).is_ok());
    }

    #[test]
    fn isostring_decimals_controls_fractional_digits() {
        let dt = DateTime::new(2018, 1, 1, 0, 0, 0, 123_456_789.0).unwrap();
        assert_eq!(dt.to_isostring(0), "2018-01-01T00:00:00Z");
        assert_eq!(dt.to_isostring(3), "2018-01-01T00:00:00.123Z");
        assert_eq!(dt.to_isostring(9), "2018-01-01T00:00:00.123456789Z");
    }
}
