//! Time scale identifiers and the pairwise offset function that converts
//! between them.

use crate::constants::{GPS_TAI, MJD_ZERO, TAI_GPS, TAI_TT, TCG_LG, TCG_T0_JD, TT_TAI};
use crate::eop;
use crate::error::{AstrodyneError, Result};
use std::ffi::CString;
use std::fmt;
use std::os::raw::{c_char, c_int};

/// A recognized astronomical/engineering time scale.
///
/// All scales below tick at the same underlying SI-second rate; they differ
/// only in their additive offset from TAI (constant for TT/GPS, a small
/// periodic term for TDB, a linear drift for TCG, and a table lookup for
/// UTC/UT1).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TimeScale {
    /// Temps Atomique International: the continuous atomic time scale all
    /// others are defined relative to.
    TAI,
    /// Universal Coordinated Time: TAI steered by integer leap seconds to
    /// track mean solar time within 0.9s.
    UTC,
    /// Universal Time 1: mean solar time at the Greenwich meridian.
    UT1,
    /// Terrestrial Time: TAI + 32.184s, the time scale of geocentric
    /// ephemerides.
    TT,
    /// Global Positioning System time: TAI - 19s, continuous, no leap
    /// seconds since inception (1980-01-06).
    GPS,
    /// Barycentric Dynamical Time: TT plus a small periodic relativistic
    /// correction, used for solar-system-barycentric ephemerides.
    TDB,
    /// Geocentric Coordinate Time: TT scaled by the relativistic rate
    /// factor `L_G`, used in the geocentric relativistic metric.
    TCG,
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TimeScale::TAI => "TAI",
            TimeScale::UTC => "UTC",
            TimeScale::UT1 => "UT1",
            TimeScale::TT => "TT",
            TimeScale::GPS => "GPS",
            TimeScale::TDB => "TDB",
            TimeScale::TCG => "TCG",
        };
        write!(f, "{}", s)
    }
}

/// Take a JD/FD pair in the UTC time scale and return the offset (seconds)
/// that must be added to reach TAI.
#[allow(temporary_cstring_as_ptr)]
fn utc_jdfd_to_tai_offset(jd: f64, fd: f64) -> f64 {
    let mut iy: i32 = 0;
    let mut im: i32 = 0;
    let mut id: i32 = 0;
    let mut ihmsf: [c_int; 4] = [0; 4];
    let mut dutc: f64 = 0.0;

    unsafe {
        rsofa::iauD2dtf(
            CString::new("UTC").unwrap().as_ptr() as *const c_char,
            9,
            jd,
            fd,
            &mut iy,
            &mut im,
            &mut id,
            &mut ihmsf as *mut i32,
        );

        let seconds =
            (ihmsf[0] * 3600 + ihmsf[1] * 60 + ihmsf[2]) as f64 + (ihmsf[3] as f64) / 1.0e9;
        rsofa::iauDat(iy, im, id, seconds / 86400.0, &mut dutc);
    }

    dutc
}

/// Take a JD/FD pair in the TAI time scale and return the offset (seconds)
/// that must be subtracted to reach UTC.
#[allow(temporary_cstring_as_ptr)]
fn tai_jdfd_to_utc_offset(jd: f64, fd: f64) -> f64 {
    let mut u1 = jd;
    let mut u2 = fd;

    for _ in 0..3 {
        let mut d1 = 0.0;
        let mut d2 = 0.0;

        unsafe {
            rsofa::iauUtctai(u1, u2, &mut d1, &mut d2);
        }

        u1 += jd - d1;
        u2 += fd - d2;
    }

    let mut iy: i32 = 0;
    let mut im: i32 = 0;
    let mut id: i32 = 0;
    let mut ihmsf: [c_int; 4] = [0; 4];
    let mut dutc: f64 = 0.0;

    unsafe {
        rsofa::iauD2dtf(
            CString::new("UTC").unwrap().as_ptr() as *const c_char,
            9,
            jd,
            fd,
            &mut iy,
            &mut im,
            &mut id,
            &mut ihmsf as *mut i32,
        );

        let seconds =
            (ihmsf[0] * 3600 + ihmsf[1] * 60 + ihmsf[2]) as f64 + (ihmsf[3] as f64) / 1.0e9;
        rsofa::iauDat(iy, im, id, seconds / 86400.0, &mut dutc);
    }

    dutc
}

/// TAI-UTC offset (seconds) at the given UTC Modified Julian Date, via
/// SOFA's `iauDat`. `Instant`'s leap-second special cases (the 60th-second
/// calendar fold-in and `leap_second_count`) call this directly so they stay
/// in sync with [`scale_offset`]'s own UTC legs above, rather than
/// consulting a second, independently maintained table.
///
/// Returns `Unsupported` before 1972-01-01, SOFA's first tabulated leap
/// second, when UTC was not yet a uniform atomic-second time scale.
#[allow(temporary_cstring_as_ptr)]
pub(crate) fn tai_minus_utc_at_mjd_utc(mjd_utc: f64) -> Result<f64> {
    const UTC_EPOCH_MJD: f64 = 41317.0;

    if mjd_utc < UTC_EPOCH_MJD {
        return Err(AstrodyneError::Unsupported(
            "UTC before 1972-01-01 is not representable as a uniform atomic time scale"
                .to_string(),
        ));
    }

    Ok(utc_jdfd_to_tai_offset(mjd_utc + MJD_ZERO, 0.0))
}

/// Number of leap seconds inserted since 1972-01-01 (SOFA's first
/// tabulated offset, 10s), up to and including the given UTC Modified
/// Julian Date.
pub(crate) fn leap_second_count_at_mjd_utc(mjd_utc: f64) -> Result<u32> {
    const BASE_OFFSET: f64 = 10.0;
    let offset = tai_minus_utc_at_mjd_utc(mjd_utc)?;
    Ok((offset - BASE_OFFSET).round() as u32)
}

/// TDB-TT periodic correction (seconds) at a geocentric observer, via
/// SOFA's `iauDtdb`.
fn tt_jdfd_to_tdb_offset(jd: f64, fd: f64) -> f64 {
    unsafe { rsofa::iauDtdb(jd, fd, 0.0, 0.0, 0.0, 0.0) }
}

/// TCG-TT linear drift (seconds), per IAU Resolution B1.9 (2000).
fn tt_jdfd_to_tcg_offset(jd: f64, fd: f64) -> f64 {
    let elapsed_days = (jd - TCG_T0_JD) + fd;
    TCG_LG / (1.0 - TCG_LG) * elapsed_days * 86400.0
}

/// TT-TCG linear drift (seconds), the inverse of [`tt_jdfd_to_tcg_offset`].
fn tcg_jdfd_to_tt_offset(jd: f64, fd: f64) -> f64 {
    let elapsed_days = (jd - TCG_T0_JD) + fd;
    -TCG_LG * elapsed_days * 86400.0
}

/// Compute the offset (in seconds) to add to an instant expressed in
/// `src` to obtain the equivalent instant in `dst`, given a two-part
/// Julian date in the `src` scale.
///
/// This generalizes the teacher crate's `time_system_offset` from five
/// scales (GPS/TAI/TT/UTC/UT1) to the full set of seven the time core
/// supports (adding TDB and TCG), following the same "convert to TAI, then
/// to destination" routing.
///
/// UT1 legs consult the global EOP provider for DUT1; an `OutOfRange` query
/// (the provider declines to extrapolate) propagates to the caller rather
/// than being treated as `DUT1 = 0`.
pub fn scale_offset(jd: f64, fd: f64, src: TimeScale, dst: TimeScale) -> Result<f64> {
    if src == dst {
        return Ok(0.0);
    }

    let mut offset: f64 = 0.0;

    // Source -> TAI
    match src {
        TimeScale::GPS => offset += crate::constants::TAI_GPS,
        TimeScale::TAI => {}
        TimeScale::TT => offset += TAI_TT,
        TimeScale::TDB => {
            // TDB -> TT is the inverse of the periodic correction; one
            // fixed-point iteration is sufficient given the sub-ms
            // amplitude of the correction.
            let dtr = tt_jdfd_to_tdb_offset(jd, fd);
            offset += TAI_TT - dtr;
        }
        TimeScale::TCG => {
            offset += TAI_TT + tcg_jdfd_to_tt_offset(jd, fd);
        }
        TimeScale::UTC => offset += utc_jdfd_to_tai_offset(jd, fd),
        TimeScale::UT1 => {
            let dut1 = eop::get_global_ut1_utc((jd - MJD_ZERO) + fd)?;
            offset += utc_jdfd_to_tai_offset(jd, fd - dut1);
            offset -= dut1;
        }
    }

    // TAI -> destination
    match dst {
        TimeScale::GPS => offset += GPS_TAI,
        TimeScale::TAI => {}
        TimeScale::TT => offset += TT_TAI,
        TimeScale::TDB => {
            offset += TT_TAI;
            offset += tt_jdfd_to_tdb_offset(jd, fd + offset / 86400.0);
        }
        TimeScale::TCG => {
            offset += TT_TAI;
            offset += tt_jdfd_to_tcg_offset(jd, fd + offset / 86400.0);
        }
        TimeScale::UTC => {
            offset -= tai_jdfd_to_utc_offset(jd, fd + offset / 86400.0);
        }
        TimeScale::UT1 => {
            offset -= tai_jdfd_to_utc_offset(jd, fd + offset / 86400.0);
            offset += eop::get_global_ut1_utc(jd + fd + offset / 86400.0 - MJD_ZERO)?;
        }
    }

    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_offset_is_zero() {
        assert_eq!(scale_offset(2451545.0, 0.0, TimeScale::TAI, TimeScale::TAI).unwrap(), 0.0);
    }

    #[test]
    fn tai_gps_offset_is_constant() {
        let offset = scale_offset(2451545.0, 0.0, TimeScale::TAI, TimeScale::GPS).unwrap();
        assert_eq!(offset, GPS_TAI);
    }

    #[test]
    fn tai_tt_offset_is_constant() {
        let offset = scale_offset(2451545.0, 0.0, TimeScale::TAI, TimeScale::TT).unwrap();
        assert_eq!(offset, TT_TAI);
    }

    #[test]
    fn tcg_offset_grows_from_epoch() {
        let earlier = scale_offset(2451545.0, 0.0, TimeScale::TT, TimeScale::TCG).unwrap();
        let later = scale_offset(2460000.0, 0.0, TimeScale::TT, TimeScale::TCG).unwrap();
        assert!(later > earlier);
    }

    #[test]
    fn tai_minus_utc_before_1972_is_unsupported() {
        assert!(tai_minus_utc_at_mjd_utc(40000.0).is_err());
    }

    #[test]
    fn tai_minus_utc_at_first_leap_second() {
        assert_eq!(tai_minus_utc_at_mjd_utc(41317.0).unwrap(), 10.0);
    }

    #[test]
    fn tai_minus_utc_holds_after_the_last_known_leap_second() {
        let offset = tai_minus_utc_at_mjd_utc(60000.0).unwrap();
        assert!(offset >= 37.0);
    }

    #[test]
    fn leap_second_count_matches_tai_minus_utc() {
        let mjd = 57754.0; // 2017-01-01, TAI-UTC = 37
        assert_eq!(leap_second_count_at_mjd_utc(mjd).unwrap(), 27);
    }

    #[test]
    fn out_of_range_ut1_eop_query_surfaces_to_the_caller() {
        use crate::eop::{set_global_provider, EopExtrapolation, EopRecord, TabularEop};
        use std::collections::BTreeMap;
        use std::sync::Arc;

        let mut data = BTreeMap::new();
        data.insert(
            58000,
            EopRecord {
                pm_x: 0.0,
                pm_y: 0.0,
                ut1_utc: 0.0,
                lod: None,
                dx: None,
                dy: None,
            },
        );
        let provider =
            TabularEop::new(data, EopExtrapolation::Error, false).expect("non-empty table");
        set_global_provider(Arc::new(provider));

        // Well past the table's single entry, with extrapolation disabled.
        let err = scale_offset(2460000.5, 0.0, TimeScale::UTC, TimeScale::UT1);

        set_global_provider(Arc::new(TabularEop::zero()));

        assert!(matches!(err, Err(crate::error::AstrodyneError::OutOfRange(_))));
    }
}
