//! IAU 2006/2000A CIO-based rotation matrices: bias-precession-nutation,
//! Earth rotation, and polar motion.
//!
//! Ported from the teacher crate's `frames.rs`, with `Epoch`/`TimeSystem`
//! replaced by [`Instant`]/[`TimeScale`] and the Earth Orientation Parameter
//! lookups replaced by the [`crate::eop::EopProvider`] trait. The SOFA call
//! sequence, and the SOFA cookbook Example 5.5 test vectors that validate
//! it, are unchanged.

use crate::constants::MJD_ZERO;
use crate::eop::EopProvider;
use crate::error::Result;
use crate::instant::Instant;
use crate::scales::TimeScale;
use nalgebra::Matrix3;

fn matrix3_from_array(mat: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::new(
        mat[0][0], mat[0][1], mat[0][2], mat[1][0], mat[1][1], mat[1][2], mat[2][0], mat[2][1],
        mat[2][2],
    )
}

/// Bias-precession-nutation matrix, GCRS -> CIRS, per IAU 2006 precession
/// and IAU 2000A nutation, corrected by the provider's observed Celestial
/// Intermediate Pole offsets.
///
/// # References
/// - IAU SOFA Tools For Earth Attitude, Example 5.5.
#[allow(non_snake_case)]
pub fn bias_precession_nutation(instant: Instant, eop: &dyn EopProvider) -> Result<Matrix3<f64>> {
    let mut x = 0.0;
    let mut y = 0.0;
    let mut s = 0.0;

    unsafe {
        rsofa::iauXys06a(
            MJD_ZERO,
            instant.modified_julian_date(TimeScale::TT)?,
            &mut x,
            &mut y,
            &mut s,
        );
    }

    let (dX, dY) = eop.cip_offset(instant.modified_julian_date(TimeScale::UTC)?)?;
    x += dX;
    y += dY;

    let mut rc2i = [[0.0; 3]; 3];
    unsafe {
        rsofa::iauC2ixys(x, y, s, &mut rc2i[0]);
    }

    Ok(matrix3_from_array(&rc2i))
}

/// Earth rotation matrix, CIRS -> TIRS, from the Earth Rotation Angle at
/// the given instant's UT1.
pub fn earth_rotation(instant: Instant) -> Result<Matrix3<f64>> {
    let mut r = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    unsafe {
        let era = rsofa::iauEra00(MJD_ZERO, instant.modified_julian_date(TimeScale::UT1)?);
        rsofa::iauRz(era, &mut r[0]);
    }

    Ok(matrix3_from_array(&r))
}

/// Polar motion matrix, TIRS -> ITRF, from the provider's observed polar
/// motion components.
pub fn polar_motion(instant: Instant, eop: &dyn EopProvider) -> Result<Matrix3<f64>> {
    let mut rpm = [[0.0; 3]; 3];
    let mjd_tt = instant.modified_julian_date(TimeScale::TT)?;
    let (pm_x, pm_y) = eop.polar_motion(mjd_tt)?;

    unsafe {
        rsofa::iauPom00(pm_x, pm_y, rsofa::iauSp00(MJD_ZERO, mjd_tt), &mut rpm[0]);
    }

    Ok(matrix3_from_array(&rpm))
}

/// Combined rotation, GCRF -> ITRF: bias-precession-nutation, Earth
/// rotation, then polar motion, per SOFA cookbook section 5.5.
pub fn rotation_eci_to_ecef(instant: Instant, eop: &dyn EopProvider) -> Result<Matrix3<f64>> {
    Ok(polar_motion(instant, eop)? * earth_rotation(instant)? * bias_precession_nutation(instant, eop)?)
}

/// Combined rotation, ITRF -> GCRF: the transpose of [`rotation_eci_to_ecef`].
pub fn rotation_ecef_to_eci(instant: Instant, eop: &dyn EopProvider) -> Result<Matrix3<f64>> {
    Ok(rotation_eci_to_ecef(instant, eop)?.transpose())
}

/// Classical precession matrix, GCRS -> mean-of-date, per IAU 2006
/// precession. Feeds the `MOD(epoch)` frame, which the teacher crate never
/// modeled as a first-class frame (it exposed GCRF <-> ITRF only).
pub fn precession_matrix(instant: Instant) -> Result<Matrix3<f64>> {
    let mut rbp = [[0.0; 3]; 3];
    unsafe {
        rsofa::iauPmat06(MJD_ZERO, instant.modified_julian_date(TimeScale::TT)?, &mut rbp[0]);
    }
    Ok(matrix3_from_array(&rbp))
}

/// Classical nutation matrix, mean-of-date -> true-of-date, per IAU 2000A
/// nutation. Feeds the `TOD(epoch)` frame.
pub fn nutation_matrix(instant: Instant) -> Result<Matrix3<f64>> {
    let mut rn = [[0.0; 3]; 3];
    unsafe {
        rsofa::iauNum06a(MJD_ZERO, instant.modified_julian_date(TimeScale::TT)?, &mut rn[0]);
    }
    Ok(matrix3_from_array(&rn))
}

/// Greenwich Mean Sidereal Time (IAU 2006), radians.
pub fn gmst(instant: Instant) -> Result<f64> {
    let uta = MJD_ZERO;
    let utb = instant.modified_julian_date(TimeScale::UT1)?;
    let tta = MJD_ZERO;
    let ttb = instant.modified_julian_date(TimeScale::TT)?;
    Ok(unsafe { rsofa::iauGmst06(uta, utb, tta, ttb) })
}

/// Greenwich Apparent Sidereal Time (IAU 2006/2000A), radians: Greenwich
/// Mean Sidereal Time corrected for the shift in the vernal equinox due to
/// nutation. Feeds the TEME provider's Earth-rotation angle.
pub fn gast(instant: Instant) -> Result<f64> {
    let uta = MJD_ZERO;
    let utb = instant.modified_julian_date(TimeScale::UT1)?;
    let tta = MJD_ZERO;
    let ttb = instant.modified_julian_date(TimeScale::TT)?;
    Ok(unsafe { rsofa::iauGst06a(uta, utb, tta, ttb) })
}
