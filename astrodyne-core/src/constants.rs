//! Numeric constants the time-scale and reference-frame core depends on.
//!
//! Trimmed from the teacher's `constants.rs`, which also carried the GM/R
//! constants for the Sun, Moon, and every planet -- those back gravity-field
//! and ephemeris models this crate's scope excludes (see `DESIGN.md`).

/// Constant to convert degrees to radians. Units: [rad/deg]
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Constant to convert radians to degrees. Units: [deg/rad]
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

/// Constant to convert arc seconds to radians. Units: [rad/as]
pub const AS2RAD: f64 = DEG2RAD / 3600.0;

/// Constant to convert radians to arc seconds. Units: [as/rad]
pub const RAD2AS: f64 = RAD2DEG * 3600.0;

// Time constants //

/// Offset of Modified Julian Days representation with respect to Julian
/// Days: `MJD_ZERO = t_jd - t_mjd`.
///
/// # References
/// 1. O. Montenbruck, and E. Gill, *Satellite Orbits: Models, Methods and
///    Applications*, 2012.
pub const MJD_ZERO: f64 = 2400000.5;

/// Offset of GPS time system with respect to TAI. Units: (s)
pub const GPS_TAI: f64 = -19.0;

/// Offset of TAI time system with respect to GPS. Units: (s)
pub const TAI_GPS: f64 = -GPS_TAI;

/// Offset of TT time system with respect to TAI. Units: (s)
pub const TT_TAI: f64 = 32.184;

/// Offset of TAI time system with respect to TT. Units: (s)
pub const TAI_TT: f64 = -TT_TAI;

/// Rate of advance of TCG with respect to TT, `L_G` in IAU Resolution
/// B1.9 (2000). Dimensionless.
///
/// # References
/// 1. IAU SOFA Time Scale and Calendar Tools, `iauTttcg`.
pub const TCG_LG: f64 = 6.969290134e-10;

/// Julian date (TT) of the event defining the TT/TCG origin,
/// 1977-01-01T00:00:32.184 TAI.
///
/// # References
/// 1. IAU SOFA Time Scale and Calendar Tools, `iauTttcg`.
pub const TCG_T0_JD: f64 = 2443144.5003725;

// WGS84 ellipsoid //

/// Earth's semi-major axis as defined by the WGS84 geodetic system.
/// Units: (m)
///
/// # References
/// 1. NIMA Technical Report TR8350.2, Department of Defense World Geodetic
///    System 1984, Its Definition and Relationships With Local Geodetic
///    Systems.
pub const WGS84_A: f64 = 6378137.0;

/// Earth's ellipsoidal flattening. WGS84 value. Dimensionless.
///
/// # References
/// 1. NIMA Technical Report TR8350.2.
pub const WGS84_F: f64 = 1.0 / 298.257223563;

/// Earth's axial rotation rate. Units: (rad/s)
///
/// # References
/// 1. D. Vallado, *Fundamentals of Astrodynamics and Applications (4th
///    Ed.)*, p. 222, 2010.
pub const OMEGA_EARTH: f64 = 7.292115146706979e-5;
