//! Geodetic (longitude, latitude, altitude) to body-fixed Cartesian
//! conversion, and the topocentric rotation a local-tangent-plane frame
//! needs.
//!
//! Ported from the teacher crate's `coordinates.rs`, narrowed to the WGS84
//! ellipsoid conversions and the local-tangent-plane rotation the North-
//! East-Down provider needs; the orbital-element and relative-position
//! (azimuth/elevation) machinery in the original is out of scope here.

use crate::constants;
use crate::error::{AstrodyneError, Result};
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

const ECC2: f64 = constants::WGS84_F * (2.0 - constants::WGS84_F);

/// Geodetic longitude, latitude (radians), and altitude (meters) above the
/// WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

impl Geodetic {
    pub fn new(longitude: f64, latitude: f64, altitude: f64) -> Result<Geodetic> {
        if !(-PI / 2.0..=PI / 2.0).contains(&latitude) {
            return Err(AstrodyneError::DomainError(format!(
                "geodetic latitude {} out of range [-pi/2, pi/2]",
                latitude
            )));
        }
        Ok(Geodetic {
            longitude,
            latitude,
            altitude,
        })
    }

    /// Position of this point in the body-fixed (ECEF/ITRF) frame, on the
    /// WGS84 ellipsoid.
    pub fn to_ecef(&self) -> Vector3<f64> {
        let n = constants::WGS84_A / (1.0 - ECC2 * self.latitude.sin().powi(2)).sqrt();
        let x = (n + self.altitude) * self.latitude.cos() * self.longitude.cos();
        let y = (n + self.altitude) * self.latitude.cos() * self.longitude.sin();
        let z = ((1.0 - ECC2) * n + self.altitude) * self.latitude.sin();
        Vector3::new(x, y, z)
    }

    /// Recover geodetic coordinates from a body-fixed Cartesian position,
    /// via Bowring's iterative method.
    pub fn from_ecef(x_ecef: Vector3<f64>) -> Result<Geodetic> {
        let x = x_ecef[0];
        let y = x_ecef[1];
        let z = x_ecef[2];

        let eps = f64::EPSILON * 1.0e3;
        let rho2 = x * x + y * y;
        let mut dz = ECC2 * z;
        let mut n = 0.0;

        let mut converged = false;
        for _ in 0..10 {
            let zdz = z + dz;
            let nh = (rho2 + zdz * zdz).sqrt();
            let sinphi = zdz / nh;
            n = constants::WGS84_A / (1.0 - ECC2 * sinphi * sinphi).sqrt();
            let dz_new = n * ECC2 * sinphi;

            if (dz - dz_new).abs() < eps {
                converged = true;
                break;
            }
            dz = dz_new;
        }

        if !converged {
            return Err(AstrodyneError::DomainError(
                "geodetic conversion did not converge in 10 iterations".to_string(),
            ));
        }

        let zdz = z + dz;
        let longitude = y.atan2(x);
        let latitude = zdz.atan2(rho2.sqrt());
        let altitude = (rho2 + zdz * zdz).sqrt() - n;

        Geodetic::new(longitude, latitude, altitude)
    }

    /// Rotation matrix from body-fixed (ECEF) axes to the local North-East-
    /// Down tangent plane rooted at this point.
    ///
    /// Derived from the teacher's South-East-Zenith basis
    /// (`rotation_ellipsoid_to_sez`): North = -South, East = East,
    /// Down = -Zenith, so the NED rows are the SEZ rows with the first and
    /// third negated.
    pub fn rotation_ecef_to_ned(&self) -> Matrix3<f64> {
        let lon = self.longitude;
        let lat = self.latitude;

        let sez = Matrix3::new(
            lat.sin() * lon.cos(),
            lat.sin() * lon.sin(),
            -lat.cos(),
            -lon.sin(),
            lon.cos(),
            0.0,
            lat.cos() * lon.cos(),
            lat.cos() * lon.sin(),
            lat.sin(),
        );

        Matrix3::new(
            -sez[(0, 0)],
            -sez[(0, 1)],
            -sez[(0, 2)],
            sez[(1, 0)],
            sez[(1, 1)],
            sez[(1, 2)],
            -sez[(2, 0)],
            -sez[(2, 1)],
            -sez[(2, 2)],
        )
    }

    pub fn rotation_ned_to_ecef(&self) -> Matrix3<f64> {
        self.rotation_ecef_to_ned().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn equator_prime_meridian_round_trips() {
        let geod = Geodetic::new(0.0, 0.0, 0.0).unwrap();
        let ecef = geod.to_ecef();
        assert_abs_diff_eq!(ecef[0], constants::WGS84_A, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef[2], 0.0, epsilon = 1e-6);

        let recovered = Geodetic::from_ecef(ecef).unwrap();
        assert_abs_diff_eq!(recovered.longitude, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(recovered.latitude, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(recovered.altitude, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        assert!(Geodetic::new(0.0, PI, 0.0).is_err());
    }

    #[test]
    fn ned_rotation_is_orthonormal() {
        let geod = Geodetic::new(0.3, 0.6, 100.0).unwrap();
        let r = geod.rotation_ecef_to_ned();
        let identity = r * r.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(identity[(i, j)], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn down_points_away_from_zenith_at_equator() {
        let geod = Geodetic::new(0.0, 0.0, 0.0).unwrap();
        let r = geod.rotation_ecef_to_ned();
        let down = r * Vector3::new(1.0, 0.0, 0.0);
        assert_abs_diff_eq!(down[2], -1.0, epsilon = 1e-9);
    }
}
