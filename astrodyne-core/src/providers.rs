//! Concrete [`Provider`] implementations: generic building blocks (Identity,
//! Static, Fixed, Dynamic) plus the IAU-theory-driven providers for the
//! standard Earth frames, each a thin wrapper around the matrix functions in
//! [`crate::iau_frames`].

use crate::constants;
use crate::duration::Duration;
use crate::eop::EopProvider;
use crate::error::Result;
use crate::frame::Provider;
use crate::geodetic::Geodetic;
use crate::iau_frames;
use crate::instant::Instant;
use crate::scales::TimeScale;
use crate::transform::{Convention, Transform};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use std::sync::Arc;

pub(crate) fn quaternion_from_matrix(m: Matrix3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m))
}

/// Angular velocity (rad/s) implied by a rotation changing from `q0` to `q1`
/// over `dt` seconds, via the small-angle relation `omega = 2 * vec(dq) / dt`
/// with `dq = q1 * q0^-1`. Exact for a constant angular velocity; a close
/// approximation otherwise, used here with `dt` on the order of a second
/// against rotations (Earth orientation, precession-nutation) that vary
/// over hours to years.
fn angular_velocity_from_quaternions(
    q0: UnitQuaternion<f64>,
    q1: UnitQuaternion<f64>,
    dt: f64,
) -> Vector3<f64> {
    let dq = q1 * q0.inverse();
    dq.vector().into_owned() * (2.0 / dt)
}

/// Finite-difference step used to estimate the rotation rate of providers
/// whose theory (IAU 2006/2000A bias-precession-nutation) has no closed-form
/// angular velocity available through `rsofa`.
const FINITE_DIFFERENCE_DT: f64 = 1.0;

/// Always the identity transform. Used for frames declared equivalent to
/// their parent (e.g. J2000/EME2000 against GCRF, within this crate's
/// tolerance).
pub struct IdentityProvider;

impl Provider for IdentityProvider {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        Ok(Transform::identity(instant))
    }
}

/// Returns a caller-supplied transform with the queried instant substituted
/// in, leaving translation/velocity/orientation/angular velocity unchanged.
/// Used for simple time-invariant offsets (e.g. a frame bias).
pub struct StaticProvider(pub Transform);

impl Provider for StaticProvider {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        let mut transform = self.0;
        transform.instant = instant;
        Ok(transform)
    }
}

/// Returns the same transform, including its own instant, regardless of the
/// query instant. Backs epoch-parameterized frames (`MOD(epoch)`,
/// `TOD(epoch)`) whose orientation is computed once at construction and
/// frozen thereafter.
pub struct FixedProvider(pub Transform);

impl Provider for FixedProvider {
    fn transform_at(&self, _instant: Instant) -> Result<Transform> {
        Ok(self.0)
    }
}

/// Evaluates a caller-supplied closure at the queried instant. An escape
/// hatch for callers who want a custom provider without implementing the
/// trait directly.
pub struct DynamicProvider<F: Fn(Instant) -> Result<Transform> + Send + Sync>(pub F);

impl<F: Fn(Instant) -> Result<Transform> + Send + Sync> Provider for DynamicProvider<F> {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        (self.0)(instant)
    }
}

/// GCRF: the inertial root of the Earth-centered frame graph. Always the
/// identity; registered with no parent.
pub struct GcrfProvider;

impl Provider for GcrfProvider {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        Ok(Transform::identity(instant))
    }
}

/// CIRF: bias-precession-nutation rotation from GCRF, per IAU 2006/2000A.
pub struct CirfProvider {
    pub eop: Arc<dyn EopProvider>,
}

impl Provider for CirfProvider {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        let rc2i = iau_frames::bias_precession_nutation(instant, self.eop.as_ref())?;
        let orientation = quaternion_from_matrix(rc2i);

        let later = instant + Duration::from_seconds(FINITE_DIFFERENCE_DT);
        let rc2i_later = iau_frames::bias_precession_nutation(later, self.eop.as_ref())?;
        let angular_velocity = angular_velocity_from_quaternions(
            orientation,
            quaternion_from_matrix(rc2i_later),
            FINITE_DIFFERENCE_DT,
        );

        Ok(Transform {
            instant,
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation,
            angular_velocity,
            convention: Convention::Active,
        })
    }
}

/// TIRF: Earth Rotation Angle rotation from CIRF, using UT1. Angular
/// velocity is the nominal Earth rotation rate corrected by the observed
/// length-of-day excess.
pub struct TirfProvider {
    pub eop: Arc<dyn EopProvider>,
}

impl Provider for TirfProvider {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        let r = iau_frames::earth_rotation(instant)?;
        let orientation = quaternion_from_matrix(r);
        let lod = self.eop.lod(instant.modified_julian_date(TimeScale::UTC)?)?;
        let omega = constants::OMEGA_EARTH * (1.0 - lod / 86_400.0);

        Ok(Transform {
            instant,
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation,
            angular_velocity: Vector3::new(0.0, 0.0, -omega),
            convention: Convention::Active,
        })
    }
}

/// ITRF: polar-motion rotation from TIRF. Polar motion drifts on the order
/// of a meter per year at the pole, so its own angular velocity is
/// negligible against Earth's rotation rate and is treated as zero.
pub struct ItrfProvider {
    pub eop: Arc<dyn EopProvider>,
}

impl Provider for ItrfProvider {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        let w = iau_frames::polar_motion(instant, self.eop.as_ref())?;
        Ok(Transform {
            instant,
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: quaternion_from_matrix(w),
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        })
    }
}

/// TEME-of-date: the classical, equinox-based frame used by SGP4
/// propagation output, parented to ITRF. Unlike the CIO-based CIRF/TIRF
/// chain, TEME is built directly from the Greenwich Apparent Sidereal Time
/// about the pole, following common practice (e.g. Vallado's
/// `teme2ecef`) of neglecting polar motion in this construction -- it is
/// sub-arcsecond and TEME's own accuracy budget (a few arcminutes) absorbs
/// it without comment.
pub struct TemeProvider {
    pub eop: Arc<dyn EopProvider>,
}

impl Provider for TemeProvider {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        let gast = iau_frames::gast(instant)?;
        let orientation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), gast);

        Ok(Transform {
            instant,
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation,
            angular_velocity: Vector3::new(0.0, 0.0, constants::OMEGA_EARTH),
            convention: Convention::Active,
        })
    }
}

/// North-East-Down topocentric orientation at a fixed geodetic location,
/// parented to ITRF. The site neither translates nor rotates relative to
/// ITRF, so velocity and angular velocity are both zero.
pub struct NedProvider {
    pub location: Geodetic,
}

impl Provider for NedProvider {
    fn transform_at(&self, instant: Instant) -> Result<Transform> {
        let orientation = quaternion_from_matrix(self.location.rotation_ecef_to_ned());
        let site_ecef = self.location.to_ecef();

        Ok(Transform {
            instant,
            translation: -site_ecef,
            velocity: Vector3::zeros(),
            orientation,
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTime;
    use crate::eop::TabularEop;
    use approx::assert_abs_diff_eq;

    fn an_instant() -> Instant {
        Instant::from_datetime(DateTime::new(2022, 4, 1, 1, 2, 3, 0.0).unwrap(), TimeScale::UTC).unwrap()
    }

    fn zero_eop() -> Arc<dyn EopProvider> {
        Arc::new(TabularEop::zero())
    }

    #[test]
    fn identity_provider_is_the_identity() {
        let t = IdentityProvider.transform_at(an_instant()).unwrap();
        assert_abs_diff_eq!(t.translation, Vector3::zeros(), epsilon = 1e-15);
    }

    #[test]
    fn cirf_orientation_is_orthonormal_and_spins_slowly() {
        let provider = CirfProvider { eop: zero_eop() };
        let t = provider.transform_at(an_instant()).unwrap();
        let m = t.orientation.to_rotation_matrix().into_inner();
        let identity = m * m.transpose();
        assert_abs_diff_eq!(identity, Matrix3::identity(), epsilon = 1e-9);
        // Precession-nutation turns at roughly 50 arcsec/year, many orders
        // of magnitude below Earth's own rotation rate.
        assert!(t.angular_velocity.norm() < constants::OMEGA_EARTH * 1e-3);
    }

    #[test]
    fn tirf_spins_at_roughly_the_sidereal_rate() {
        let provider = TirfProvider { eop: zero_eop() };
        let t = provider.transform_at(an_instant()).unwrap();
        assert_abs_diff_eq!(t.angular_velocity.norm(), constants::OMEGA_EARTH, epsilon = 1e-6);
    }

    #[test]
    fn ned_site_maps_its_own_origin_to_zero() {
        let location = Geodetic::new(0.3, 0.6, 100.0).unwrap();
        let provider = NedProvider { location };
        let t = provider.transform_at(an_instant()).unwrap();
        let site_in_ned = t.apply_point(location.to_ecef());
        assert_abs_diff_eq!(site_in_ned, Vector3::zeros(), epsilon = 1e-6);
    }
}
