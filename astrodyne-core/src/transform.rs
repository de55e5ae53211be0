//! Rigid-body transform algebra: the payload attached to every edge of the
//! frame graph.
//!
//! There is no teacher-crate equivalent of a first-class `Transform` type --
//! the teacher bakes rotation-only transforms directly into `frames.rs`'s
//! free functions. This module generalizes that to a transform carrying
//! translation, velocity, orientation, and angular velocity together, using
//! the teacher's `nalgebra` stack (a [`UnitQuaternion`] in place of the
//! teacher's raw `Matrix3` for orientation, which composes and inverts
//! without needing to re-orthonormalize).

use crate::duration::Duration;
use crate::error::{AstrodyneError, Result};
use crate::instant::Instant;
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// Whether a [`Transform`]'s rotation is meant to be applied to vectors
/// (active) or to re-express a fixed vector's coordinates in the
/// transform's target frame (passive). Composition and inversion are
/// convention-independent; only [`Transform::apply_point`],
/// [`Transform::apply_free_vector`], and [`Transform::apply_velocity`]
/// read this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Active,
    Passive,
}

/// A timestamped rigid-body transform: translation, velocity, orientation,
/// and angular velocity, all expressed consistently as "child relative to
/// parent" (`parent_point = orientation * (child_point + translation)`):
/// the translation is added in the child frame, before rotating into the
/// parent frame.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub instant: Instant,
    pub translation: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub angular_velocity: Vector3<f64>,
    pub convention: Convention,
}

impl Transform {
    /// The identity transform at `instant`: zero translation/velocity, no
    /// rotation, no spin.
    pub fn identity(instant: Instant) -> Transform {
        Transform {
            instant,
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        }
    }

    /// Construct from a rotation matrix (as the teacher's SOFA-derived
    /// transforms produce) rather than a quaternion directly.
    pub fn from_rotation_matrix(
        instant: Instant,
        translation: Vector3<f64>,
        rotation: Matrix3<f64>,
    ) -> Transform {
        Transform {
            instant,
            translation,
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
                rotation,
            )),
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        }
    }

    fn require_same_instant(&self, other: &Transform) -> Result<()> {
        if self.instant != other.instant {
            return Err(AstrodyneError::DomainError(
                "cannot compose transforms evaluated at different instants".to_string(),
            ));
        }
        Ok(())
    }

    /// Compose `self` (parent <- mid) with `other` (mid <- child) into a
    /// single parent <- child transform.
    ///
    /// `t_{C<-A} = t_{B<-A} + q_{B<-A}^-1 * t_{C<-B}`,
    /// `v_{C<-A} = v_{B<-A} + q_{B<-A}^-1 * v_{C<-B} + q_{B<-A}^-1 * (omega_{B<-A} x t_{C<-B})`,
    /// `q_{C<-A} = q_{C<-B} * q_{B<-A}`,
    /// `omega_{C<-A} = omega_{C<-B} + q_{C<-B} * omega_{B<-A}`,
    /// following directly from `apply_point`/`apply_velocity`'s
    /// `x_B = q * (x_A + t)` / `v_B = q*(v_A + v_T) - omega x q*(x_A + t)`:
    /// the velocity cross term is carried by `other`'s (the B<-A leg's)
    /// angular velocity acting on `self`'s (the C<-B leg's) translation,
    /// rotated into the composed frame by `other.orientation.inverse()` --
    /// not `self.angular_velocity` crossed with `other.translation`, which
    /// was this function's bug before it was fixed.
    pub fn compose(&self, other: &Transform) -> Result<Transform> {
        self.require_same_instant(other)?;

        let orientation = self.orientation * other.orientation;
        let translation = other.translation + other.orientation.inverse() * self.translation;
        let angular_velocity = self.angular_velocity + self.orientation * other.angular_velocity;
        let velocity = other.velocity
            + other.orientation.inverse() * self.velocity
            + other.orientation.inverse() * other.angular_velocity.cross(&self.translation);

        Ok(Transform {
            instant: self.instant,
            translation,
            velocity,
            orientation,
            angular_velocity,
            convention: self.convention,
        })
    }

    /// The inverse transform (child <- parent), satisfying
    /// `self.compose(&self.inverse()).unwrap()` is the identity at `self.instant`.
    ///
    /// `t' = -(q * t)`, `v' = -(q * v) + omega x (q * t)`,
    /// `q' = q^-1`, `omega' = -(q' * omega)`.
    pub fn inverse(&self) -> Transform {
        let orientation = self.orientation.inverse();
        let rotated_translation = self.orientation * self.translation;
        let translation = -rotated_translation;
        let velocity = -(self.orientation * self.velocity) + self.angular_velocity.cross(&rotated_translation);
        let angular_velocity = -(orientation * self.angular_velocity);

        Transform {
            instant: self.instant,
            translation,
            velocity,
            orientation,
            angular_velocity,
            convention: self.convention,
        }
    }

    /// Apply this transform to a point (a position, sensitive to
    /// translation): `x_B = q * (x_A + t)`, translating in the source frame
    /// before rotating into the target frame. The passive branch inverts
    /// that mapping, re-expressing a point already given in the target
    /// frame's coordinates: `x_A = q^-1 * x_B - t`.
    pub fn apply_point(&self, p: Vector3<f64>) -> Vector3<f64> {
        match self.convention {
            Convention::Active => self.orientation * (p + self.translation),
            Convention::Passive => self.orientation.inverse() * p - self.translation,
        }
    }

    /// Apply this transform to a free vector (direction or displacement,
    /// insensitive to translation).
    pub fn apply_free_vector(&self, v: Vector3<f64>) -> Vector3<f64> {
        match self.convention {
            Convention::Active => self.orientation * v,
            Convention::Passive => self.orientation.inverse() * v,
        }
    }

    /// Apply this transform to the velocity of a point instantaneously
    /// located at `p` (in the source frame), accounting for the relative
    /// motion (translation, rotation) between the two frames:
    /// `v_B = q * (v_A + v_T) - omega x q * (x_A + t)`, mirroring
    /// `apply_point`'s treatment of `p`. The passive branch inverts that
    /// mapping given `p` and `v` in the target frame.
    pub fn apply_velocity(&self, p: Vector3<f64>, v: Vector3<f64>) -> Vector3<f64> {
        match self.convention {
            Convention::Active => {
                self.orientation * (v + self.velocity) - self.angular_velocity.cross(&self.apply_point(p))
            }
            Convention::Passive => {
                self.orientation.inverse() * (v + self.angular_velocity.cross(&p)) - self.velocity
            }
        }
    }

    /// Whether this transform and `other` were evaluated within `tolerance`
    /// of the same instant.
    pub fn is_contemporaneous_with(&self, other: &Transform, tolerance: Duration) -> bool {
        self.instant.is_near(&other.instant, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scales::TimeScale;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    fn an_instant() -> Instant {
        Instant::from_julian_date(2451545.0, TimeScale::TAI).unwrap()
    }

    fn rotation_about_z(angle: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle)
    }

    #[test]
    fn identity_composes_as_no_op() {
        let instant = an_instant();
        let t = Transform {
            instant,
            translation: Vector3::new(1.0, 2.0, 3.0),
            velocity: Vector3::new(0.1, 0.2, 0.3),
            orientation: rotation_about_z(FRAC_PI_2),
            angular_velocity: Vector3::new(0.0, 0.0, 0.01),
            convention: Convention::Active,
        };
        let identity = Transform::identity(instant);

        let composed = t.compose(&identity).unwrap();
        assert_abs_diff_eq!(composed.translation, t.translation, epsilon = 1e-12);
        assert_abs_diff_eq!(composed.velocity, t.velocity, epsilon = 1e-12);
        assert_abs_diff_eq!(
            composed.orientation.to_rotation_matrix().matrix(),
            t.orientation.to_rotation_matrix().matrix(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn inverse_composes_to_identity() {
        let instant = an_instant();
        let t = Transform {
            instant,
            translation: Vector3::new(4.0, -2.0, 7.0),
            velocity: Vector3::new(0.5, -0.1, 0.2),
            orientation: rotation_about_z(1.234),
            angular_velocity: Vector3::new(0.01, -0.02, 0.03),
            convention: Convention::Active,
        };

        let roundtrip = t.compose(&t.inverse()).unwrap();

        assert_abs_diff_eq!(roundtrip.translation, Vector3::zeros(), epsilon = 1e-10);
        assert_abs_diff_eq!(roundtrip.velocity, Vector3::zeros(), epsilon = 1e-10);
        assert_abs_diff_eq!(roundtrip.angular_velocity, Vector3::zeros(), epsilon = 1e-10);
        assert_abs_diff_eq!(
            roundtrip.orientation.to_rotation_matrix().matrix(),
            &Matrix3::identity(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn composition_is_associative() {
        let instant = an_instant();
        let a = Transform {
            instant,
            translation: Vector3::new(1.0, 0.0, 0.0),
            velocity: Vector3::zeros(),
            orientation: rotation_about_z(0.3),
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        };
        let b = Transform {
            instant,
            translation: Vector3::new(0.0, 1.0, 0.0),
            velocity: Vector3::zeros(),
            orientation: rotation_about_z(0.5),
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        };
        let c = Transform {
            instant,
            translation: Vector3::new(0.0, 0.0, 1.0),
            velocity: Vector3::zeros(),
            orientation: rotation_about_z(0.7),
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        };

        let left = a.compose(&b).unwrap().compose(&c).unwrap();
        let right = a.compose(&b.compose(&c).unwrap()).unwrap();

        assert_abs_diff_eq!(left.translation, right.translation, epsilon = 1e-10);
        assert_abs_diff_eq!(
            left.orientation.to_rotation_matrix().matrix(),
            right.orientation.to_rotation_matrix().matrix(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn compose_velocity_matches_sequential_application() {
        let instant = an_instant();
        let a = Transform {
            instant,
            translation: Vector3::new(1.0, 0.0, 0.0),
            velocity: Vector3::new(0.1, 0.0, 0.0),
            orientation: rotation_about_z(0.4),
            angular_velocity: Vector3::new(0.0, 0.0, 0.2),
            convention: Convention::Active,
        };
        let b = Transform {
            instant,
            translation: Vector3::new(0.0, 2.0, 0.0),
            velocity: Vector3::new(0.0, 0.0, 0.05),
            orientation: rotation_about_z(-0.3),
            angular_velocity: Vector3::new(0.0, 0.0, -0.1),
            convention: Convention::Active,
        };
        let p = Vector3::new(3.0, 4.0, 5.0);
        let v = Vector3::new(0.01, -0.02, 0.03);

        let composed = a.compose(&b).unwrap();
        let via_compose = composed.apply_velocity(p, v);
        let via_sequence = a.apply_velocity(b.apply_point(p), b.apply_velocity(p, v));

        assert_abs_diff_eq!(via_compose, via_sequence, epsilon = 1e-10);
    }

    #[test]
    fn apply_point_then_inverse_round_trips() {
        let instant = an_instant();
        let t = Transform {
            instant,
            translation: Vector3::new(10.0, -5.0, 2.0),
            velocity: Vector3::zeros(),
            orientation: rotation_about_z(0.9),
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        };
        let p = Vector3::new(3.0, 4.0, 5.0);
        let transformed = t.apply_point(p);
        let back = t.inverse().apply_point(transformed);
        assert_abs_diff_eq!(back, p, epsilon = 1e-10);
    }

    #[test]
    fn mismatched_instants_are_rejected() {
        let t1 = Transform::identity(Instant::from_julian_date(2451545.0, TimeScale::TAI).unwrap());
        let t2 = Transform::identity(Instant::from_julian_date(2451546.0, TimeScale::TAI).unwrap());
        assert!(t1.compose(&t2).is_err());
    }

    #[test]
    fn velocity_application_accounts_for_rotation_of_the_translated_point() {
        // No rotation, translated by (1, 0, 0), spinning at 1 rad/s about Z.
        // A point instantaneously at rest at (2, 0, 0) in the source frame
        // sits at (3, 0, 0) once transformed, so its apparent velocity in
        // the target frame is entirely the rigid-body term `-omega x x_B`.
        let t = Transform {
            instant: an_instant(),
            translation: Vector3::new(1.0, 0.0, 0.0),
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::new(0.0, 0.0, 1.0),
            convention: Convention::Active,
        };
        let p = Vector3::new(2.0, 0.0, 0.0);
        let v = t.apply_velocity(p, Vector3::zeros());
        assert_abs_diff_eq!(v, Vector3::new(0.0, -3.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn free_vector_application_ignores_translation() {
        let instant = an_instant();
        let t = Transform {
            instant,
            translation: Vector3::new(100.0, 200.0, 300.0),
            velocity: Vector3::zeros(),
            orientation: rotation_about_z(FRAC_PI_2),
            angular_velocity: Vector3::zeros(),
            convention: Convention::Active,
        };
        let v = t.apply_free_vector(Vector3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-10);
    }
}
