//! Constructors for the standard frames, registered lazily against the
//! global [`FrameManager`] on first access rather than at process startup,
//! mirroring how the teacher's `eop.rs` only builds its global EOP table
//! once a caller asks for it.
//!
//! `GCRF`/`CIRF`/`TIRF`/`ITRF`/`TEME` are singletons, one frame per process,
//! since their providers have no free parameters. `MOD`/`TOD` are
//! parameterized by an epoch and `NED` by a geodetic location, so each
//! distinct argument registers its own frame, named so a repeated call with
//! the same argument finds the existing frame instead of conflicting with
//! it.

use crate::eop::EopProvider;
use crate::error::Result;
use crate::frame::Frame;
use crate::geodetic::Geodetic;
use crate::instant::Instant;
use crate::providers::{
    quaternion_from_matrix, CirfProvider, FixedProvider, GcrfProvider, IdentityProvider,
    ItrfProvider, NedProvider, TemeProvider, TirfProvider,
};
use crate::scales::TimeScale;
use crate::transform::{Convention, Transform};
use nalgebra::Vector3;
use std::sync::Arc;

/// GCRF: the inertial root of the Earth-centered frame graph.
pub fn gcrf() -> Result<Frame> {
    if let Some(f) = Frame::with_name("GCRF") {
        return Ok(f);
    }
    Frame::register("GCRF", true, None, Arc::new(GcrfProvider))
}

/// J2000/EME2000: treated as identical to GCRF within this crate's scope
/// (the frame bias between them is sub-arcsecond).
pub fn j2000() -> Result<Frame> {
    if let Some(f) = Frame::with_name("J2000") {
        return Ok(f);
    }
    Frame::register("J2000", true, Some(gcrf()?), Arc::new(IdentityProvider))
}

/// CIRF: bias-precession-nutation rotation from GCRF.
pub fn cirf(eop: Arc<dyn EopProvider>) -> Result<Frame> {
    if let Some(f) = Frame::with_name("CIRF") {
        return Ok(f);
    }
    Frame::register("CIRF", false, Some(gcrf()?), Arc::new(CirfProvider { eop }))
}

/// TIRF: Earth Rotation Angle rotation from CIRF.
pub fn tirf(eop: Arc<dyn EopProvider>) -> Result<Frame> {
    if let Some(f) = Frame::with_name("TIRF") {
        return Ok(f);
    }
    Frame::register("TIRF", false, Some(cirf(eop.clone())?), Arc::new(TirfProvider { eop }))
}

/// ITRF: polar-motion rotation from TIRF.
pub fn itrf(eop: Arc<dyn EopProvider>) -> Result<Frame> {
    if let Some(f) = Frame::with_name("ITRF") {
        return Ok(f);
    }
    Frame::register("ITRF", false, Some(tirf(eop.clone())?), Arc::new(ItrfProvider { eop }))
}

/// TEME-of-date, parented to ITRF.
pub fn teme(eop: Arc<dyn EopProvider>) -> Result<Frame> {
    if let Some(f) = Frame::with_name("TEME") {
        return Ok(f);
    }
    Frame::register("TEME", true, Some(itrf(eop.clone())?), Arc::new(TemeProvider { eop }))
}

fn epoch_name(epoch: Instant) -> Result<String> {
    Ok(epoch.tai_nanoseconds()?.to_string())
}

/// Mean-of-Date at `epoch`: GCRF rotated by the IAU 2006 precession matrix,
/// computed once and frozen (a distinct registered frame per epoch).
pub fn mod_of_epoch(epoch: Instant) -> Result<Frame> {
    let name = format!("MOD-{}", epoch_name(epoch)?);
    if let Some(f) = Frame::with_name(&name) {
        return Ok(f);
    }
    let rbp = crate::iau_frames::precession_matrix(epoch)?;
    let transform = Transform {
        instant: epoch,
        translation: Vector3::zeros(),
        velocity: Vector3::zeros(),
        orientation: quaternion_from_matrix(rbp),
        angular_velocity: Vector3::zeros(),
        convention: Convention::Active,
    };
    Frame::register(&name, true, Some(gcrf()?), Arc::new(FixedProvider(transform)))
}

/// True-of-Date at `epoch`: `MOD(epoch)` rotated by the IAU 2000A nutation
/// matrix, computed once and frozen.
pub fn tod_of_epoch(epoch: Instant) -> Result<Frame> {
    let name = format!("TOD-{}", epoch_name(epoch)?);
    if let Some(f) = Frame::with_name(&name) {
        return Ok(f);
    }
    let rn = crate::iau_frames::nutation_matrix(epoch)?;
    let transform = Transform {
        instant: epoch,
        translation: Vector3::zeros(),
        velocity: Vector3::zeros(),
        orientation: quaternion_from_matrix(rn),
        angular_velocity: Vector3::zeros(),
        convention: Convention::Active,
    };
    Frame::register(&name, true, Some(mod_of_epoch(epoch)?), Arc::new(FixedProvider(transform)))
}

/// Topocentric North-East-Down frame at `location`, parented to ITRF.
pub fn ned(location: Geodetic, eop: Arc<dyn EopProvider>) -> Result<Frame> {
    let name = format!(
        "NED-{:.9}-{:.9}-{:.3}",
        location.longitude, location.latitude, location.altitude
    );
    if let Some(f) = Frame::with_name(&name) {
        return Ok(f);
    }
    Frame::register(&name, false, Some(itrf(eop)?), Arc::new(NedProvider { location }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTime;
    use crate::eop::TabularEop;
    use approx::assert_abs_diff_eq;

    // These tests share the process-wide `FrameManager` singleton and run
    // concurrently with the rest of the suite; well-known frames are
    // registered idempotently (looked up by name before registering), so
    // tests can safely run in any order without a `reset()` between them.

    fn an_instant() -> Instant {
        Instant::from_datetime(DateTime::new(2022, 4, 1, 1, 2, 3, 0.0).unwrap(), TimeScale::UTC).unwrap()
    }

    fn zero_eop() -> Arc<dyn EopProvider> {
        Arc::new(TabularEop::zero())
    }

    #[test]
    fn repeated_access_returns_the_same_frame() {
        let first = gcrf().unwrap();
        let second = gcrf().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn itrf_registers_its_whole_parent_chain() {
        let itrf_frame = itrf(zero_eop()).unwrap();
        assert_eq!(itrf_frame.depth().unwrap(), 3);
        assert_eq!(itrf_frame.ancestor(3).unwrap(), gcrf().unwrap());
    }

    #[test]
    fn mod_and_tod_frames_are_keyed_by_epoch() {
        let epoch_a = an_instant();
        let epoch_b = epoch_a + crate::duration::Duration::from_days(1.0);

        let mod_a1 = mod_of_epoch(epoch_a).unwrap();
        let mod_a2 = mod_of_epoch(epoch_a).unwrap();
        let mod_b = mod_of_epoch(epoch_b).unwrap();

        assert_eq!(mod_a1, mod_a2);
        assert_ne!(mod_a1, mod_b);
    }

    #[test]
    fn gcrf_to_itrf_round_trips() {
        let gcrf_frame = gcrf().unwrap();
        let itrf_frame = itrf(zero_eop()).unwrap();
        let instant = an_instant();

        let fwd = gcrf_frame.transform_to(itrf_frame, instant).unwrap();
        let back = itrf_frame.transform_to(gcrf_frame, instant).unwrap();
        let roundtrip = back.compose(&fwd).unwrap();
        assert_abs_diff_eq!(roundtrip.translation, Vector3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn ned_is_a_great_grandchild_of_gcrf() {
        let site = Geodetic::new(0.1, 0.5, 50.0).unwrap();
        let ned_frame = ned(site, zero_eop()).unwrap();
        assert_eq!(ned_frame.depth().unwrap(), 4);
    }
}
