//! Time-scale conversion and reference-frame transforms for astrodynamics:
//! leap-second-aware instants across seven time scales (TAI, UTC, UT1, GPS,
//! TT, TCG, TDB), Earth Orientation Parameter lookup, and a runtime
//! reference-frame graph (GCRF, CIRF, TIRF, ITRF, TEME, MOD/TOD-of-epoch,
//! NED) with cached, composable rigid-body transforms between any two
//! registered frames.

pub mod constants;
pub mod datetime;
pub mod duration;
pub mod eop;
pub mod error;
pub mod frame;
pub mod geodetic;
pub mod iau_frames;
pub mod instant;
pub mod providers;
pub mod scales;
pub mod transform;
pub mod well_known;

pub use datetime::DateTime;
pub use duration::Duration;
pub use eop::{EopExtrapolation, EopProvider, EopRecord, TabularEop};
pub use error::{AstrodyneError, Result};
pub use frame::{Frame, FrameHandle, FrameManager, Provider};
pub use geodetic::Geodetic;
pub use instant::Instant;
pub use scales::TimeScale;
pub use transform::{Convention, Transform};
