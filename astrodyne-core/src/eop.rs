//! Earth Orientation Parameter providers.
//!
//! The teacher crate's `EarthOrientationData` bundled file I/O, parsing, and
//! lookup into a single `HashMap`-backed struct with package-default data
//! files loaded via `include_bytes!`. This module splits that apart: an
//! [`EopProvider`] trait is the seam every caller (chiefly
//! [`crate::scales::scale_offset`] and the IAU frame providers) depends on,
//! [`TabularEop`] is the one concrete implementation, and parsing is done
//! from an already-supplied `&str` -- no file or network access happens
//! inside this crate. Loading a bulletin off disk or the network is the
//! caller's job.
//!
//! The lookup algorithm (linear interpolation between day-bracketing
//! entries, with a `Zero`/`Hold`/`Error` policy beyond the table's
//! coverage) and the fixed-column parsing of the IERS C04 and Finals
//! 2000A (Bulletin A/B) text formats are carried over verbatim from the
//! teacher's `eop.rs` and `data/eop.rs`.

use crate::constants::AS2RAD;
use crate::error::{AstrodyneError, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Behavior of an [`EopProvider`] when asked for a Modified Julian Date
/// beyond the coverage of its underlying table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EopExtrapolation {
    /// Return zero for every quantity.
    Zero,
    /// Hold the last tabulated value constant.
    Hold,
    /// Report an error.
    Error,
}

impl fmt::Display for EopExtrapolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EopExtrapolation::Zero => write!(f, "Zero"),
            EopExtrapolation::Hold => write!(f, "Hold"),
            EopExtrapolation::Error => write!(f, "Error"),
        }
    }
}

/// One Earth Orientation Parameter record, keyed by an integer UTC
/// Modified Julian Date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EopRecord {
    /// x-component of polar motion. Units: (rad)
    pub pm_x: f64,
    /// y-component of polar motion. Units: (rad)
    pub pm_y: f64,
    /// UT1-UTC. Units: (s)
    pub ut1_utc: f64,
    /// Excess length of day over 86400 TAI seconds, when present.
    pub lod: Option<f64>,
    /// Celestial Intermediate Pole X offset from the IAU 2006/2000A model,
    /// when present. Units: (rad)
    pub dx: Option<f64>,
    /// Celestial Intermediate Pole Y offset, when present. Units: (rad)
    pub dy: Option<f64>,
}

/// Common interface every Earth Orientation Parameter source implements.
///
/// Callers that only need one quantity (the scale converter only ever
/// needs `ut1_utc`; the IAU frame providers need all four) go through this
/// trait rather than depending on [`TabularEop`] directly, so a caller can
/// substitute a constant or synthetic source in tests.
pub trait EopProvider: Send + Sync {
    fn polar_motion(&self, mjd_utc: f64) -> Result<(f64, f64)>;
    fn ut1_utc(&self, mjd_utc: f64) -> Result<f64>;
    fn lod(&self, mjd_utc: f64) -> Result<f64>;
    fn cip_offset(&self, mjd_utc: f64) -> Result<(f64, f64)>;
}

/// An [`EopProvider`] backed by a table of [`EopRecord`]s keyed by integer
/// UTC Modified Julian Date.
///
/// Entries form a key-ordered mapping (a [`BTreeMap`], unlike the teacher's
/// `HashMap`) so that the bracketing pair of a query date can be found by
/// simple floor/ceil lookups and so that `records()` iterates in
/// chronological order.
#[derive(Clone)]
pub struct TabularEop {
    data: BTreeMap<i64, EopRecord>,
    extrapolate: EopExtrapolation,
    interpolate: bool,
    mjd_min: i64,
    mjd_max: i64,
}

impl TabularEop {
    /// Construct directly from already-parsed records.
    pub fn new(
        data: BTreeMap<i64, EopRecord>,
        extrapolate: EopExtrapolation,
        interpolate: bool,
    ) -> Result<Self> {
        let mjd_min = *data
            .keys()
            .next()
            .ok_or_else(|| AstrodyneError::DomainError("EOP table is empty".to_string()))?;
        let mjd_max = *data.keys().next_back().unwrap();
        Ok(TabularEop {
            data,
            extrapolate,
            interpolate,
            mjd_min,
            mjd_max,
        })
    }

    /// A table with no entries at all, resolving every query per
    /// `extrapolate`. Equivalent to the teacher's `EarthOrientationData::from_zero`.
    pub fn zero() -> Self {
        let mut data = BTreeMap::new();
        data.insert(
            0,
            EopRecord {
                pm_x: 0.0,
                pm_y: 0.0,
                ut1_utc: 0.0,
                lod: Some(0.0),
                dx: Some(0.0),
                dy: Some(0.0),
            },
        );
        TabularEop {
            data,
            extrapolate: EopExtrapolation::Zero,
            interpolate: false,
            mjd_min: 0,
            mjd_max: 0,
        }
    }

    /// A single-entry table returning the same static values regardless of
    /// the query date. Used for reproducing reference test vectors.
    pub fn static_values(pm_x: f64, pm_y: f64, ut1_utc: f64, lod: f64, dx: f64, dy: f64) -> Self {
        let mut data = BTreeMap::new();
        data.insert(
            0,
            EopRecord {
                pm_x,
                pm_y,
                ut1_utc,
                lod: Some(lod),
                dx: Some(dx),
                dy: Some(dy),
            },
        );
        TabularEop {
            data,
            extrapolate: EopExtrapolation::Hold,
            interpolate: false,
            mjd_min: 0,
            mjd_max: 0,
        }
    }

    /// Parse an IERS EOP 14 C04 long-term data product.
    ///
    /// Column layout (fixed-width, 1-indexed in IERS documentation):
    /// MJD at `[12..19)`, `pm_x`/`pm_y` (arcsec) at `[19..30)`/`[30..41)`,
    /// `ut1_utc` (s) at `[41..53)`, `lod` (s) at `[53..65)`, `dX`/`dY`
    /// (arcsec) at `[65..76)`/`[76..87)`. The first 14 lines are a header
    /// and are skipped.
    pub fn from_c04_str(contents: &str, extrapolate: EopExtrapolation, interpolate: bool) -> Result<Self> {
        let mut data = BTreeMap::new();

        for (lineno, line) in contents.lines().enumerate() {
            if lineno < 14 || line.trim().is_empty() {
                continue;
            }

            let record = parse_c04_line(line).map_err(|e| {
                AstrodyneError::ParseError(format!("C04 line {}: {}", lineno + 1, e))
            })?;
            data.insert(record.0, record.1);
        }

        TabularEop::new(data, extrapolate, interpolate)
    }

    /// Parse an IERS `finals2000A` bulletin, taking the Bulletin A columns
    /// (the predicted/rapid-service values).
    ///
    /// Column layout: MJD at `[6..12)`, `pm_x`/`pm_y` (arcsec) at
    /// `[17..27)`/`[37..46)`, `ut1_utc` (s) at `[58..68)`, `lod` (s,
    /// optional) at `[78..86)`, `dX`/`dY` (milliarcsec, optional) at
    /// `[97..106)`/`[116..125)`. Lines shorter than 68 characters (a
    /// trailing blank line is common) are skipped rather than rejected.
    pub fn from_finals2000a_bulletin_a_str(
        contents: &str,
        extrapolate: EopExtrapolation,
        interpolate: bool,
    ) -> Result<Self> {
        let mut data = BTreeMap::new();

        for (lineno, line) in contents.lines().enumerate() {
            if line.len() < 68 {
                continue;
            }
            let record = parse_finals_bulletin_a_line(line).map_err(|e| {
                AstrodyneError::ParseError(format!("finals2000A line {}: {}", lineno + 1, e))
            })?;
            data.insert(record.0, record.1);
        }

        TabularEop::new(data, extrapolate, interpolate)
    }

    /// Parse the Bulletin B columns of a `finals2000A` bulletin (the final,
    /// non-predicted values).
    ///
    /// Column layout: MJD at `[6..12)`, `pm_x`/`pm_y` (arcsec) at
    /// `[134..144)`/`[144..154)`, `ut1_utc` (s) at `[154..165)`, `dX`/`dY`
    /// (milliarcsec) at `[165..175)`/`[175..185)`. `lod` is not reported in
    /// Bulletin B and is always `Some(0.0)`.
    pub fn from_finals2000a_bulletin_b_str(
        contents: &str,
        extrapolate: EopExtrapolation,
        interpolate: bool,
    ) -> Result<Self> {
        let mut data = BTreeMap::new();

        for (lineno, line) in contents.lines().enumerate() {
            if line.len() < 185 {
                continue;
            }
            let record = parse_finals_bulletin_b_line(line).map_err(|e| {
                AstrodyneError::ParseError(format!("finals2000A (Bulletin B) line {}: {}", lineno + 1, e))
            })?;
            data.insert(record.0, record.1);
        }

        TabularEop::new(data, extrapolate, interpolate)
    }

    pub fn mjd_min(&self) -> i64 {
        self.mjd_min
    }

    pub fn mjd_max(&self) -> i64 {
        self.mjd_max
    }

    pub fn records(&self) -> impl Iterator<Item = (&i64, &EopRecord)> {
        self.data.iter()
    }

    /// Resolve a scalar field at `mjd_utc`, interpolating linearly between
    /// the bracketing integer-MJD entries (or holding the floor entry, per
    /// `interpolate`), and falling back to `extrapolate`'s policy once
    /// `mjd_utc` passes `mjd_max`.
    fn resolve<F>(&self, mjd_utc: f64, field: F) -> Result<f64>
    where
        F: Fn(&EopRecord) -> f64,
    {
        let floor = mjd_utc.floor() as i64;

        if mjd_utc < self.mjd_min as f64 {
            return Err(AstrodyneError::OutOfRange(format!(
                "requested EOP at MJD {} before table start {}",
                mjd_utc, self.mjd_min
            )));
        }

        if mjd_utc < self.mjd_max as f64 {
            let y1 = field(self.data.get(&floor).ok_or_else(|| {
                AstrodyneError::OutOfRange(format!("no EOP entry at MJD {}", floor))
            })?);

            if !self.interpolate {
                return Ok(y1);
            }

            let y2 = field(self.data.get(&(floor + 1)).ok_or_else(|| {
                AstrodyneError::OutOfRange(format!("no EOP entry at MJD {}", floor + 1))
            })?);
            let frac = mjd_utc - floor as f64;
            return Ok(y1 + (y2 - y1) * frac);
        }

        match self.extrapolate {
            EopExtrapolation::Zero => Ok(0.0),
            EopExtrapolation::Hold => Ok(field(&self.data[&self.mjd_max])),
            EopExtrapolation::Error => Err(AstrodyneError::OutOfRange(format!(
                "requested EOP at MJD {} beyond table end {}",
                mjd_utc, self.mjd_max
            ))),
        }
    }
}

impl EopProvider for TabularEop {
    fn polar_motion(&self, mjd_utc: f64) -> Result<(f64, f64)> {
        Ok((
            self.resolve(mjd_utc, |r| r.pm_x)?,
            self.resolve(mjd_utc, |r| r.pm_y)?,
        ))
    }

    fn ut1_utc(&self, mjd_utc: f64) -> Result<f64> {
        self.resolve(mjd_utc, |r| r.ut1_utc)
    }

    fn lod(&self, mjd_utc: f64) -> Result<f64> {
        self.resolve(mjd_utc, |r| r.lod.unwrap_or(0.0))
    }

    fn cip_offset(&self, mjd_utc: f64) -> Result<(f64, f64)> {
        Ok((
            self.resolve(mjd_utc, |r| r.dx.unwrap_or(0.0))?,
            self.resolve(mjd_utc, |r| r.dy.unwrap_or(0.0))?,
        ))
    }
}

fn column(line: &str, range: std::ops::Range<usize>, what: &str) -> std::result::Result<f64, String> {
    if line.len() < range.end {
        return Err(format!("line too short to contain {}", what));
    }
    f64::from_str(line[range].trim()).map_err(|e| format!("failed to parse {}: {}", what, e))
}

fn parse_c04_line(line: &str) -> std::result::Result<(i64, EopRecord), String> {
    if line.len() < 87 {
        return Err("line too short for C04 format".to_string());
    }
    let mjd = i64::from_str(line[12..19].trim()).map_err(|e| format!("failed to parse mjd: {}", e))?;
    let pm_x = column(line, 19..30, "pm_x")? * AS2RAD;
    let pm_y = column(line, 30..41, "pm_y")? * AS2RAD;
    let ut1_utc = column(line, 41..53, "ut1_utc")?;
    let lod = column(line, 53..65, "lod")?;
    let dx = column(line, 65..76, "dX")? * AS2RAD;
    let dy = column(line, 76..87, "dY")? * AS2RAD;

    Ok((
        mjd,
        EopRecord {
            pm_x,
            pm_y,
            ut1_utc,
            lod: Some(lod),
            dx: Some(dx),
            dy: Some(dy),
        },
    ))
}

const MAS2RAD: f64 = AS2RAD / 1000.0;

fn parse_finals_bulletin_a_line(line: &str) -> std::result::Result<(i64, EopRecord), String> {
    let mjd = i64::from_str(line[6..12].trim()).map_err(|e| format!("failed to parse mjd: {}", e))?;
    let pm_x = column(line, 17..27, "pm_x")? * AS2RAD;
    let pm_y = column(line, 37..46, "pm_y")? * AS2RAD;
    let ut1_utc = column(line, 58..68, "ut1_utc")?;
    let lod = column(line, 78..86, "lod").ok();
    let dx = column(line, 97..106, "dX").ok().map(|v| v * MAS2RAD);
    let dy = column(line, 116..125, "dY").ok().map(|v| v * MAS2RAD);

    Ok((
        mjd,
        EopRecord {
            pm_x,
            pm_y,
            ut1_utc,
            lod,
            dx,
            dy,
        },
    ))
}

fn parse_finals_bulletin_b_line(line: &str) -> std::result::Result<(i64, EopRecord), String> {
    let mjd = i64::from_str(line[6..12].trim()).map_err(|e| format!("failed to parse mjd: {}", e))?;
    let pm_x = column(line, 134..144, "pm_x")? * AS2RAD;
    let pm_y = column(line, 144..154, "pm_y")? * AS2RAD;
    let ut1_utc = column(line, 154..165, "ut1_utc")?;
    let dx = column(line, 165..175, "dX")? * MAS2RAD;
    let dy = column(line, 175..185, "dY")? * MAS2RAD;

    Ok((
        mjd,
        EopRecord {
            pm_x,
            pm_y,
            ut1_utc,
            lod: Some(0.0),
            dx: Some(dx),
            dy: Some(dy),
        },
    ))
}

/// Process-wide default provider, consulted by [`crate::scales::scale_offset`]
/// and the IAU frame providers whenever no provider is threaded through
/// explicitly. Starts out as [`TabularEop::zero`] (UT1-UTC and polar motion
/// both read as zero); call [`set_global_provider`] during application
/// startup once real EOP data has been parsed.
static GLOBAL_EOP: Lazy<RwLock<Arc<dyn EopProvider>>> =
    Lazy::new(|| RwLock::new(Arc::new(TabularEop::zero())));

/// Replace the process-wide default EOP provider.
pub fn set_global_provider(provider: Arc<dyn EopProvider>) {
    *GLOBAL_EOP.write().unwrap() = provider;
}

/// Current process-wide default EOP provider.
pub fn global_provider() -> Arc<dyn EopProvider> {
    GLOBAL_EOP.read().unwrap().clone()
}

/// UT1-UTC at `mjd_utc` per the process-wide default provider.
pub fn get_global_ut1_utc(mjd_utc: f64) -> Result<f64> {
    global_provider().ut1_utc(mjd_utc)
}

/// Polar motion at `mjd_utc` per the process-wide default provider.
pub fn get_global_pm(mjd_utc: f64) -> Result<(f64, f64)> {
    global_provider().polar_motion(mjd_utc)
}

/// CIP dX, dY offset at `mjd_utc` per the process-wide default provider.
pub fn get_global_dxdy(mjd_utc: f64) -> Result<(f64, f64)> {
    global_provider().cip_offset(mjd_utc)
}

/// Length of day excess at `mjd_utc` per the process-wide default provider.
pub fn get_global_lod(mjd_utc: f64) -> Result<f64> {
    global_provider().lod(mjd_utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_provider_reads_zero_everywhere() {
        let eop = TabularEop::zero();
        assert_eq!(eop.ut1_utc(50000.0).unwrap(), 0.0);
        assert_eq!(eop.polar_motion(50000.0).unwrap(), (0.0, 0.0));
    }

    #[test]
    fn static_provider_holds_constant() {
        let eop = TabularEop::static_values(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(eop.ut1_utc(12345.0).unwrap(), 3.0);
        assert_eq!(eop.polar_motion(99999.0).unwrap(), (1.0, 2.0));
    }

    #[test]
    fn c04_line_parses_expected_columns() {
        let synthetic = format!(
            "{:>12}{:>7}{:>11}{:>11}{:>12}{:>12}{:>11}{:>11}",
            "1990  1  1", "47892", "0.123456", "0.234567", "0.345678", "0.010000", "0.000100", "0.000200"
        );
        let (mjd, record) = parse_c04_line(&synthetic).unwrap();
        assert_eq!(mjd, 47892);
        assert!((record.ut1_utc - 0.345678).abs() < 1e-9);
    }

    #[test]
    fn interpolation_is_linear_between_bracketing_entries() {
        let mut data = BTreeMap::new();
        data.insert(
            50000,
            EopRecord {
                pm_x: 0.0,
                pm_y: 0.0,
                ut1_utc: 0.0,
                lod: None,
                dx: None,
                dy: None,
            },
        );
        data.insert(
            50001,
            EopRecord {
                pm_x: 0.0,
                pm_y: 0.0,
                ut1_utc: 1.0,
                lod: None,
                dx: None,
                dy: None,
            },
        );
        let eop = TabularEop::new(data, EopExtrapolation::Hold, true).unwrap();
        assert_eq!(eop.ut1_utc(50000.5).unwrap(), 0.5);
    }

    #[test]
    fn hold_extrapolation_repeats_last_entry() {
        let mut data = BTreeMap::new();
        data.insert(
            50000,
            EopRecord {
                pm_x: 0.0,
                pm_y: 0.0,
                ut1_utc: 0.25,
                lod: None,
                dx: None,
                dy: None,
            },
        );
        let eop = TabularEop::new(data, EopExtrapolation::Hold, true).unwrap();
        assert_eq!(eop.ut1_utc(60000.0).unwrap(), 0.25);
    }

    #[test]
    fn error_extrapolation_reports_out_of_range() {
        let mut data = BTreeMap::new();
        data.insert(
            50000,
            EopRecord {
                pm_x: 0.0,
                pm_y: 0.0,
                ut1_utc: 0.0,
                lod: None,
                dx: None,
                dy: None,
            },
        );
        let eop = TabularEop::new(data, EopExtrapolation::Error, true).unwrap();
        assert!(eop.ut1_utc(60000.0).is_err());
    }

    #[test]
    fn global_provider_defaults_to_zero() {
        assert_eq!(get_global_ut1_utc(0.0).unwrap(), 0.0);
    }

    #[test]
    fn global_provider_can_be_replaced() {
        set_global_provider(Arc::new(TabularEop::static_values(0.0, 0.0, 0.5, 0.0, 0.0, 0.0)));
        assert_eq!(get_global_ut1_utc(12345.0).unwrap(), 0.5);
        set_global_provider(Arc::new(TabularEop::zero()));
    }
}
