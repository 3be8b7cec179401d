//! Earliest-time probing for cubes and files
//!
//! The probe reduces a cube, or a file on disk, to the earliest instant its
//! time coordinate represents, expressed in a common comparison unit
//! (`hours since 1970-01-01 00:00:00`, gregorian) regardless of the unit the
//! source itself uses. Probing a file reads only its time coordinate variable.

use crate::cube::Cube;
use crate::errors::{CubeHelperError, Result};
use crate::netcdf_io::read_time_axis;
use crate::units::{CalendarDateTime, TimeUnit};
use std::path::Path;
use tracing::debug;

/// Earliest represented instant of a cube or file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarliestTime {
    /// Hours since 1970-01-01 00:00:00 on the gregorian axis
    pub hours_since_epoch: f64,
    /// The same instant decomposed on the source's own calendar
    pub datetime: CalendarDateTime,
}

/// Earliest time of an in-memory cube
pub fn probe_cube(cube: &Cube) -> Result<EarliestTime> {
    let origin = cube
        .primary_source()
        .map_or_else(|| format!("cube '{}'", cube.name), |p| p.display().to_string());

    let coord = cube
        .time_coord()
        .ok_or_else(|| probe_error(&origin, "no time coordinate"))?;
    let unit = coord
        .time_unit()
        .ok_or_else(|| probe_error(&origin, "time coordinate has no time-reference unit"))?;
    let points = coord
        .values
        .to_f64()
        .ok_or_else(|| probe_error(&origin, "time coordinate has non-numeric points"))?;

    earliest_of(unit, &points, &origin)
}

/// Earliest time of a NetCDF file, reading only its time coordinate
pub fn probe_file(path: &Path) -> Result<EarliestTime> {
    let origin = path.display().to_string();
    let (unit, points) = read_time_axis(path).map_err(|e| match e {
        CubeHelperError::Probe { .. } => e,
        other => probe_error(&origin, &other.to_string()),
    })?;
    let earliest = earliest_of(&unit, &points, &origin)?;
    debug!(file = %origin, earliest = %earliest.datetime, "probed file");
    Ok(earliest)
}

fn earliest_of(unit: &TimeUnit, points: &[f64], origin: &str) -> Result<EarliestTime> {
    let earliest = points
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::min)
        .ok_or_else(|| probe_error(origin, "time coordinate has no finite points"))?;

    let datetime = unit
        .num2date(earliest)
        .map_err(|e| probe_error(origin, &e.to_string()))?;
    let hours_since_epoch = if unit.calendar().is_gregorian_family() {
        unit.convert(earliest, &TimeUnit::epoch_hours())?
    } else {
        datetime.gregorian_hours_since_epoch()
    };

    Ok(EarliestTime {
        hours_since_epoch,
        datetime,
    })
}

pub(crate) fn probe_error(origin: &str, reason: &str) -> CubeHelperError {
    CubeHelperError::Probe {
        origin: origin.to_string(),
        reason: reason.to_string(),
    }
}
