//! Normalisation passes that make a collection of cubes mergeable
//!
//! Each pass works in place on a slice of cubes, can be called on its own,
//! and is idempotent: a second application leaves the collection unchanged.
//! Passes that can fail compute every change before applying any of them, so
//! an error never leaves the collection partially equalised.

use crate::cube::{AttrValue, Coord, Cube, DType};
use crate::errors::{CubeHelperError, Result};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Outcome of a dtype equalisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DTypeReport {
    /// Dtype every cube now holds
    pub target: DType,
    /// Whether at least one cube was narrowed with precision loss
    pub lossy: bool,
}

/// Make all attribute mappings identical.
///
/// Keys missing from any cube are dropped everywhere; shared keys whose values
/// differ are reset to an empty string on every cube; shared keys with equal
/// values are left untouched.
pub fn equalise_attributes(cubes: &mut [Cube]) {
    let Some((first, rest)) = cubes.split_first() else {
        return;
    };

    let common: BTreeSet<String> = first
        .attributes
        .keys()
        .filter(|key| rest.iter().all(|c| c.attributes.contains_key(*key)))
        .cloned()
        .collect();
    let conflicting: BTreeSet<String> = common
        .iter()
        .filter(|key| {
            rest.iter()
                .any(|c| c.attributes.get(*key) != first.attributes.get(*key))
        })
        .cloned()
        .collect();

    for (index, cube) in cubes.iter_mut().enumerate() {
        let before = cube.attributes.len();
        cube.attributes.retain(|key, _| common.contains(key));
        if cube.attributes.len() != before {
            debug!(cube = index, dropped = before - cube.attributes.len(), "dropped unshared attributes");
        }
        for key in &conflicting {
            cube.attributes.insert(key.clone(), AttrValue::empty());
        }
    }
    if !conflicting.is_empty() {
        debug!(keys = ?conflicting, "blanked conflicting attributes");
    }
}

/// Blank `keys` (default: every key of the first cube) on every cube,
/// whether or not their values already agree.
pub fn remove_attributes(cubes: &mut [Cube], keys: Option<&[&str]>) {
    let keys: Vec<String> = match keys {
        Some(keys) => keys.iter().map(|k| (*k).to_string()).collect(),
        None => match cubes.first() {
            Some(first) => first.attributes.keys().cloned().collect(),
            None => return,
        },
    };

    for cube in cubes.iter_mut() {
        for key in &keys {
            cube.attributes.insert(key.clone(), AttrValue::empty());
        }
    }
    debug!(keys = ?keys, cubes = cubes.len(), "removed attributes");
}

/// Re-express every time-reference coordinate in the first cube's time unit.
///
/// Points and bounds are converted so each keeps the instant it represents.
/// Fails with `IncompatibleCalendar` if any coordinate's calendar cannot be
/// mapped onto the target's; nothing is modified in that case.
pub fn equalise_time_units(cubes: &mut [Cube]) -> Result<()> {
    let Some(target) = cubes
        .iter()
        .find_map(|c| c.time_coord().and_then(Coord::time_unit).copied())
    else {
        return Ok(());
    };

    let mut converted: Vec<Vec<Coord>> = Vec::with_capacity(cubes.len());
    for (index, cube) in cubes.iter().enumerate() {
        let coords = cube
            .time_reference_coords()
            .map(|coord| {
                let unit = coord.time_unit().copied();
                match unit {
                    Some(unit) if !unit.is_convertible_to(&target) => {
                        Err(CubeHelperError::IncompatibleCalendar {
                            from: unit.to_string(),
                            to: target.to_string(),
                            context: describe_coord(cube, index, &coord.name),
                        })
                    }
                    _ => coord.with_time_unit(&target),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        converted.push(coords);
    }

    for (cube, coords) in cubes.iter_mut().zip(converted) {
        for (slot, coord) in cube.time_reference_coords_mut().zip(coords) {
            *slot = coord;
        }
    }
    debug!(target = %target, cubes = cubes.len(), "equalised time units");
    Ok(())
}

/// Cast every cube to one common dtype.
///
/// The target is the narrowest dtype holding every input without precision
/// loss. When no such dtype exists (e.g. `int64` alongside `float32`), the
/// first cube's dtype is used and the report flags the cast as lossy.
/// Returns `None` for an empty collection.
pub fn equalise_data_type(cubes: &mut [Cube]) -> Option<DTypeReport> {
    let first = cubes.first()?.dtype();
    let report = match cubes
        .iter()
        .try_fold(first, |acc, c| DType::common_lossless(acc, c.dtype()))
    {
        Some(target) => DTypeReport {
            target,
            lossy: false,
        },
        None => {
            warn!(
                target = %first,
                "no lossless common dtype; casting to the first cube's dtype"
            );
            DTypeReport {
                target: first,
                lossy: true,
            }
        }
    };
    cast_all(cubes, report.target);
    Some(report)
}

/// Cast every cube to `dtype`, reporting whether any cast lost precision
pub fn equalise_data_type_to(cubes: &mut [Cube], dtype: DType) -> DTypeReport {
    let lossy = cubes.iter().any(|c| !dtype.holds(c.dtype()));
    if lossy {
        warn!(target = %dtype, "lossy cast requested");
    }
    cast_all(cubes, dtype);
    DTypeReport {
        target: dtype,
        lossy,
    }
}

/// Give every cube the same masking convention.
///
/// Float payloads mark masked entries with NaN and drop their fill value.
/// Integer payloads adopt the first integer cube's fill value (or their
/// dtype's default fill when they cannot store it), rewriting the entries
/// their old fill value masked.
pub fn equalise_fill_values(cubes: &mut [Cube]) {
    let target = cubes
        .iter()
        .filter(|c| !c.dtype().is_float())
        .find_map(|c| c.fill_value);

    for (index, cube) in cubes.iter_mut().enumerate() {
        let fill = if cube.dtype().is_float() {
            None
        } else {
            target.map(|fill| {
                if cube.dtype().represents(fill) {
                    fill
                } else {
                    cube.dtype().default_fill()
                }
            })
        };
        if cube.fill_value.map(f64::to_bits) != fill.map(f64::to_bits) {
            debug!(cube = index, from = ?cube.fill_value, to = ?fill, "equalising fill value");
            cube.set_fill_value(fill);
        }
    }
}

fn cast_all(cubes: &mut [Cube], dtype: DType) {
    for (index, cube) in cubes.iter_mut().enumerate() {
        if cube.dtype() != dtype {
            debug!(cube = index, from = %cube.dtype(), to = %dtype, "casting cube data");
            cube.cast_data(dtype);
        }
    }
}

fn describe_coord(cube: &Cube, index: usize, coord: &str) -> String {
    match cube.primary_source() {
        Some(path) => format!("coordinate '{coord}' of cube {index} ({})", path.display()),
        None => format!("coordinate '{coord}' of cube {index}"),
    }
}
