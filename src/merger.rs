//! Concatenation of equalised, chronologically sorted cubes
//!
//! The merger neither re-sorts nor re-equalises its input. It re-validates the
//! equalisation invariants instead and refuses to concatenate a collection
//! with any residual mismatch. Overlapping or duplicate time points are kept.

use crate::cube::{AttrValue, AuxCoord, Coord, CoordValues, Cube, CubeData};
use crate::errors::{CubeHelperError, MergeConflictKind, Result};
use crate::units::TimeUnit;
use std::collections::BTreeSet;
use tracing::info;

/// A single cube or a collection of cubes
#[derive(Debug, Clone)]
pub enum MergeInput {
    Single(Cube),
    Many(Vec<Cube>),
}

impl From<Cube> for MergeInput {
    fn from(cube: Cube) -> Self {
        Self::Single(cube)
    }
}

impl From<Vec<Cube>> for MergeInput {
    fn from(cubes: Vec<Cube>) -> Self {
        Self::Many(cubes)
    }
}

/// Concatenate cubes along their time axis, in the order given.
///
/// A single cube is returned unchanged.
pub fn merge(input: impl Into<MergeInput>) -> Result<Cube> {
    let mut cubes = match input.into() {
        MergeInput::Single(cube) => return Ok(cube),
        MergeInput::Many(cubes) => cubes,
    };
    match cubes.len() {
        0 => {
            return Err(CubeHelperError::EmptyInput {
                what: "cubes to merge".to_string(),
            })
        }
        1 => return Ok(cubes.remove(0)),
        _ => {}
    }

    let axis = validate(&cubes)?;
    let merged = concatenate_along(&cubes, axis)?;
    info!(cubes = cubes.len(), merged = %merged.summary(), "merged cubes");
    Ok(merged)
}

/// Check that every cube can be concatenated onto the first, returning the time axis
fn validate(cubes: &[Cube]) -> Result<usize> {
    let first = &cubes[0];
    let axis = first
        .time_axis()
        .ok_or_else(|| conflict(0, first, MergeConflictKind::MissingTimeCoordinate))?;
    let time_unit = first.dim_coords[axis].time_unit().copied();

    for (index, cube) in cubes.iter().enumerate().skip(1) {
        let fail = |kind| conflict(index, cube, kind);

        if cube.name != first.name {
            return Err(fail(MergeConflictKind::Name {
                expected: first.name.clone(),
                found: cube.name.clone(),
            }));
        }
        if cube.units != first.units {
            return Err(fail(MergeConflictKind::Units {
                expected: first.units.clone(),
                found: cube.units.clone(),
            }));
        }

        let keys: BTreeSet<&String> = first
            .attributes
            .keys()
            .chain(cube.attributes.keys())
            .collect();
        for key in keys {
            let expected = first.attributes.get(key);
            let found = cube.attributes.get(key);
            if expected != found {
                return Err(fail(MergeConflictKind::Attribute {
                    key: key.clone(),
                    expected: show_attr(expected),
                    found: show_attr(found),
                }));
            }
        }

        if cube.dtype() != first.dtype() {
            return Err(fail(MergeConflictKind::DType {
                expected: first.dtype().to_string(),
                found: cube.dtype().to_string(),
            }));
        }

        if cube.fill_value.map(f64::to_bits) != first.fill_value.map(f64::to_bits) {
            return Err(fail(MergeConflictKind::FillValue {
                expected: first.fill_value,
                found: cube.fill_value,
            }));
        }

        if cube.time_axis() != Some(axis) {
            return Err(fail(MergeConflictKind::MissingTimeCoordinate));
        }
        let unit = cube.dim_coords[axis].time_unit().copied();
        if unit != time_unit {
            let show = |u: Option<TimeUnit>| {
                u.map_or_else(|| "<none>".to_string(), |u| u.to_string())
            };
            return Err(fail(MergeConflictKind::TimeUnit {
                expected: show(time_unit),
                found: show(unit),
            }));
        }

        let shapes_agree = cube.shape().len() == first.shape().len()
            && cube
                .shape()
                .iter()
                .zip(first.shape())
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !shapes_agree {
            return Err(fail(MergeConflictKind::Shape {
                expected: first.shape().to_vec(),
                found: cube.shape().to_vec(),
            }));
        }

        for (i, (ours, theirs)) in first.dim_coords.iter().zip(&cube.dim_coords).enumerate() {
            if i != axis && ours != theirs {
                return Err(fail(MergeConflictKind::Coordinate {
                    name: theirs.name.clone(),
                }));
            }
        }

        if cube.aux_coords.len() != first.aux_coords.len() {
            let name = aux_names_difference(first, cube);
            return Err(fail(MergeConflictKind::Coordinate { name }));
        }
        for ours in &first.aux_coords {
            let matches = cube.aux_coord(&ours.coord.name).map_or(false, |theirs| {
                theirs.axis == ours.axis && (ours.axis == axis || theirs.coord == ours.coord)
            });
            if !matches {
                return Err(fail(MergeConflictKind::Coordinate {
                    name: ours.coord.name.clone(),
                }));
            }
        }
    }

    Ok(axis)
}

fn concatenate_along(cubes: &[Cube], axis: usize) -> Result<Cube> {
    let first = &cubes[0];
    let parts: Vec<&CubeData> = cubes.iter().map(|c| &c.data).collect();
    let data = CubeData::concatenate(axis, &parts)?;

    let time_parts: Vec<&Coord> = cubes.iter().map(|c| &c.dim_coords[axis]).collect();
    let time = concat_coords(&time_parts).ok_or_else(|| {
        conflict(0, first, MergeConflictKind::Coordinate {
            name: first.dim_coords[axis].name.clone(),
        })
    })?;
    let mut dim_coords = first.dim_coords.clone();
    dim_coords[axis] = time;

    let mut aux_coords = Vec::with_capacity(first.aux_coords.len());
    for aux in &first.aux_coords {
        if aux.axis != axis {
            aux_coords.push(aux.clone());
            continue;
        }
        let parts: Vec<&Coord> = cubes
            .iter()
            .filter_map(|c| c.aux_coord(&aux.coord.name).map(|a| &a.coord))
            .collect();
        let coord = concat_coords(&parts).ok_or_else(|| {
            conflict(0, first, MergeConflictKind::Coordinate {
                name: aux.coord.name.clone(),
            })
        })?;
        aux_coords.push(AuxCoord { coord, axis });
    }

    Ok(Cube {
        name: first.name.clone(),
        units: first.units.clone(),
        data,
        dim_coords,
        aux_coords,
        attributes: first.attributes.clone(),
        fill_value: first.fill_value,
        sources: cubes.iter().flat_map(|c| c.sources.iter().cloned()).collect(),
    })
}

/// Points end to end; bounds kept only if every part has them
fn concat_coords(parts: &[&Coord]) -> Option<Coord> {
    let first = parts.first()?;
    let values: Vec<&CoordValues> = parts.iter().map(|c| &c.values).collect();
    let bounds = parts
        .iter()
        .map(|c| c.bounds.as_deref())
        .collect::<Option<Vec<_>>>()
        .map(|b| b.concat());

    Some(Coord {
        name: first.name.clone(),
        unit: first.unit.clone(),
        values: CoordValues::concat(&values)?,
        bounds,
    })
}

fn show_attr(value: Option<&AttrValue>) -> String {
    value.map_or_else(|| "<absent>".to_string(), ToString::to_string)
}

fn aux_names_difference(a: &Cube, b: &Cube) -> String {
    let names = |c: &Cube| -> BTreeSet<String> {
        c.aux_coords.iter().map(|aux| aux.coord.name.clone()).collect()
    };
    names(a)
        .symmetric_difference(&names(b))
        .next()
        .cloned()
        .unwrap_or_default()
}

fn conflict(index: usize, cube: &Cube, kind: MergeConflictKind) -> CubeHelperError {
    CubeHelperError::MergeConflict {
        index,
        source_path: cube.primary_source().map(|p| p.to_path_buf()),
        kind,
    }
}
