//! Categorical aggregation over the time axis
//!
//! Points sharing the same label tuple on the grouping coordinates collapse
//! into one output point. Groups appear in the order their first member
//! appears on the time axis.
//!
//! # Organization
//!
//! - [`operations`]: the [`Reducer`] enum and the axis reduction trait
//! - [`parallel`]: NaN-skipping folds and the rayon group driver

pub mod operations;
pub mod parallel;

pub use operations::{AxisReduction, Reducer};
pub use parallel::reduce_groups;

use crate::categorical::{add_categorical_specs, Categorical, CategoricalSpec};
use crate::cube::{AttrValue, AuxCoord, Coord, CoordValue, CoordValues, Cube, CubeData};
use crate::errors::{CubeHelperError, Result};
use std::collections::HashMap;
use tracing::{info, warn};

/// Derive (if missing) the categorical `name` on `cube`, then aggregate over it.
///
/// `cube` gains whichever of the categorical's coordinates it lacked.
pub fn aggregate_categorical(cube: &mut Cube, name: &str, reducer: Reducer) -> Result<Cube> {
    let categorical: Categorical = name.parse()?;
    let missing: Vec<CategoricalSpec> = categorical
        .expand()
        .into_iter()
        .filter(|spec| !cube.has_coord(spec.name()))
        .collect();
    if !missing.is_empty() {
        add_categorical_specs(cube, &missing)?;
    }
    aggregate_by(cube, &categorical.coord_names(), reducer)
}

/// Aggregate `cube` over the time-axis coordinates named in `coord_names`
pub fn aggregate_by(cube: &Cube, coord_names: &[&str], reducer: Reducer) -> Result<Cube> {
    let axis = cube.require_time_axis()?;
    let keys = coord_names
        .iter()
        .map(|name| {
            cube.aux_coord(name)
                .filter(|aux| aux.axis == axis)
                .map(|aux| &aux.coord)
                .ok_or_else(|| CubeHelperError::CoordinateNotFound {
                    cube: cube.name.clone(),
                    coord: (*name).to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let groups = group_indices(&keys, cube.shape()[axis]);
    if groups.is_empty() {
        return Err(CubeHelperError::EmptyGroup {
            coord: coord_names.join(", "),
        });
    }

    let data = cube.data.to_f64(cube.fill_value);
    let reduced = reduce_groups(&data, axis, &groups, reducer)?;
    let data = match cube.dtype() {
        dtype if dtype.is_float() => CubeData::from_f64(&reduced, dtype),
        _ => CubeData::Float64(reduced),
    };

    let mut dim_coords = cube.dim_coords.clone();
    dim_coords[axis] = collapse_time(&cube.dim_coords[axis], &groups);

    let firsts: Vec<usize> = groups.iter().map(|g| g[0]).collect();
    let mut aux_coords = Vec::with_capacity(cube.aux_coords.len());
    for aux in &cube.aux_coords {
        if aux.axis != axis {
            aux_coords.push(aux.clone());
        } else if coord_names.contains(&aux.coord.name.as_str()) {
            aux_coords.push(AuxCoord {
                coord: Coord::new(
                    aux.coord.name.clone(),
                    aux.coord.unit.clone(),
                    aux.coord.values.select(&firsts),
                ),
                axis,
            });
        } else {
            warn!(coord = %aux.coord.name, "dropping non-grouping coordinate on the time axis");
        }
    }

    let mut attributes = cube.attributes.clone();
    let method = format!("{}: {}", coord_names.join(": "), reducer.as_str());
    let cell_methods = match attributes.get("cell_methods") {
        Some(AttrValue::Str(existing)) if !existing.is_empty() => format!("{existing} {method}"),
        _ => method,
    };
    attributes.insert("cell_methods".to_string(), AttrValue::Str(cell_methods));

    let aggregated = Cube {
        name: cube.name.clone(),
        units: cube.units.clone(),
        data,
        dim_coords,
        aux_coords,
        attributes,
        fill_value: None,
        sources: cube.sources.clone(),
    };
    info!(
        by = %coord_names.join(", "),
        reducer = reducer.as_str(),
        groups = groups.len(),
        "aggregated {}",
        aggregated.summary()
    );
    Ok(aggregated)
}

/// Member indices per distinct label tuple, in first-appearance order
fn group_indices(keys: &[&Coord], len: usize) -> Vec<Vec<usize>> {
    let mut slots: HashMap<Vec<CoordValue>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..len {
        let label: Vec<CoordValue> = keys.iter().filter_map(|c| c.values.get(i)).collect();
        let slot = *slots.entry(label).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }
    groups
}

/// One point per group: bounds span the members' cells, the point is their midpoint
fn collapse_time(time: &Coord, groups: &[Vec<usize>]) -> Coord {
    let bounds: Vec<[f64; 2]> = groups
        .iter()
        .map(|members| {
            members
                .iter()
                .filter_map(|&i| time.cell(i))
                .fold([f64::INFINITY, f64::NEG_INFINITY], |[lo, hi], [a, b]| {
                    [lo.min(a.min(b)), hi.max(a.max(b))]
                })
        })
        .collect();
    let points = bounds.iter().map(|[lo, hi]| (lo + hi) / 2.0).collect();

    Coord::new(time.name.clone(), time.unit.clone(), CoordValues::Float(points)).with_bounds(bounds)
}
