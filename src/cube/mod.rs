//! Labelled multi-dimensional cubes
//!
//! A [`Cube`] couples a typed array ([`CubeData`]) with one dimension
//! coordinate per axis, optional auxiliary coordinates bound to a single axis,
//! an attribute mapping, and the paths it was loaded from.
//!
//! # Organization
//!
//! - [`data`]: dtype lattice and typed array storage
//! - [`coord`]: coordinates, units and attribute values

pub mod coord;
pub mod data;

pub use coord::{AttrValue, Attributes, AuxCoord, Coord, CoordValue, CoordValues, Unit};
pub use data::{CubeData, DType};

use crate::errors::{CubeHelperError, Result};
use std::path::{Path, PathBuf};

/// A named, multi-dimensional labelled numeric array
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    pub name: String,
    /// Units of the data values
    pub units: String,
    pub data: CubeData,
    /// One per array axis, in axis order
    pub dim_coords: Vec<Coord>,
    pub aux_coords: Vec<AuxCoord>,
    pub attributes: Attributes,
    /// Integer entries equal to this value are masked
    pub fill_value: Option<f64>,
    /// Files this cube was loaded from
    pub sources: Vec<PathBuf>,
}

impl Cube {
    /// Create a cube, checking that every dimension coordinate matches its axis
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        data: CubeData,
        dim_coords: Vec<Coord>,
    ) -> Result<Self> {
        let name = name.into();
        if dim_coords.len() != data.ndim() {
            return Err(CubeHelperError::CoordinateMismatch {
                cube: name,
                coord: "<dimensions>".to_string(),
                expected: data.ndim(),
                found: dim_coords.len(),
            });
        }
        for (coord, &len) in dim_coords.iter().zip(data.shape()) {
            if coord.len() != len {
                return Err(CubeHelperError::CoordinateMismatch {
                    cube: name,
                    coord: coord.name.clone(),
                    expected: len,
                    found: coord.len(),
                });
            }
        }

        Ok(Self {
            name,
            units: units.into(),
            data,
            dim_coords,
            aux_coords: Vec::new(),
            attributes: Attributes::new(),
            fill_value: None,
            sources: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(path.into());
        self
    }

    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.data.dtype()
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Cast the payload to `dtype`, keeping masked entries masked.
    ///
    /// Float targets hold masked entries as NaN and drop the fill value.
    /// Integer targets keep the current fill value when `dtype` represents
    /// it, otherwise masked entries take the dtype's default fill.
    pub fn cast_data(&mut self, dtype: DType) {
        if self.dtype() == dtype {
            return;
        }
        let values = self.data.to_f64(self.fill_value);
        if dtype.is_float() {
            self.data = CubeData::from_f64(&values, dtype);
            self.fill_value = None;
            return;
        }

        let masked = values.iter().any(|v| v.is_nan());
        let fill = self
            .fill_value
            .filter(|&fill| dtype.represents(fill))
            .or_else(|| masked.then(|| dtype.default_fill()));
        let values = match fill {
            Some(fill) if masked => values.mapv(|v| if v.is_nan() { fill } else { v }),
            _ => values,
        };
        self.data = CubeData::from_f64(&values, dtype);
        self.fill_value = fill;
    }

    /// Rewrite the entries masked by `fill_value` to use `fill` instead.
    ///
    /// Float payloads hold masked entries as NaN and carry no fill value.
    pub fn set_fill_value(&mut self, fill: Option<f64>) {
        if self.dtype().is_float() {
            if let Some(current) = self.fill_value.take() {
                self.data = self.data.replace_value(current, f64::NAN);
            }
            return;
        }
        match (self.fill_value, fill) {
            (Some(current), Some(fill)) if current.to_bits() != fill.to_bits() => {
                self.data = self.data.replace_value(current, fill);
                self.fill_value = Some(fill);
            }
            (None, Some(fill)) => self.fill_value = Some(fill),
            _ => {}
        }
    }

    /// First file this cube came from, for diagnostics
    #[must_use]
    pub fn primary_source(&self) -> Option<&Path> {
        self.sources.first().map(PathBuf::as_path)
    }

    /// Axis of the first dimension coordinate with a time-reference unit
    #[must_use]
    pub fn time_axis(&self) -> Option<usize> {
        self.dim_coords
            .iter()
            .position(|c| c.time_unit().is_some())
    }

    #[must_use]
    pub fn time_coord(&self) -> Option<&Coord> {
        self.time_axis().map(|axis| &self.dim_coords[axis])
    }

    /// Time axis, or `NoTimeCoordinate`
    pub fn require_time_axis(&self) -> Result<usize> {
        self.time_axis()
            .ok_or_else(|| CubeHelperError::NoTimeCoordinate {
                cube: self.name.clone(),
            })
    }

    /// Dimension or auxiliary coordinate by name
    #[must_use]
    pub fn coord(&self, name: &str) -> Option<&Coord> {
        self.dim_coords
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.aux_coord(name).map(|aux| &aux.coord))
    }

    #[must_use]
    pub fn has_coord(&self, name: &str) -> bool {
        self.coord(name).is_some()
    }

    #[must_use]
    pub fn aux_coord(&self, name: &str) -> Option<&AuxCoord> {
        self.aux_coords.iter().find(|aux| aux.coord.name == name)
    }

    /// Every coordinate carrying a time-reference unit, dimension or auxiliary
    pub fn time_reference_coords(&self) -> impl Iterator<Item = &Coord> {
        self.dim_coords
            .iter()
            .chain(self.aux_coords.iter().map(|aux| &aux.coord))
            .filter(|c| c.time_unit().is_some())
    }

    /// Mutable counterpart of [`Cube::time_reference_coords`], same order
    pub fn time_reference_coords_mut(&mut self) -> impl Iterator<Item = &mut Coord> {
        self.dim_coords
            .iter_mut()
            .chain(self.aux_coords.iter_mut().map(|aux| &mut aux.coord))
            .filter(|c| c.time_unit().is_some())
    }

    /// Attach `coord` along `axis`, replacing an auxiliary coordinate of the same name
    pub fn add_aux_coord(&mut self, coord: Coord, axis: usize) -> Result<()> {
        let expected = self.shape().get(axis).copied().ok_or_else(|| {
            CubeHelperError::CoordinateMismatch {
                cube: self.name.clone(),
                coord: coord.name.clone(),
                expected: self.data.ndim(),
                found: axis,
            }
        })?;
        let found = coord.len();
        if found != expected {
            return Err(CubeHelperError::CoordinateMismatch {
                cube: self.name.clone(),
                coord: coord.name,
                expected,
                found,
            });
        }

        self.remove_coord(&coord.name);
        self.aux_coords.push(AuxCoord { coord, axis });
        Ok(())
    }

    /// Detach an auxiliary coordinate
    pub fn remove_coord(&mut self, name: &str) -> Option<Coord> {
        let index = self.aux_coords.iter().position(|aux| aux.coord.name == name)?;
        Some(self.aux_coords.remove(index).coord)
    }

    /// Sub-cube holding `indices` along `axis`
    #[must_use]
    pub fn extract(&self, axis: usize, indices: &[usize]) -> Self {
        let select_coord = |coord: &Coord| Coord {
            name: coord.name.clone(),
            unit: coord.unit.clone(),
            values: coord.values.select(indices),
            bounds: coord
                .bounds
                .as_ref()
                .map(|b| indices.iter().map(|&i| b[i]).collect()),
        };

        let dim_coords = self
            .dim_coords
            .iter()
            .enumerate()
            .map(|(i, c)| if i == axis { select_coord(c) } else { c.clone() })
            .collect();
        let aux_coords = self
            .aux_coords
            .iter()
            .map(|aux| AuxCoord {
                coord: if aux.axis == axis {
                    select_coord(&aux.coord)
                } else {
                    aux.coord.clone()
                },
                axis: aux.axis,
            })
            .collect();

        Self {
            name: self.name.clone(),
            units: self.units.clone(),
            data: self.data.select(axis, indices),
            dim_coords,
            aux_coords,
            attributes: self.attributes.clone(),
            fill_value: self.fill_value,
            sources: self.sources.clone(),
        }
    }

    /// One-line summary, e.g. `air_temperature / (K) float32 [time: 7; lat: 2]`
    #[must_use]
    pub fn summary(&self) -> String {
        let dims: Vec<String> = self
            .dim_coords
            .iter()
            .map(|c| format!("{}: {}", c.name, c.len()))
            .collect();
        format!(
            "{} / ({}) {} [{}]",
            self.name,
            self.units,
            self.dtype(),
            dims.join("; ")
        )
    }
}
