//! Coordinates, units and attribute values attached to cubes

use crate::errors::{CubeHelperError, Result};
use crate::units::TimeUnit;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Unit of a coordinate
#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    /// Time-reference unit (`<interval> since <origin>` on a calendar)
    Time(TimeUnit),
    Named(String),
    NoUnit,
}

impl Unit {
    /// Interpret CF `units`/`calendar` attribute strings
    pub fn parse(units: Option<&str>, calendar: Option<&str>) -> Result<Self> {
        match units.map(str::trim) {
            Some(u) if u.contains(" since ") => Ok(Self::Time(TimeUnit::parse(
                u,
                calendar.unwrap_or("gregorian"),
            )?)),
            Some(u) if !u.is_empty() => Ok(Self::Named(u.to_string())),
            _ => Ok(Self::NoUnit),
        }
    }

    #[must_use]
    pub const fn as_time(&self) -> Option<&TimeUnit> {
        match self {
            Self::Time(unit) => Some(unit),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time(unit) => write!(f, "{unit}"),
            Self::Named(name) => f.write_str(name),
            Self::NoUnit => f.write_str("1"),
        }
    }
}

/// A single coordinate point, usable as a grouping key
#[derive(Debug, Clone)]
pub enum CoordValue {
    Float(f64),
    Int(i64),
    Text(String),
    Bool(bool),
}

impl PartialEq for CoordValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CoordValue {}

impl Hash for CoordValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Float(v) => v.to_bits().hash(state),
            Self::Int(v) => v.hash(state),
            Self::Text(v) => v.hash(state),
            Self::Bool(v) => v.hash(state),
        }
    }
}

impl fmt::Display for CoordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Points of a coordinate
#[derive(Debug, Clone, PartialEq)]
pub enum CoordValues {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
    Bool(Vec<bool>),
}

impl CoordValues {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<CoordValue> {
        match self {
            Self::Float(v) => v.get(index).copied().map(CoordValue::Float),
            Self::Int(v) => v.get(index).copied().map(CoordValue::Int),
            Self::Text(v) => v.get(index).cloned().map(CoordValue::Text),
            Self::Bool(v) => v.get(index).copied().map(CoordValue::Bool),
        }
    }

    /// Points at `indices`, in that order
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(v: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| v[i].clone()).collect()
        }
        match self {
            Self::Float(v) => Self::Float(pick(v, indices)),
            Self::Int(v) => Self::Int(pick(v, indices)),
            Self::Text(v) => Self::Text(pick(v, indices)),
            Self::Bool(v) => Self::Bool(pick(v, indices)),
        }
    }

    /// Join points end to end; `None` when the parts hold different kinds.
    ///
    /// Integer parts mixed with float parts are widened to float.
    #[must_use]
    pub fn concat(parts: &[&CoordValues]) -> Option<Self> {
        let (first, rest) = parts.split_first()?;
        let mixed_numeric = parts.iter().any(|p| matches!(p, Self::Float(_)))
            && parts.iter().any(|p| matches!(p, Self::Int(_)));
        if mixed_numeric {
            let mut joined = Vec::new();
            for part in parts {
                joined.extend(part.to_f64()?);
            }
            return Some(Self::Float(joined));
        }

        let mut joined = (*first).clone();
        for part in rest {
            match (&mut joined, part) {
                (Self::Float(a), Self::Float(b)) => a.extend_from_slice(b),
                (Self::Int(a), Self::Int(b)) => a.extend_from_slice(b),
                (Self::Text(a), Self::Text(b)) => a.extend_from_slice(b),
                (Self::Bool(a), Self::Bool(b)) => a.extend_from_slice(b),
                _ => return None,
            }
        }
        Some(joined)
    }

    /// Numeric points as f64 (integers widened)
    #[must_use]
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            Self::Float(v) => Some(v.clone()),
            Self::Int(v) => Some(v.iter().map(|&i| i as f64).collect()),
            _ => None,
        }
    }
}

/// A named, ordered set of points describing one cube axis
#[derive(Debug, Clone, PartialEq)]
pub struct Coord {
    pub name: String,
    pub unit: Unit,
    pub values: CoordValues,
    /// `[lower, upper]` per point
    pub bounds: Option<Vec<[f64; 2]>>,
}

impl Coord {
    pub fn new(name: impl Into<String>, unit: Unit, values: CoordValues) -> Self {
        Self {
            name: name.into(),
            unit,
            values,
            bounds: None,
        }
    }

    /// Time coordinate from raw points
    pub fn time(name: impl Into<String>, unit: TimeUnit, points: Vec<f64>) -> Self {
        Self::new(name, Unit::Time(unit), CoordValues::Float(points))
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Vec<[f64; 2]>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub const fn time_unit(&self) -> Option<&TimeUnit> {
        self.unit.as_time()
    }

    /// Cell extent of point `index`; a point without bounds spans itself
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<[f64; 2]> {
        if let Some(bounds) = &self.bounds {
            return bounds.get(index).copied();
        }
        match self.values.get(index)? {
            CoordValue::Float(v) => Some([v, v]),
            CoordValue::Int(v) => Some([v as f64, v as f64]),
            _ => None,
        }
    }

    /// Copy of this time coordinate re-expressed in `target`, with float points
    pub fn with_time_unit(&self, target: &TimeUnit) -> Result<Self> {
        let current = self.time_unit().ok_or_else(|| CubeHelperError::InvalidUnit {
            unit: self.unit.to_string(),
            reason: format!("coordinate '{}' is not a time coordinate", self.name),
        })?;
        let points = self.values.to_f64().ok_or_else(|| CubeHelperError::InvalidUnit {
            unit: current.to_string(),
            reason: format!("coordinate '{}' has non-numeric points", self.name),
        })?;
        if current == target {
            return Ok(Self {
                values: CoordValues::Float(points),
                ..self.clone()
            });
        }

        let convert = |v: f64| current.convert(v, target);
        let points = points.into_iter().map(convert).collect::<Result<Vec<_>>>()?;
        let bounds = match &self.bounds {
            Some(bounds) => Some(
                bounds
                    .iter()
                    .map(|[lo, hi]| Ok([convert(*lo)?, convert(*hi)?]))
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        Ok(Self {
            name: self.name.clone(),
            unit: Unit::Time(*target),
            values: CoordValues::Float(points),
            bounds,
        })
    }
}

/// Coordinate spanning a single cube axis without being its dimension coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct AuxCoord {
    pub coord: Coord,
    pub axis: usize,
}

/// Scalar or vector attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

impl AttrValue {
    /// The blank value equalisation resets conflicting attributes to
    #[must_use]
    pub fn empty() -> Self {
        Self::Str(String::new())
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Ints(is) => write!(f, "{is:?}"),
            Self::Floats(vs) => write!(f, "{vs:?}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Attribute mapping, ordered by key
pub type Attributes = BTreeMap<String, AttrValue>;
