//! Typed array storage for cubes
//!
//! Cube payloads keep their on-disk numeric type so that dtype equalisation has
//! something real to reconcile. Masked entries are NaN for float data, or equal
//! to the cube's fill value.

use crate::errors::{CubeHelperError, MergeConflictKind, Result};
use ndarray::{ArrayD, Axis};
use std::fmt;
use std::str::FromStr;

/// Numeric element type of a cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

/// Narrowest first
const BY_WIDTH: [DType; 5] = [
    DType::Int16,
    DType::Int32,
    DType::Float32,
    DType::Int64,
    DType::Float64,
];

impl DType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Whether every value of `other` is exactly representable in `self`
    #[must_use]
    pub const fn holds(self, other: Self) -> bool {
        use DType::*;
        matches!(
            (self, other),
            (Int16, Int16)
                | (Int32, Int16 | Int32)
                | (Int64, Int16 | Int32 | Int64)
                | (Float32, Int16 | Float32)
                | (Float64, Int16 | Int32 | Float32 | Float64)
        )
    }

    /// Narrowest dtype that holds both `a` and `b` without precision loss
    #[must_use]
    pub fn common_lossless(a: Self, b: Self) -> Option<Self> {
        BY_WIDTH.into_iter().find(|c| c.holds(a) && c.holds(b))
    }

    /// NetCDF default fill value for this dtype
    #[must_use]
    pub const fn default_fill(self) -> f64 {
        match self {
            Self::Int16 => -32_767.0,
            Self::Int32 => -2_147_483_647.0,
            Self::Int64 => -9_223_372_036_854_775_806.0,
            Self::Float32 | Self::Float64 => 9.969_209_968_386_869e36,
        }
    }

    /// Whether `value` is stored exactly by this dtype
    #[must_use]
    pub fn represents(self, value: f64) -> bool {
        let in_range = |min: f64, max: f64| value.fract() == 0.0 && (min..=max).contains(&value);
        match self {
            Self::Int16 => in_range(f64::from(i16::MIN), f64::from(i16::MAX)),
            Self::Int32 => in_range(f64::from(i32::MIN), f64::from(i32::MAX)),
            Self::Int64 => in_range(i64::MIN as f64, i64::MAX as f64),
            Self::Float32 => value.is_nan() || f64::from(value as f32) == value,
            Self::Float64 => true,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = CubeHelperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "int16" | "i16" | "short" => Ok(Self::Int16),
            "int32" | "i32" | "int" => Ok(Self::Int32),
            "int64" | "i64" | "longlong" => Ok(Self::Int64),
            "float32" | "f32" | "float" => Ok(Self::Float32),
            "float64" | "f64" | "double" => Ok(Self::Float64),
            other => Err(CubeHelperError::InvalidArgument {
                argument: "dtype".to_string(),
                value: other.to_string(),
                expected: "int16, int32, int64, float32, float64".to_string(),
            }),
        }
    }
}

/// N-dimensional cube payload in its native numeric type
#[derive(Debug, Clone, PartialEq)]
pub enum CubeData {
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
}

/// Evaluate `$body` with `$arr` bound to the inner array of any variant
macro_rules! each_variant {
    ($data:expr, $arr:ident => $body:expr) => {
        match $data {
            CubeData::Int16($arr) => $body,
            CubeData::Int32($arr) => $body,
            CubeData::Int64($arr) => $body,
            CubeData::Float32($arr) => $body,
            CubeData::Float64($arr) => $body,
        }
    };
}

/// Like `each_variant!`, rewrapping the resulting array in the same variant
macro_rules! map_variant {
    ($data:expr, $arr:ident => $body:expr) => {
        match $data {
            CubeData::Int16($arr) => CubeData::Int16($body),
            CubeData::Int32($arr) => CubeData::Int32($body),
            CubeData::Int64($arr) => CubeData::Int64($body),
            CubeData::Float32($arr) => CubeData::Float32($body),
            CubeData::Float64($arr) => CubeData::Float64($body),
        }
    };
}

macro_rules! concat_variant {
    ($variant:ident, $axis:expr, $parts:expr, $first:expr) => {{
        let mut views = Vec::with_capacity($parts.len());
        for (index, part) in $parts.iter().enumerate() {
            match part {
                CubeData::$variant(array) => views.push(array.view()),
                other => {
                    return Err(CubeHelperError::MergeConflict {
                        index,
                        source_path: None,
                        kind: MergeConflictKind::DType {
                            expected: $first.to_string(),
                            found: other.dtype().to_string(),
                        },
                    })
                }
            }
        }
        CubeData::$variant(ndarray::concatenate(Axis($axis), &views)?)
    }};
}

impl CubeData {
    #[must_use]
    pub const fn dtype(&self) -> DType {
        match self {
            Self::Int16(_) => DType::Int16,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        each_variant!(self, a => a.shape())
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Values widened to f64, with masked entries turned into NaN
    #[must_use]
    pub fn to_f64(&self, fill_value: Option<f64>) -> ArrayD<f64> {
        each_variant!(self, a => a.mapv(|v| {
            let v = v as f64;
            if !v.is_finite() || fill_value.map_or(false, |fill| v == fill) {
                f64::NAN
            } else {
                v
            }
        }))
    }

    /// Narrow f64 values into `dtype`; integer targets round and saturate
    #[must_use]
    pub fn from_f64(values: &ArrayD<f64>, dtype: DType) -> Self {
        match dtype {
            DType::Int16 => Self::Int16(values.mapv(|v| v.round() as i16)),
            DType::Int32 => Self::Int32(values.mapv(|v| v.round() as i32)),
            DType::Int64 => Self::Int64(values.mapv(|v| v.round() as i64)),
            DType::Float32 => Self::Float32(values.mapv(|v| v as f32)),
            DType::Float64 => Self::Float64(values.clone()),
        }
    }

    /// Numeric cast; lossy when `dtype` does not hold the current dtype.
    ///
    /// NaN becomes 0 in integer targets; [`crate::cube::Cube::cast_data`]
    /// keeps masked entries masked.
    #[must_use]
    pub fn cast(&self, dtype: DType) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }
        let widened = each_variant!(self, a => a.mapv(|v| v as f64));
        Self::from_f64(&widened, dtype)
    }

    /// Copy with every entry equal to `from` set to `to`.
    ///
    /// `to` must be representable in this dtype.
    #[must_use]
    pub fn replace_value(&self, from: f64, to: f64) -> Self {
        match self {
            Self::Int16(a) => Self::Int16(a.mapv(|v| if f64::from(v) == from { to as i16 } else { v })),
            Self::Int32(a) => Self::Int32(a.mapv(|v| if f64::from(v) == from { to as i32 } else { v })),
            Self::Int64(a) => Self::Int64(a.mapv(|v| if v as f64 == from { to as i64 } else { v })),
            Self::Float32(a) => {
                Self::Float32(a.mapv(|v| if f64::from(v) == from { to as f32 } else { v }))
            }
            Self::Float64(a) => Self::Float64(a.mapv(|v| if v == from { to } else { v })),
        }
    }

    /// Take `indices` along `axis`
    #[must_use]
    pub fn select(&self, axis: usize, indices: &[usize]) -> Self {
        map_variant!(self, a => a.select(Axis(axis), indices))
    }

    /// Join same-typed payloads along `axis`
    pub fn concatenate(axis: usize, parts: &[&CubeData]) -> Result<Self> {
        let first = parts.first().ok_or_else(|| CubeHelperError::EmptyInput {
            what: "arrays".to_string(),
        })?;
        let dtype = first.dtype();
        Ok(match dtype {
            DType::Int16 => concat_variant!(Int16, axis, parts, dtype),
            DType::Int32 => concat_variant!(Int32, axis, parts, dtype),
            DType::Int64 => concat_variant!(Int64, axis, parts, dtype),
            DType::Float32 => concat_variant!(Float32, axis, parts, dtype),
            DType::Float64 => concat_variant!(Float64, axis, parts, dtype),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, IxDyn};

    #[test]
    fn lossless_lattice() {
        use DType::*;
        assert_eq!(DType::common_lossless(Float32, Float64), Some(Float64));
        assert_eq!(DType::common_lossless(Int16, Float32), Some(Float32));
        assert_eq!(DType::common_lossless(Int32, Float32), Some(Float64));
        assert_eq!(DType::common_lossless(Int16, Int32), Some(Int32));
        assert_eq!(DType::common_lossless(Int64, Float32), None);
        assert_eq!(DType::common_lossless(Int64, Float64), None);
    }

    #[test]
    fn cast_rounds_into_integers() {
        let data = CubeData::Float64(array![1.4, 2.6, -0.5].into_dyn());
        let cast = data.cast(DType::Int32);
        assert_eq!(cast, CubeData::Int32(array![1, 3, -1].into_dyn()));
        assert_eq!(cast.cast(DType::Int32), cast);
    }

    #[test]
    fn masked_values_become_nan() {
        let data = CubeData::Int16(array![1, -999, 3].into_dyn());
        let values = data.to_f64(Some(-999.0));
        assert_eq!(values[[0]], 1.0);
        assert!(values[[1]].is_nan());
    }

    #[test]
    fn fill_values_fit_their_dtype() {
        for dtype in [DType::Int16, DType::Int32, DType::Int64] {
            assert!(dtype.represents(dtype.default_fill()), "{dtype}");
        }
        assert!(!DType::Int16.represents(-99_999.0));
        assert!(!DType::Int32.represents(0.5));
        assert!(DType::Int16.represents(-999.0));
    }

    #[test]
    fn parses_dtype_names() {
        assert_eq!("Double".parse::<DType>().unwrap(), DType::Float64);
        let err = "complex64".parse::<DType>().unwrap_err();
        assert!(matches!(err, CubeHelperError::InvalidArgument { ref argument, .. } if argument == "dtype"));
        assert!(err.to_string().starts_with("Invalid dtype 'complex64'"));
    }

    #[test]
    fn replaces_fill_entries() {
        let data = CubeData::Int32(array![-999, 2, -999].into_dyn());
        assert_eq!(
            data.replace_value(-999.0, -1.0),
            CubeData::Int32(array![-1, 2, -1].into_dyn())
        );
    }

    #[test]
    fn concatenates_along_axis() {
        let a = CubeData::Float32(ArrayD::zeros(IxDyn(&[2, 3])));
        let b = CubeData::Float32(ArrayD::ones(IxDyn(&[1, 3])));
        let joined = CubeData::concatenate(0, &[&a, &b]).unwrap();
        assert_eq!(joined.shape(), &[3, 3]);

        let c = CubeData::Float64(ArrayD::ones(IxDyn(&[1, 3])));
        assert!(matches!(
            CubeData::concatenate(0, &[&a, &c]),
            Err(CubeHelperError::MergeConflict { index: 1, .. })
        ));
    }
}
