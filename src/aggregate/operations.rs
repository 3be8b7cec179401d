//! Reducers applied to each categorical group

use crate::errors::{CubeHelperError, Result};
use ndarray::ArrayD;
use std::fmt;
use std::str::FromStr;

/// Supported group reductions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Reducer {
    /// Arithmetic mean
    #[default]
    Mean,
    /// Sum of values
    Sum,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
}

impl Reducer {
    /// Name used in `cell_methods`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "minimum",
            Self::Max => "maximum",
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reducer {
    type Err = CubeHelperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "average" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "min" | "minimum" => Ok(Self::Min),
            "max" | "maximum" => Ok(Self::Max),
            other => Err(CubeHelperError::InvalidArgument {
                argument: "reducer".to_string(),
                value: other.to_string(),
                expected: "mean, sum, min, max".to_string(),
            }),
        }
    }
}

/// Types that can collapse one axis with a [`Reducer`]
pub trait AxisReduction {
    /// Collapse `axis`, skipping NaN entries
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is out of bounds for the array.
    fn reduce_along_axis(&self, axis: usize, reducer: Reducer) -> Result<ArrayD<f64>>;
}

impl AxisReduction for ArrayD<f64> {
    fn reduce_along_axis(&self, axis: usize, reducer: Reducer) -> Result<ArrayD<f64>> {
        if axis >= self.ndim() {
            return Err(CubeHelperError::CoordinateMismatch {
                cube: "<array>".to_string(),
                coord: format!("axis {axis}"),
                expected: self.ndim(),
                found: axis,
            });
        }

        Ok(match reducer {
            Reducer::Mean => super::parallel::nan_mean_axis(self, axis),
            Reducer::Sum => super::parallel::nan_sum_axis(self, axis),
            Reducer::Min => super::parallel::nan_min_axis(self, axis),
            Reducer::Max => super::parallel::nan_max_axis(self, axis),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn reducers_skip_nan() {
        let data = array![[1.0, f64::NAN], [3.0, f64::NAN]].into_dyn();
        let mean = data.reduce_along_axis(0, Reducer::Mean).unwrap();
        assert_eq!(mean[[0]], 2.0);
        assert!(mean[[1]].is_nan());

        assert_eq!(data.reduce_along_axis(0, Reducer::Sum).unwrap()[[0]], 4.0);
        assert_eq!(data.reduce_along_axis(0, Reducer::Min).unwrap()[[0]], 1.0);
        assert_eq!(data.reduce_along_axis(0, Reducer::Max).unwrap()[[0]], 3.0);
        assert!(data.reduce_along_axis(0, Reducer::Max).unwrap()[[1]].is_nan());
    }

    #[test]
    fn out_of_bounds_axis_is_rejected() {
        let data = array![1.0, 2.0].into_dyn();
        assert!(data.reduce_along_axis(1, Reducer::Mean).is_err());
    }

    #[test]
    fn parses_reducer_names() {
        assert_eq!("MEAN".parse::<Reducer>().unwrap(), Reducer::Mean);
        assert_eq!("max".parse::<Reducer>().unwrap(), Reducer::Max);
        let err = "median".parse::<Reducer>().unwrap_err();
        assert!(matches!(err, CubeHelperError::InvalidArgument { ref value, .. } if value == "median"));
        assert!(err.to_string().starts_with("Invalid reducer 'median'"));
        assert_eq!(Reducer::default(), Reducer::Mean);
    }
}
