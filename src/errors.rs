//! Centralized error handling for cube_helper
//!
//! Every failure surfaced by the equalisation, merge, derivation and aggregation
//! passes carries enough context (cube index, source file, offending attribute,
//! unit or dtype) to be diagnosed without re-running the pipeline.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cube_helper operations
#[derive(Debug, Error)]
pub enum CubeHelperError {
    /// No usable time metadata could be extracted from a cube or file
    #[error("Probe error for {origin}: {reason}")]
    Probe { origin: String, reason: String },

    /// Time units of two coordinates cannot be unified
    #[error("Cannot convert '{from}' to '{to}' for {context}: incompatible calendars")]
    IncompatibleCalendar {
        from: String,
        to: String,
        context: String,
    },

    /// A residual mismatch left in a collection handed to the merger
    #[error("Cannot merge cube {index}{}: {kind}", source_suffix(.source_path))]
    MergeConflict {
        index: usize,
        source_path: Option<PathBuf>,
        kind: MergeConflictKind,
    },

    /// Categorical name not present in the expansion table
    #[error("Unknown categorical '{name}'")]
    UnknownCategorical { name: String },

    /// Cube has no coordinate with a time-reference unit
    #[error("Cube '{cube}' has no time coordinate")]
    NoTimeCoordinate { cube: String },

    /// Aggregation produced a degenerate group set
    #[error("Aggregation over '{coord}' produced no groups")]
    EmptyGroup { coord: String },

    /// Malformed or unsupported unit string
    #[error("Invalid unit '{unit}': {reason}")]
    InvalidUnit { unit: String, reason: String },

    /// Unrecognised option value, e.g. a reducer or dtype name
    #[error("Invalid {argument} '{value}': expected one of {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    /// Coordinate length disagrees with the axis it describes
    #[error("Coordinate '{coord}' on cube '{cube}': expected {expected}, found {found}")]
    CoordinateMismatch {
        cube: String,
        coord: String,
        expected: usize,
        found: usize,
    },

    /// Named coordinate missing from a cube
    #[error("Coordinate '{coord}' not found on cube '{cube}'")]
    CoordinateNotFound { cube: String, coord: String },

    /// Variable not found in NetCDF file
    #[error("Variable '{var}' not found in {}", .path.display())]
    VariableNotFound { var: String, path: PathBuf },

    /// An operation needing at least one cube or file received none
    #[error("No {what} to process")]
    EmptyInput { what: String },

    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Residual mismatch detected while validating a merge
#[derive(Debug, Clone, PartialEq)]
pub enum MergeConflictKind {
    Name { expected: String, found: String },
    Units { expected: String, found: String },
    Attribute { key: String, expected: String, found: String },
    TimeUnit { expected: String, found: String },
    DType { expected: String, found: String },
    FillValue { expected: Option<f64>, found: Option<f64> },
    Shape { expected: Vec<usize>, found: Vec<usize> },
    Coordinate { name: String },
    MissingTimeCoordinate,
}

impl fmt::Display for MergeConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name { expected, found } => {
                write!(f, "cube name '{found}' differs from '{expected}'")
            }
            Self::Units { expected, found } => {
                write!(f, "data units '{found}' differ from '{expected}'")
            }
            Self::Attribute {
                key,
                expected,
                found,
            } => write!(
                f,
                "attribute '{key}' is '{found}' but '{expected}' on the first cube"
            ),
            Self::TimeUnit { expected, found } => {
                write!(f, "time unit '{found}' differs from '{expected}'")
            }
            Self::DType { expected, found } => {
                write!(f, "dtype {found} differs from {expected}")
            }
            Self::FillValue { expected, found } => {
                write!(f, "fill value {found:?} differs from {expected:?}")
            }
            Self::Shape { expected, found } => {
                write!(f, "shape {found:?} incompatible with {expected:?}")
            }
            Self::Coordinate { name } => write!(f, "coordinate '{name}' does not match"),
            Self::MissingTimeCoordinate => write!(f, "no time coordinate to concatenate along"),
        }
    }
}

fn source_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

/// Result type alias for cube_helper operations
pub type Result<T> = std::result::Result<T, CubeHelperError>;
