//! cube_helper: equalise, merge and categorically aggregate climate cubes
//!
//! A Rust library for turning a collection of NetCDF files, each holding one
//! slice of a long time series, into a single cube. Files are ordered by the
//! earliest instant they cover, their attributes, time units and dtypes are
//! equalised, and the result is concatenated along time. Calendar categoricals
//! (season, month, weekday, ...) can then be derived and aggregated over.
//!
//! ## Key Features
//!
//! - **Calendar-aware time units**: gregorian, julian, noleap, all_leap and 360_day
//! - **Equalisation**: attributes, time units and data types across cubes
//! - **Chronological ordering**: of loaded cubes, or of files before loading them
//! - **Categorical aggregation**: mean, sum, min and max per group, in parallel
//!
//! ## Module Organization
//!
//! - [`units`]: calendars, time units and date arithmetic
//! - [`cube`]: the cube model (typed data, coordinates, attributes)
//! - [`probe`]: earliest-time probing of cubes and files
//! - [`sorter`]: chronological ordering
//! - [`equaliser`]: attribute, time unit and dtype equalisation
//! - [`merger`]: concatenation along time
//! - [`categorical`]: calendar-derived categorical coordinates
//! - [`aggregate`]: aggregation over categoricals
//! - [`netcdf_io`]: NetCDF discovery, loading and writing
//! - [`loader`]: the load and concatenate pipelines
//! - [`parallel`]: parallel processing configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cube_helper::prelude::*;
//! use std::path::PathBuf;
//!
//! let source = LoadSource::Directory(PathBuf::from("data/air_temp"));
//! let mut cube = load(&source, &LoadOptions::default()).unwrap();
//!
//! let seasonal = aggregate_categorical(&mut cube, "annual_seasonal_mean", Reducer::Mean).unwrap();
//! save_cube(&seasonal, std::path::Path::new("seasonal.nc")).unwrap();
//! ```

pub mod aggregate;
pub mod categorical;
pub mod cube;
pub mod equaliser;
pub mod errors;
pub mod loader;
pub mod merger;
pub mod netcdf_io;
pub mod parallel;
pub mod probe;
pub mod sorter;
pub mod units;

pub use errors::{CubeHelperError, MergeConflictKind, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::aggregate::{aggregate_by, aggregate_categorical, Reducer};
    pub use crate::categorical::{add_categorical, add_categoricals, Categorical, CategoricalSpec};
    pub use crate::cube::{AttrValue, Coord, CoordValues, Cube, CubeData, DType, Unit};
    pub use crate::equaliser::{
        equalise_attributes, equalise_data_type, equalise_data_type_to, equalise_fill_values,
        equalise_time_units, remove_attributes, DTypeReport,
    };
    pub use crate::errors::{CubeHelperError, Result};
    pub use crate::loader::{concatenate, load, LoadOptions, LoadSource};
    pub use crate::merger::merge;
    pub use crate::netcdf_io::{load_cube, load_from_dir, load_from_filelist, save_cube, NetCDFWriter};
    pub use crate::parallel::ParallelConfig;
    pub use crate::sorter::{sort_by_earliest, sort_files_by_earliest, FileDescriptor};
    pub use crate::units::{Calendar, CalendarDateTime, TimeUnit};
}
