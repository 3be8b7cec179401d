//! High-level load and concatenate pipelines
//!
//! `load` discovers files, orders them by their probed earliest time before
//! reading any data, loads them, equalises the collection and merges it. The
//! merged cube's time unit is the one of the chronologically earliest file.

use crate::cube::Cube;
use crate::equaliser::{
    equalise_attributes, equalise_data_type, equalise_fill_values, equalise_time_units,
};
use crate::errors::Result;
use crate::merger::{merge, MergeInput};
use crate::netcdf_io::{discover_dir, filter_filelist, load_paths};
use crate::sorter::{sort_by_earliest, sort_files_by_earliest};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where cubes are loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Every matching file in a directory
    Directory(PathBuf),
    /// An explicit file list
    Files(Vec<PathBuf>),
}

impl LoadSource {
    /// A directory source if `path` is a directory, otherwise a one-file list
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_dir() {
            Self::Directory(path.to_path_buf())
        } else {
            Self::Files(vec![path.to_path_buf()])
        }
    }
}

/// Options for [`load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// File extension to accept, e.g. `.nc`
    pub filetype: String,
    /// Data variable to read; the first data variable when unset
    pub variable: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            filetype: ".nc".to_string(),
            variable: None,
        }
    }
}

/// Load, equalise and merge every file of `source` into one cube
pub fn load(source: &LoadSource, options: &LoadOptions) -> Result<Cube> {
    let paths = match source {
        LoadSource::Directory(dir) => discover_dir(dir, &options.filetype)?,
        LoadSource::Files(files) => filter_filelist(files, &options.filetype)?,
    };

    let ordered: Vec<PathBuf> = sort_files_by_earliest(&paths)?
        .into_iter()
        .map(|descriptor| {
            debug!(file = %descriptor.path.display(), earliest = %descriptor.earliest.datetime, "ordered file");
            descriptor.path
        })
        .collect();

    let (mut cubes, _) = load_paths(ordered, options.variable.as_deref())?;
    equalise_all(&mut cubes)?;
    let cube = merge(cubes)?;
    info!(cube = %cube.summary(), "load complete");
    Ok(cube)
}

/// Sort, equalise and merge in-memory cubes; a single cube is returned as is
pub fn concatenate(input: impl Into<MergeInput>) -> Result<Cube> {
    match input.into() {
        MergeInput::Single(cube) => Ok(cube),
        MergeInput::Many(cubes) => {
            let mut cubes = sort_by_earliest(cubes)?;
            equalise_all(&mut cubes)?;
            merge(cubes)
        }
    }
}

fn equalise_all(cubes: &mut [Cube]) -> Result<()> {
    equalise_attributes(cubes);
    equalise_time_units(cubes)?;
    if let Some(report) = equalise_data_type(cubes) {
        debug!(target = %report.target, lossy = report.lossy, "equalised data type");
    }
    equalise_fill_values(cubes);
    Ok(())
}
