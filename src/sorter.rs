//! Chronological ordering of cubes and files
//!
//! Ordering is a stable sort on the probed earliest time; items with equal
//! earliest times keep their input order. A probe failure on any item fails
//! the whole batch.

use crate::cube::Cube;
use crate::errors::Result;
use crate::probe::{probe_cube, probe_file, EarliestTime};
use std::path::{Path, PathBuf};

/// A file paired with its probed earliest time, ahead of a full load
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub earliest: EarliestTime,
}

impl FileDescriptor {
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            path: path.to_path_buf(),
            earliest: probe_file(path)?,
        })
    }
}

/// Permutation that puts `cubes` in chronological order
pub fn chronological_order(cubes: &[Cube]) -> Result<Vec<usize>> {
    let keys = cubes
        .iter()
        .map(|c| probe_cube(c).map(|e| e.hours_since_epoch))
        .collect::<Result<Vec<_>>>()?;
    let mut order: Vec<usize> = (0..cubes.len()).collect();
    order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));
    Ok(order)
}

/// Loaded cubes ordered by earliest time
pub fn sort_by_earliest(cubes: Vec<Cube>) -> Result<Vec<Cube>> {
    let order = chronological_order(&cubes)?;
    let mut slots: Vec<Option<Cube>> = cubes.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Files ordered by earliest time, probing only their time coordinates
pub fn sort_files_by_earliest<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FileDescriptor>> {
    let mut descriptors = paths
        .iter()
        .map(FileDescriptor::probe)
        .collect::<Result<Vec<_>>>()?;
    descriptors.sort_by(|a, b| {
        a.earliest
            .hours_since_epoch
            .total_cmp(&b.earliest.hours_since_epoch)
    });
    Ok(descriptors)
}
