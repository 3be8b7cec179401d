//! Shared fixtures for the integration suites
//!
//! `realistic_3d` is a 7 x 3 x 4 air potential temperature cube with 6-hourly
//! time points from 394200 hours since 1970-01-01 (2014-12-21 00:00, a
//! Sunday) to 394236 (2014-12-22 12:00).

#![allow(dead_code)]

use cube_helper::cube::{AuxCoord, Coord, CoordValues, Cube, CubeData, Unit};
use cube_helper::netcdf_io::save_cube;
use cube_helper::units::TimeUnit;
use ndarray::{Array3, IxDyn};
use std::path::{Path, PathBuf};

pub const FIRST_POINT: f64 = 394_200.0;
pub const STEP_HOURS: f64 = 6.0;
pub const N_TIMES: usize = 7;

pub fn hours_since(year: i32) -> TimeUnit {
    TimeUnit::parse(&format!("hours since {year}-01-01 00:00:00"), "gregorian")
        .expect("Failed to parse time unit")
}

/// Value at `[t, y, x]` is `100 t + 10 y + x`
pub fn realistic_3d() -> Cube {
    let data = Array3::from_shape_fn((N_TIMES, 3, 4), |(t, y, x)| {
        (100 * t + 10 * y + x) as f32
    })
    .into_shape(IxDyn(&[N_TIMES, 3, 4]))
    .expect("Failed to reshape fixture data");

    let points: Vec<f64> = (0..N_TIMES)
        .map(|i| FIRST_POINT + STEP_HOURS * i as f64)
        .collect();
    let dim_coords = vec![
        Coord::time("time", hours_since(1970), points),
        Coord::new(
            "grid_latitude",
            Unit::Named("degrees".to_string()),
            CoordValues::Float(vec![-0.1, 0.0, 0.1]),
        ),
        Coord::new(
            "grid_longitude",
            Unit::Named("degrees".to_string()),
            CoordValues::Float(vec![359.6, 359.7, 359.8, 359.9]),
        ),
    ];

    let mut cube = Cube::new(
        "air_potential_temperature",
        "K",
        CubeData::Float32(data),
        dim_coords,
    )
    .expect("Failed to build fixture cube")
    .with_attribute("source", "Iris test case")
    .with_attribute("title", "realistic 3d");

    let forecast_period: Vec<f64> = (0..N_TIMES).map(|i| STEP_HOURS * i as f64).collect();
    cube.aux_coords.push(AuxCoord {
        coord: Coord::new(
            "forecast_period",
            Unit::Named("hours".to_string()),
            CoordValues::Float(forecast_period),
        ),
        axis: 0,
    });
    cube
}

/// Time slices `[0:2]`, `[2:4]` and `[4:]` of [`realistic_3d`]
pub fn split_cubes() -> Vec<Cube> {
    let base = realistic_3d();
    vec![
        base.extract(0, &[0, 1]),
        base.extract(0, &[2, 3]),
        base.extract(0, &[4, 5, 6]),
    ]
}

/// [`split_cubes`] with the second and third cubes' time points re-expressed
/// against 1980 and 1990 epochs
pub fn split_cubes_with_epochs() -> Vec<Cube> {
    let mut cubes = split_cubes();
    for (cube, year) in cubes.iter_mut().skip(1).zip([1980, 1990]) {
        cube.dim_coords[0] = cube.dim_coords[0]
            .with_time_unit(&hours_since(year))
            .expect("Failed to convert time unit");
    }
    cubes
}

/// Save `cubes` as `temp_1.nc`, `temp_2.nc`, ... in `dir`
pub fn write_cubes(dir: &Path, cubes: &[Cube]) -> Vec<PathBuf> {
    cubes
        .iter()
        .enumerate()
        .map(|(i, cube)| {
            let path = dir.join(format!("temp_{}.nc", i + 1));
            save_cube(cube, &path).expect("Failed to write NetCDF file");
            path
        })
        .collect()
}

pub fn time_points(cube: &Cube) -> Vec<f64> {
    cube.time_coord()
        .expect("cube has no time coordinate")
        .values
        .to_f64()
        .expect("time points are not numeric")
}
