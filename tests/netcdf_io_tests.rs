//! NetCDF discovery, probing and round-trip tests

mod common;

use common::{realistic_3d, split_cubes, split_cubes_with_epochs, write_cubes};
use cube_helper::categorical::add_categoricals;
use cube_helper::cube::{AttrValue, CoordValues, CubeData, DType, Unit};
use cube_helper::errors::CubeHelperError;
use cube_helper::netcdf_io::{load_cube, load_from_dir, load_from_filelist, save_cube};
use cube_helper::probe::probe_file;
use cube_helper::sorter::sort_files_by_earliest;
use ndarray::Array1;
use netcdf::create;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_load_from_filelist() {
    let dir = tempdir().expect("Failed to create temp dir");
    let paths = write_cubes(dir.path(), &split_cubes());
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "not a cube").expect("Failed to write notes");

    let filelist = vec![paths[0].clone(), paths[1].clone(), notes, paths[0].clone()];
    let (cubes, names) = load_from_filelist(&filelist, ".nc").expect("Failed to load file list");

    assert_eq!(cubes.len(), 3);
    assert_eq!(names, vec![paths[0].clone(), paths[1].clone(), paths[0].clone()]);
    for name in &names {
        assert!(name.exists());
    }
    assert_eq!(cubes[0], cubes[2]);
    assert_eq!(cubes[1].primary_source(), Some(paths[1].as_path()));
}

#[test]
fn test_load_from_dir() {
    let dir = tempdir().expect("Failed to create temp dir");
    let paths = write_cubes(dir.path(), &split_cubes());

    let (cubes, names) = load_from_dir(dir.path(), "nc").expect("Failed to load directory");

    assert_eq!(names, paths);
    assert_eq!(cubes.len(), 3);
    assert_eq!(cubes[2].shape(), &[3, 3, 4]);

    let empty = tempdir().expect("Failed to create temp dir");
    assert!(matches!(
        load_from_dir(empty.path(), ".nc"),
        Err(CubeHelperError::EmptyInput { .. })
    ));
}

#[test]
fn test_file_sort_by_earliest_date() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut paths = write_cubes(dir.path(), &split_cubes_with_epochs());
    paths.rotate_left(1);

    let sorted = sort_files_by_earliest(&paths).expect("Failed to sort files");
    let origins: Vec<String> = sorted
        .iter()
        .map(|descriptor| {
            load_cube(&descriptor.path, None)
                .unwrap()
                .time_coord()
                .and_then(|c| c.time_unit())
                .map(|u| u.origin_string())
                .unwrap()
        })
        .collect();

    assert_eq!(
        origins,
        vec![
            "hours since 1970-01-01 00:00:00",
            "hours since 1980-01-01 00:00:00",
            "hours since 1990-01-01 00:00:00",
        ]
    );
    assert_eq!(sorted[0].earliest.hours_since_epoch, 394_200.0);
    assert_eq!(sorted[1].earliest.hours_since_epoch, 394_212.0);
    assert_eq!(sorted[2].earliest.datetime.to_string(), "2014-12-22 00:00:00");
}

#[test]
fn test_probe_file_without_time_coordinate() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("no_time.nc");
    {
        let mut file = create(&path).expect("Failed to create NetCDF file");
        file.add_dimension("x", 3).expect("Failed to add dimension x");
        let mut var = file
            .add_variable::<f32>("test_var", &["x"])
            .expect("Failed to add variable");
        let data = Array1::from(vec![1.0_f32, 2.0, 3.0]);
        var.put(data.view(), ..).expect("Failed to write data");
    }

    assert!(matches!(
        probe_file(&path),
        Err(CubeHelperError::Probe { .. })
    ));

    // Dimensions without coordinate variables get index coordinates
    let cube = load_cube(&path, None).expect("Failed to load cube");
    assert_eq!(cube.dim_coords[0].values, CoordValues::Int(vec![0, 1, 2]));
    assert_eq!(cube.dim_coords[0].unit, Unit::NoUnit);
    assert!(cube.time_coord().is_none());
}

#[test]
fn test_round_trip_preserves_cube() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("round_trip.nc");
    let mut cube = realistic_3d();
    add_categoricals(&mut cube, &["weekday", "season_membership", "year"]).unwrap();
    cube.dim_coords[0].bounds = Some(
        (0..7)
            .map(|i| {
                let point = 394_200.0 + 6.0 * f64::from(i);
                [point - 3.0, point + 3.0]
            })
            .collect(),
    );

    save_cube(&cube, &path).expect("Failed to save cube");
    let loaded = load_cube(&path, Some("air_potential_temperature")).expect("Failed to load cube");

    assert_eq!(loaded.name, cube.name);
    assert_eq!(loaded.units, "K");
    assert_eq!(loaded.data, cube.data);
    assert_eq!(loaded.dim_coords, cube.dim_coords);
    for aux in &cube.aux_coords {
        let reloaded = loaded.aux_coord(&aux.coord.name).expect("aux coordinate lost");
        assert_eq!(reloaded, aux);
    }
    assert_eq!(
        loaded.attributes.get("source"),
        Some(&AttrValue::from("Iris test case"))
    );
    match loaded.attributes.get("history") {
        Some(AttrValue::Str(history)) => assert!(history.starts_with("Created by cube_helper")),
        other => panic!("unexpected history {other:?}"),
    }
    assert!(!loaded.attributes.contains_key("Conventions"));
}

#[test]
fn test_round_trip_integer_data_with_fill_value() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("ints.nc");
    let mut cube = realistic_3d();
    cube.data = cube.data.cast(DType::Int16);
    if let CubeData::Int16(data) = &mut cube.data {
        data[[0, 0, 0]] = -999;
    }
    cube.fill_value = Some(-999.0);

    save_cube(&cube, &path).expect("Failed to save cube");
    let loaded = load_cube(&path, None).expect("Failed to load cube");

    assert_eq!(loaded.dtype(), DType::Int16);
    assert_eq!(loaded.fill_value, Some(-999.0));
    let values = loaded.data.to_f64(loaded.fill_value);
    assert!(values[[0, 0, 0]].is_nan());
    assert_eq!(values[[1, 0, 0]], 100.0);
}

#[test]
fn test_missing_variable() {
    let dir = tempdir().expect("Failed to create temp dir");
    let paths = write_cubes(dir.path(), &split_cubes()[..1]);
    let err = load_cube(&paths[0], Some("precipitation")).unwrap_err();
    assert!(matches!(err, CubeHelperError::VariableNotFound { ref var, .. } if var == "precipitation"));
}
