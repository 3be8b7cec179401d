//! Merging and chronological ordering of in-memory cubes

mod common;

use common::{hours_since, realistic_3d, split_cubes, split_cubes_with_epochs, time_points};
use cube_helper::aggregate::{aggregate_by, Reducer};
use cube_helper::categorical::add_categorical;
use cube_helper::cube::{AttrValue, Coord, CoordValues, Cube, CubeData, DType, Unit};
use cube_helper::equaliser::equalise_time_units;
use cube_helper::errors::{CubeHelperError, MergeConflictKind};
use cube_helper::loader::concatenate;
use cube_helper::merger::merge;
use cube_helper::probe::probe_cube;
use cube_helper::sorter::{chronological_order, sort_by_earliest};

fn origin(cube: &Cube) -> String {
    cube.time_coord()
        .and_then(|c| c.time_unit())
        .map(|u| u.origin_string())
        .expect("cube has no time unit")
}

fn conflict_kind(result: cube_helper::Result<Cube>) -> (usize, MergeConflictKind) {
    match result {
        Err(CubeHelperError::MergeConflict { index, kind, .. }) => (index, kind),
        other => panic!("expected a merge conflict, got {other:?}"),
    }
}

#[test]
fn test_sort_by_earliest_date() {
    let permutations = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for permutation in permutations {
        let cubes = split_cubes_with_epochs();
        let shuffled: Vec<Cube> = permutation.iter().map(|&i| cubes[i].clone()).collect();

        let sorted = sort_by_earliest(shuffled).expect("Failed to sort cubes");

        assert_eq!(origin(&sorted[0]), "hours since 1970-01-01 00:00:00");
        assert_eq!(origin(&sorted[1]), "hours since 1980-01-01 00:00:00");
        assert_eq!(origin(&sorted[2]), "hours since 1990-01-01 00:00:00");
    }
}

#[test]
fn test_sort_is_stable_for_equal_earliest_times() {
    let mut cubes = split_cubes();
    cubes.insert(0, cubes[2].clone().with_attribute("copy", "yes"));
    assert_eq!(chronological_order(&cubes).unwrap(), vec![1, 2, 0, 3]);
}

#[test]
fn test_probe_reports_missing_time_coordinate() {
    let mut cube = realistic_3d();
    cube.dim_coords[0].unit = cube_helper::cube::Unit::Named("hours".to_string());
    assert!(matches!(probe_cube(&cube), Err(CubeHelperError::Probe { .. })));
    assert!(matches!(
        sort_by_earliest(vec![realistic_3d(), cube]),
        Err(CubeHelperError::Probe { .. })
    ));
}

#[test]
fn test_merge_restores_the_series() {
    let merged = merge(split_cubes()).expect("Failed to merge cubes");
    let base = realistic_3d();

    assert_eq!(merged.shape(), base.shape());
    assert_eq!(merged.data, base.data);
    assert_eq!(merged.dim_coords, base.dim_coords);
    assert_eq!(merged.aux_coords, base.aux_coords);
}

#[test]
fn test_merge_single_and_empty_inputs() {
    let cube = realistic_3d();
    assert_eq!(merge(cube.clone()).unwrap(), cube);
    assert_eq!(merge(vec![cube.clone()]).unwrap(), cube);
    assert!(matches!(
        merge(Vec::<Cube>::new()),
        Err(CubeHelperError::EmptyInput { .. })
    ));
}

#[test]
fn test_merge_keeps_overlapping_points() {
    let cubes = split_cubes();
    let merged = merge(vec![cubes[0].clone(), cubes[0].clone()]).unwrap();
    assert_eq!(time_points(&merged), vec![394_200.0, 394_206.0, 394_200.0, 394_206.0]);
}

#[test]
fn test_merge_rejects_unequalised_time_units() {
    let (index, kind) = conflict_kind(merge(split_cubes_with_epochs()));
    assert_eq!(index, 1);
    assert!(matches!(kind, MergeConflictKind::TimeUnit { .. }));

    let mut cubes = split_cubes_with_epochs();
    equalise_time_units(&mut cubes).unwrap();
    assert_eq!(time_points(&merge(cubes).unwrap()).len(), 7);
}

#[test]
fn test_merge_rejects_attribute_mismatch() {
    let mut cubes = split_cubes();
    cubes[2]
        .attributes
        .insert("title".to_string(), AttrValue::from("other"));

    let (index, kind) = conflict_kind(merge(cubes));
    assert_eq!(index, 2);
    assert_eq!(
        kind,
        MergeConflictKind::Attribute {
            key: "title".to_string(),
            expected: "realistic 3d".to_string(),
            found: "other".to_string(),
        }
    );
}

#[test]
fn test_merge_rejects_dtype_and_shape_mismatch() {
    let mut cubes = split_cubes();
    cubes[1].data = cubes[1].data.cast(DType::Float64);
    let (index, kind) = conflict_kind(merge(cubes));
    assert_eq!(index, 1);
    assert!(matches!(kind, MergeConflictKind::DType { .. }));

    let mut cubes = split_cubes();
    cubes[1] = cubes[1].extract(1, &[0, 1]);
    let (_, kind) = conflict_kind(merge(cubes));
    assert!(matches!(kind, MergeConflictKind::Shape { .. }));
}

#[test]
fn test_merge_error_names_source_file() {
    let mut cubes = split_cubes();
    cubes[1] = cubes[1].clone().with_source("temp_2.nc");
    cubes[1].units = "degC".to_string();
    let err = merge(cubes).unwrap_err();
    assert!(err.to_string().contains("temp_2.nc"));
}

#[test]
fn test_concatenate() {
    let mut cubes = split_cubes_with_epochs();
    cubes.reverse();
    cubes[0]
        .attributes
        .insert("history".to_string(), AttrValue::from("late"));

    let merged = concatenate(cubes).expect("Failed to concatenate cubes");

    assert_eq!(origin(&merged), "hours since 1970-01-01 00:00:00");
    assert_eq!(
        time_points(&merged),
        (0..7).map(|i| 394_200.0 + 6.0 * i as f64).collect::<Vec<_>>()
    );
    assert!(!merged.attributes.contains_key("history"));
    assert_eq!(concatenate(realistic_3d()).unwrap(), realistic_3d());
}

/// `split_cubes` with every entry of the second cube masked by a -999 fill value
fn split_cubes_with_masked_middle() -> Vec<Cube> {
    let mut cubes = split_cubes();
    if let CubeData::Float32(data) = &mut cubes[1].data {
        data.fill(-999.0);
    }
    cubes[1].fill_value = Some(-999.0);
    cubes
}

#[test]
fn test_merge_rejects_fill_value_mismatch() {
    let (index, kind) = conflict_kind(merge(split_cubes_with_masked_middle()));
    assert_eq!(index, 1);
    assert_eq!(
        kind,
        MergeConflictKind::FillValue {
            expected: None,
            found: Some(-999.0),
        }
    );
}

#[test]
fn test_concatenate_keeps_masked_entries_masked() {
    let mut merged =
        concatenate(split_cubes_with_masked_middle()).expect("Failed to concatenate cubes");
    assert_eq!(merged.fill_value, None);
    match &merged.data {
        CubeData::Float32(data) => {
            assert!(data[[2, 0, 0]].is_nan());
            assert!(data[[3, 2, 3]].is_nan());
            assert_eq!(data[[4, 0, 0]], 400.0);
        }
        other => panic!("unexpected dtype {}", other.dtype()),
    }

    add_categorical(&mut merged, "clim_season").unwrap();
    let mean = aggregate_by(&merged, &["clim_season"], Reducer::Mean).unwrap();
    // Mean of 100 t over the unmasked t = 0, 1, 4, 5, 6
    match &mean.data {
        CubeData::Float32(data) => {
            assert_eq!(data[[0, 0, 0]], 320.0);
            assert_eq!(data[[0, 2, 3]], 343.0);
        }
        other => panic!("unexpected dtype {}", other.dtype()),
    }
}

#[test]
fn test_merge_integer_time_points_with_converted_ones() {
    let mut cubes = split_cubes_with_epochs();
    let points = vec![394_200, 394_206];
    cubes[0].dim_coords[0] = Coord::new(
        "time",
        Unit::Time(hours_since(1970)),
        CoordValues::Int(points),
    );

    equalise_time_units(&mut cubes).expect("Failed to equalise time units");
    let merged = merge(cubes).expect("Failed to merge cubes");

    assert_eq!(
        time_points(&merged),
        (0..7).map(|i| 394_200.0 + 6.0 * i as f64).collect::<Vec<_>>()
    );
    assert!(matches!(merged.dim_coords[0].values, CoordValues::Float(_)));
}
