//! NaN-skipping axis folds and the parallel group driver
//!
//! An output cell whose inputs are all NaN is NaN for every reducer.

use super::operations::{AxisReduction, Reducer};
use crate::errors::Result;
use ndarray::{ArrayD, ArrayViewD, Axis};
use rayon::prelude::*;
use tracing::debug;

/// Mean along `axis` over finite values
pub fn nan_mean_axis(data: &ArrayD<f64>, axis: usize) -> ArrayD<f64> {
    data.fold_axis(Axis(axis), (0.0_f64, 0_u32), |&(sum, count), &x| {
        if x.is_finite() {
            (sum + x, count + 1)
        } else {
            (sum, count)
        }
    })
    .mapv(|(sum, count)| {
        if count > 0 {
            sum / f64::from(count)
        } else {
            f64::NAN
        }
    })
}

/// Sum along `axis` over finite values
pub fn nan_sum_axis(data: &ArrayD<f64>, axis: usize) -> ArrayD<f64> {
    data.fold_axis(Axis(axis), None, |&acc: &Option<f64>, &x| {
        if x.is_finite() {
            Some(acc.unwrap_or(0.0) + x)
        } else {
            acc
        }
    })
    .mapv(|acc| acc.unwrap_or(f64::NAN))
}

/// Minimum along `axis` over finite values
pub fn nan_min_axis(data: &ArrayD<f64>, axis: usize) -> ArrayD<f64> {
    data.fold_axis(Axis(axis), f64::INFINITY, |&acc, &x| {
        if x.is_finite() {
            acc.min(x)
        } else {
            acc
        }
    })
    .mapv(|x| if x == f64::INFINITY { f64::NAN } else { x })
}

/// Maximum along `axis` over finite values
pub fn nan_max_axis(data: &ArrayD<f64>, axis: usize) -> ArrayD<f64> {
    data.fold_axis(Axis(axis), f64::NEG_INFINITY, |&acc, &x| {
        if x.is_finite() {
            acc.max(x)
        } else {
            acc
        }
    })
    .mapv(|x| if x == f64::NEG_INFINITY { f64::NAN } else { x })
}

/// Reduce each group of indices along `axis`, one output slice per group.
///
/// Groups are reduced in parallel on the rayon pool and stacked in the
/// order given.
///
/// # Errors
///
/// Returns an error if `axis` is out of bounds or `groups` is empty.
pub fn reduce_groups(
    data: &ArrayD<f64>,
    axis: usize,
    groups: &[Vec<usize>],
    reducer: Reducer,
) -> Result<ArrayD<f64>> {
    debug!(
        groups = groups.len(),
        threads = rayon::current_num_threads(),
        reducer = reducer.as_str(),
        "reducing groups"
    );

    let slices = groups
        .par_iter()
        .map(|indices| {
            data.select(Axis(axis), indices)
                .reduce_along_axis(axis, reducer)
                .map(|reduced| reduced.insert_axis(Axis(axis)))
        })
        .collect::<Result<Vec<_>>>()?;

    let views: Vec<ArrayViewD<'_, f64>> = slices.iter().map(ArrayD::view).collect();
    Ok(ndarray::concatenate(Axis(axis), &views)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn groups_are_stacked_in_order() {
        let data = array![[1.0, 10.0], [3.0, 30.0], [5.0, 50.0]].into_dyn();
        let out = reduce_groups(&data, 0, &[vec![2], vec![0, 1]], Reducer::Mean).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out[[0, 0]], 5.0);
        assert_eq!(out[[1, 0]], 2.0);
        assert_eq!(out[[1, 1]], 20.0);
    }

    #[test]
    fn all_nan_sum_is_nan() {
        let data = array![f64::NAN, f64::NAN].into_dyn();
        let sum = nan_sum_axis(&data, 0);
        assert_eq!(sum.len(), 1);
        assert!(sum.iter().all(|v| v.is_nan()));
    }
}
