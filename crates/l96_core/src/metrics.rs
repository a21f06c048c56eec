//! Root-mean-square error between trajectories.

use crate::error::ShapeError;
use anyhow::{Context, Result};
use ndarray::{Array2, ArrayBase, ArrayD, Axis, Data, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RmseSettings {
    /// Axes averaged over.
    pub axes: Vec<usize>,
    /// Divide by twice the standard deviation of the reference.
    pub normalize: bool,
}

impl Default for RmseSettings {
    fn default() -> Self {
        Self {
            axes: vec![1],
            normalize: true,
        }
    }
}

/// sqrt(mean((reference - estimate)^2)) over `settings.axes`, optionally divided
/// by 2 * std(reference) over the same axes (population std).
///
/// The output keeps the non-reduced axes in their original order. A reference
/// with zero spread along the reduced axes gives a non-finite normalized value;
/// that is reported through a warning and left in the output.
pub fn rmse<S1, S2, D>(
    reference: &ArrayBase<S1, D>,
    estimate: &ArrayBase<S2, D>,
    settings: &RmseSettings,
) -> Result<ArrayD<f64>>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    if reference.shape() != estimate.shape() {
        return Err(ShapeError::Mismatch {
            expected: reference.shape().to_vec(),
            actual: estimate.shape().to_vec(),
        }
        .into());
    }

    let rank = reference.ndim();
    let mut reduced = vec![false; rank];
    for &axis in &settings.axes {
        if axis >= rank {
            return Err(ShapeError::AxisOutOfBounds { axis, rank }.into());
        }
        if reduced[axis] {
            return Err(ShapeError::DuplicateAxis(axis).into());
        }
        reduced[axis] = true;
    }

    let kept: Vec<usize> = (0..rank).filter(|&axis| !reduced[axis]).collect();
    let order: Vec<usize> = kept.iter().chain(settings.axes.iter()).copied().collect();
    let out_shape: Vec<usize> = kept.iter().map(|&axis| reference.shape()[axis]).collect();
    let rows: usize = out_shape.iter().product();
    let cols: usize = settings
        .axes
        .iter()
        .map(|&axis| reference.shape()[axis])
        .product();

    // Kept axes lead, reduced axes are folded into a single trailing one.
    let to_rows = |values: ArrayD<f64>| -> Result<Array2<f64>> {
        values
            .permuted_axes(IxDyn(&order))
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((rows, cols))
            .context("Failed to group the reduced axes.")
    };
    let ref_rows = to_rows(reference.to_owned().into_dyn())?;
    let est_rows = to_rows(estimate.to_owned().into_dyn())?;

    let mut values = (&ref_rows - &est_rows)
        .mapv(|d| d * d)
        .mean_axis(Axis(1))
        .context("Cannot average over an empty axis.")?
        .mapv(f64::sqrt);

    if settings.normalize {
        let spread = ref_rows.std_axis(Axis(1), 0.0);
        let zero_spread = spread.iter().filter(|&&s| s == 0.0).count();
        if zero_spread > 0 {
            warn!(
                count = zero_spread,
                axes = ?settings.axes,
                "reference has zero spread along the reduced axes; normalized RMSE is not finite"
            );
        }
        values /= &spread.mapv(|s| 2.0 * s);
    }

    values
        .into_shape_with_order(IxDyn(&out_shape))
        .context("Failed to shape the RMSE output.")
}

#[cfg(test)]
mod tests {
    use super::{rmse, RmseSettings};
    use crate::error::ShapeError;
    use ndarray::{arr2, Array, Array2, Array3, Axis};
    use proptest::prelude::*;

    fn settings(axes: &[usize], normalize: bool) -> RmseSettings {
        RmseSettings {
            axes: axes.to_vec(),
            normalize,
        }
    }

    #[test]
    fn normalized_error_divides_by_twice_the_reference_spread() {
        let reference = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let estimate = &reference + 1.0;

        let raw = rmse(&reference, &estimate, &settings(&[1], false)).expect("raw");
        let normalized = rmse(&reference, &estimate, &RmseSettings::default()).expect("normalized");

        assert_eq!(raw.shape(), &[2]);
        let spread = (2.0f64 / 3.0).sqrt();
        for (r, n) in raw.iter().zip(normalized.iter()) {
            assert!((r - 1.0).abs() < 1e-12);
            assert!((n - r / (2.0 * spread)).abs() < 1e-12);
        }
    }

    #[test]
    fn reduces_over_the_leading_axis() {
        let reference = arr2(&[[0.0, 1.0], [2.0, 5.0]]);
        let estimate = arr2(&[[1.0, 1.0], [2.0, 1.0]]);
        let out = rmse(&reference, &estimate, &settings(&[0], false)).expect("rmse");
        assert_eq!(out.shape(), &[2]);
        assert!((out[[0]] - 0.5f64.sqrt()).abs() < 1e-12);
        assert!((out[[1]] - 8.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn reduces_over_several_axes() {
        let reference = Array3::from_shape_fn((2, 3, 4), |(k, n, m)| (k * 12 + n * 4 + m) as f64);
        let estimate = Array3::from_shape_fn((2, 3, 4), |(k, n, m)| {
            (k * 12 + n * 4 + m) as f64 + if k == 0 { 2.0 } else { 0.5 * m as f64 }
        });
        let out = rmse(&reference, &estimate, &settings(&[2, 1], false)).expect("rmse");
        assert_eq!(out.shape(), &[2]);
        assert!((out[[0]] - 2.0).abs() < 1e-12);
        // mean of (0.5 m)^2 over m = 0..4 is 0.25 * 14 / 4
        assert!((out[[1]] - (0.25f64 * 14.0 / 4.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn outer_axes_match_per_slice_statistics() {
        let reference = Array3::from_shape_fn((3, 4, 5), |(k, n, m)| {
            ((k * 7 + n * 3 + m * m) % 11) as f64 - 4.0
        });
        let estimate = reference.mapv(|v| 0.5 * v + 1.0);
        let out = rmse(&reference, &estimate, &settings(&[0, 2], true)).expect("rmse");
        assert_eq!(out.shape(), &[4]);

        for n in 0..4 {
            let a = reference.index_axis(Axis(1), n);
            let b = estimate.index_axis(Axis(1), n);
            let mse = (&a - &b).mapv(|d| d * d).mean().expect("mean");
            let expected = mse.sqrt() / (2.0 * a.std(0.0));
            assert!((out[[n]] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_an_empty_reduced_axis() {
        let a = Array2::<f64>::zeros((2, 0));
        let err = rmse(&a, &a, &RmseSettings::default()).expect_err("empty axis");
        assert!(err.to_string().contains("Cannot average over an empty axis"));
    }

    #[test]
    fn zero_spread_reference_is_not_finite() {
        let reference = arr2(&[[3.0, 3.0, 3.0]]);
        let estimate = arr2(&[[3.0, 4.0, 3.0]]);
        let out = rmse(&reference, &estimate, &RmseSettings::default()).expect("rmse");
        assert!(out[[0]].is_infinite());

        let same = rmse(&reference, &reference, &RmseSettings::default()).expect("rmse");
        assert!(same[[0]].is_nan());
    }

    #[test]
    fn rejects_bad_inputs() {
        let a = Array2::<f64>::zeros((2, 3));
        let b = Array2::<f64>::zeros((3, 2));
        let err = rmse(&a, &b, &RmseSettings::default()).expect_err("shape mismatch");
        assert_eq!(
            err.downcast_ref::<ShapeError>(),
            Some(&ShapeError::Mismatch {
                expected: vec![2, 3],
                actual: vec![3, 2],
            })
        );

        let err = rmse(&a, &a, &settings(&[2], true)).expect_err("axis bounds");
        assert_eq!(
            err.downcast_ref::<ShapeError>(),
            Some(&ShapeError::AxisOutOfBounds { axis: 2, rank: 2 })
        );

        let err = rmse(&a, &a, &settings(&[1, 1], true)).expect_err("duplicate axis");
        assert_eq!(
            err.downcast_ref::<ShapeError>(),
            Some(&ShapeError::DuplicateAxis(1))
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]
        #[test]
        fn prop_self_distance_is_zero(
            rows in 1usize..6,
            cols in 1usize..6,
            values in prop::collection::vec(-50.0f64..50.0, 36),
            axis in 0usize..2,
        ) {
            let x = Array::from_shape_vec((rows, cols), values[..rows * cols].to_vec())
                .expect("shape");
            let out = rmse(&x, &x, &settings(&[axis], false)).expect("rmse");
            prop_assert_eq!(out.len(), if axis == 0 { cols } else { rows });
            prop_assert!(out.iter().all(|&v| v == 0.0));
        }
    }
}
