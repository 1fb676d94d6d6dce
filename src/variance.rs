// src/variance.rs

use ndarray::{Array, ArrayView, ArrayView1, Axis, RemoveAxis};
use ndarray_linalg::Scalar;
use num_traits::ToPrimitive;
use log::debug;

use crate::ThreadSafeStdError;

/// Low-rank variance estimate `Var[x] ≈ Σ_k w_k |u_k(x)|²`.
///
/// `basis` has shape `(..., R)`: the leading axes index samples (voxels) and
/// the trailing axis indexes the `R` components. `weights` holds one
/// non-negative scale per component, aligned with the trailing axis. Complex
/// bases contribute their squared magnitude.
///
/// The returned array has the shape of `basis` with the component axis
/// removed.
///
/// # Errors
/// Returns an error if `basis` has no axes or if its trailing dimension
/// differs from `weights.len()`.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use cryo_subspace::estimate_variance;
///
/// let basis = array![[1.0_f64, 0.0], [0.0, 2.0]];
/// let variance = estimate_variance(basis.view(), array![2.0, 3.0].view()).unwrap();
/// assert_eq!(variance, array![2.0, 12.0]);
/// ```
pub fn estimate_variance<A, D>(
    basis: ArrayView<'_, A, D>,
    weights: ArrayView1<'_, f64>,
) -> Result<Array<f64, D::Smaller>, ThreadSafeStdError>
where
    A: Scalar,
    D: RemoveAxis,
{
    let component_axis = basis
        .ndim()
        .checked_sub(1)
        .map(Axis)
        .ok_or("Basis must have at least one axis.")?;
    let n_components = basis.len_of(component_axis);
    if n_components != weights.len() {
        return Err(format!(
            "Basis has {} components along its last axis but {} weights were given.",
            n_components,
            weights.len()
        )
        .into());
    }
    debug!("Estimating variance for basis of shape {:?} with {} components.", basis.shape(), n_components);

    Ok(basis.map_axis(component_axis, |components| {
        components
            .iter()
            .zip(weights.iter())
            .map(|(u, &w)| w * u.square().to_f64().unwrap_or(f64::NAN))
            .sum::<f64>()
    }))
}
