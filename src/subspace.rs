// src/subspace.rs

//! Principal-angle comparison of two column bases.
//!
//! The cosines of the principal angles between `span(A)` and `span(B)` are the
//! singular values of `Aᴴ B` when both bases are orthonormal. The score used
//! throughout this crate is the sine of the largest principal angle,
//! `sqrt(1 - σ_min²)`, which is 0 for identical subspaces and 1 as soon as one
//! direction of one subspace is orthogonal to the other.

use ndarray::{s, Array1, ArrayView2};
use ndarray_linalg::{Lapack, Scalar};
use num_traits::ToPrimitive;
use log::{debug, trace, warn};

use crate::linalg_backends::{BackendSVD, NdarrayLinAlgBackend};
use crate::ThreadSafeStdError;

/// Singular values above this are reported as a sign that the inputs are not
/// orthonormal. The computation still proceeds with clamped values.
pub const CONDITIONING_WARNING_THRESHOLD: f64 = 1.2;

/// Score assigned to ranks that `basis_a` cannot reach in [`subspace_angles`].
pub const SENTINEL_DISTANCE: f64 = 1.0;

/// Full outcome of one rank-`k` comparison.
#[derive(Debug, Clone)]
pub struct SubspaceAngleReport {
    /// Number of leading columns compared.
    pub rank: usize,
    /// `sqrt(1 - σ_min²)` after clamping; lies in `[0, 1]`.
    pub sine_of_largest_angle: f64,
    /// Singular values of the cross-correlation, descending, before clamping.
    pub singular_values: Array1<f64>,
    /// Set when any singular value exceeded [`CONDITIONING_WARNING_THRESHOLD`].
    pub ill_conditioned: bool,
}

impl SubspaceAngleReport {
    /// Principal angles in radians, smallest first.
    pub fn principal_angles(&self) -> Array1<f64> {
        self.singular_values.mapv(|cosine| cosine.clamp(0.0, 1.0).acos())
    }
}

fn is_finite_scalar<A: Scalar>(x: &A) -> bool {
    [x.re(), x.im()]
        .iter()
        .all(|part| part.to_f64().map_or(false, f64::is_finite))
}

/// Sine of the largest principal angle between the spans of the first
/// `max_rank` columns of `basis_a` and `basis_b`.
///
/// Singular values of `conj(A)ᵀ B` above 1 are clamped to 1 so the result is
/// always real. A value above [`CONDITIONING_WARNING_THRESHOLD`] is logged as a
/// warning and does not abort the computation.
///
/// # Errors
/// Returns an error if `max_rank` is zero or exceeds either basis's column
/// count, if the bases live in spaces of different dimension, or if the SVD
/// fails or yields non-finite values.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use cryo_subspace::find_angle_between_subspaces;
///
/// let a = array![[1.0_f64, 0.0], [0.0, 1.0], [0.0, 0.0]];
/// let b = array![[1.0_f64, 0.0], [0.0, 0.0], [0.0, 1.0]];
/// assert!(find_angle_between_subspaces(a.view(), a.view(), 2).unwrap() < 1e-12);
/// assert!((find_angle_between_subspaces(a.view(), b.view(), 2).unwrap() - 1.0).abs() < 1e-12);
/// ```
pub fn find_angle_between_subspaces<A>(
    basis_a: ArrayView2<'_, A>,
    basis_b: ArrayView2<'_, A>,
    max_rank: usize,
) -> Result<f64, ThreadSafeStdError>
where
    A: Scalar + Lapack,
{
    find_angle_between_subspaces_report(basis_a, basis_b, max_rank).map(|report| report.sine_of_largest_angle)
}

/// Same as [`find_angle_between_subspaces`] but returns the annotated report,
/// including the raw singular values and the ill-conditioning flag.
pub fn find_angle_between_subspaces_report<A>(
    basis_a: ArrayView2<'_, A>,
    basis_b: ArrayView2<'_, A>,
    max_rank: usize,
) -> Result<SubspaceAngleReport, ThreadSafeStdError>
where
    A: Scalar + Lapack,
{
    find_angle_between_subspaces_with_backend(&NdarrayLinAlgBackend, basis_a, basis_b, max_rank)
}

/// Comparator core, parameterized over the SVD backend.
pub fn find_angle_between_subspaces_with_backend<A, B>(
    backend: &B,
    basis_a: ArrayView2<'_, A>,
    basis_b: ArrayView2<'_, A>,
    max_rank: usize,
) -> Result<SubspaceAngleReport, ThreadSafeStdError>
where
    A: Scalar,
    B: BackendSVD<A>,
{
    if max_rank == 0 {
        return Err("max_rank must be at least 1.".into());
    }
    if basis_a.nrows() != basis_b.nrows() {
        return Err(format!(
            "Bases live in spaces of different dimension: {} vs {} rows.",
            basis_a.nrows(),
            basis_b.nrows()
        )
        .into());
    }
    if max_rank > basis_a.ncols() || max_rank > basis_b.ncols() {
        return Err(format!(
            "max_rank ({}) exceeds available columns (basis_a: {}, basis_b: {}).",
            max_rank,
            basis_a.ncols(),
            basis_b.ncols()
        )
        .into());
    }

    let leading_a = basis_a.slice(s![.., ..max_rank]);
    let leading_b = basis_b.slice(s![.., ..max_rank]);
    let cross_correlation = leading_a.t().mapv(|x| x.conj()).dot(&leading_b);
    if !cross_correlation.iter().all(is_finite_scalar) {
        return Err(format!("Cross-correlation at rank {} is not finite; inputs contain NaN or infinity.", max_rank).into());
    }

    let svd_output = backend.svd_into(cross_correlation, false, false)?;
    let singular_values = svd_output
        .s
        .iter()
        .map(|sigma| sigma.to_f64().unwrap_or(f64::NAN))
        .collect::<Array1<f64>>();
    trace!("Rank {} cross-correlation singular values: {:?}", max_rank, singular_values);

    if singular_values.iter().any(|sigma| !sigma.is_finite()) {
        return Err(format!(
            "SVD of the rank-{} cross-correlation produced non-finite singular values.",
            max_rank
        )
        .into());
    }

    let largest = singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let ill_conditioned = largest > CONDITIONING_WARNING_THRESHOLD;
    if ill_conditioned {
        warn!(
            "Singular value {:.4} of the rank-{} cross-correlation exceeds {}; bases are not orthonormal. Clamping to 1.",
            largest, max_rank, CONDITIONING_WARNING_THRESHOLD
        );
    }

    // The last singular value is the worst-aligned direction.
    let smallest = singular_values
        .iter()
        .last()
        .copied()
        .ok_or("SVD of the cross-correlation returned no singular values.")?
        .min(1.0);
    let sine_of_largest_angle = (1.0 - smallest * smallest).max(0.0).sqrt();

    Ok(SubspaceAngleReport {
        rank: max_rank,
        sine_of_largest_angle,
        singular_values,
        ill_conditioned,
    })
}

/// Rank sweep of [`find_angle_between_subspaces`].
///
/// Entry `k - 1` holds the score of the first `k` columns of both bases, for
/// `k` in `1..=max_rank`. `max_rank` defaults to the column count of
/// `basis_a`. Ranks beyond that column count are not computed; their entries
/// are exactly [`SENTINEL_DISTANCE`].
///
/// # Errors
/// Propagates the first comparator error, e.g. when `basis_b` has fewer
/// columns than a rank that `basis_a` can still reach.
pub fn subspace_angles<A>(
    basis_a: ArrayView2<'_, A>,
    basis_b: ArrayView2<'_, A>,
    max_rank: Option<usize>,
) -> Result<Array1<f64>, ThreadSafeStdError>
where
    A: Scalar + Lapack,
{
    subspace_angles_with_backend(&NdarrayLinAlgBackend, basis_a, basis_b, max_rank)
}

/// [`subspace_angles`] with an explicit SVD backend.
pub fn subspace_angles_with_backend<A, B>(
    backend: &B,
    basis_a: ArrayView2<'_, A>,
    basis_b: ArrayView2<'_, A>,
    max_rank: Option<usize>,
) -> Result<Array1<f64>, ThreadSafeStdError>
where
    A: Scalar,
    B: BackendSVD<A>,
{
    let available_rank = basis_a.ncols();
    let max_rank = max_rank.unwrap_or(available_rank);

    let mut scores = Array1::<f64>::zeros(max_rank);
    for rank in 1..=max_rank {
        scores[rank - 1] = if rank > available_rank {
            SENTINEL_DISTANCE
        } else {
            find_angle_between_subspaces_with_backend(backend, basis_a, basis_b, rank)?.sine_of_largest_angle
        };
    }

    if max_rank > available_rank {
        warn!(
            "Requested {} ranks but basis_a has only {} columns; ranks {}..={} set to {}.",
            max_rank,
            available_rank,
            available_rank + 1,
            max_rank,
            SENTINEL_DISTANCE
        );
    }
    debug!("Subspace angles for ranks 1..={}: {:?}", max_rank, scores);
    Ok(scores)
}
