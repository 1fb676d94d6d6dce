// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use ndarray_linalg::{Lapack, Scalar, QR as NdLinalgQR, SVDInto as NdLinalgSVDInto};
use std::error::Error;

use crate::ThreadSafeStdError;

/// Output of a Singular Value Decomposition.
///
/// Singular values are real even for complex input and come back sorted in
/// descending order (LAPACK `*gesdd` convention).
#[derive(Debug)]
pub struct SVDOutput<A: Scalar> {
    pub u: Option<Array2<A>>,
    pub s: Array1<A::Real>,
    pub vt: Option<Array2<A>>,
}

/// Trait for Singular Value Decomposition.
pub trait BackendSVD<A: Scalar> {
    fn svd_into(&self, matrix: Array2<A>, compute_u: bool, compute_v: bool) -> Result<SVDOutput<A>, ThreadSafeStdError>;
}

/// Trait for QR decomposition, focusing on retrieving the Q factor.
pub trait BackendQR<A: Scalar> {
    fn qr_q_factor(&self, matrix: &Array2<A>) -> Result<Array2<A>, ThreadSafeStdError>;
}

/// LAPACK-backed implementation through `ndarray-linalg`.
///
/// Works for every scalar LAPACK supports (`f32`, `f64`, `c32`, `c64`); the
/// provider itself is chosen by the `backend_*` cargo features.
#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

// Helper to convert ndarray-linalg's error to Box<dyn Error + Send + Sync>
fn to_dyn_error<E: Error + Send + Sync + 'static>(e: E) -> ThreadSafeStdError {
    Box::new(e)
}

impl<A> BackendSVD<A> for NdarrayLinAlgBackend
where
    A: Scalar + Lapack,
{
    fn svd_into(&self, matrix: Array2<A>, compute_u: bool, compute_v: bool) -> Result<SVDOutput<A>, ThreadSafeStdError> {
        let (nrows, ncols) = matrix.dim();
        if matrix.is_empty() {
            let k_dim = nrows.min(ncols);
            return Ok(SVDOutput {
                u: if compute_u { Some(Array2::zeros((nrows, k_dim))) } else { None },
                s: Array1::zeros(k_dim),
                vt: if compute_v { Some(Array2::zeros((k_dim, ncols))) } else { None },
            });
        }
        let (u, s, vt) = matrix.svd_into(compute_u, compute_v).map_err(to_dyn_error)?;
        Ok(SVDOutput { u, s, vt })
    }
}

impl<A> BackendQR<A> for NdarrayLinAlgBackend
where
    A: Scalar + Lapack,
{
    fn qr_q_factor(&self, matrix: &Array2<A>) -> Result<Array2<A>, ThreadSafeStdError> {
        let (nrows, ncols) = matrix.dim();
        if nrows == 0 || ncols == 0 {
            return Ok(Array2::zeros((nrows, nrows.min(ncols))));
        }
        let (q_factor, _r) = matrix.qr().map_err(to_dyn_error)?;
        Ok(q_factor)
    }
}

/// Orthonormalizes the columns of `basis` with a thin QR decomposition.
///
/// Callers holding a merely linearly independent basis can run it through here
/// before comparing subspaces; the span is unchanged.
pub fn orthonormalize_columns<A, B>(backend: &B, basis: &Array2<A>) -> Result<Array2<A>, ThreadSafeStdError>
where
    A: Scalar,
    B: BackendQR<A>,
{
    if basis.nrows() < basis.ncols() {
        return Err(format!(
            "Cannot orthonormalize {} columns in a {}-dimensional space.",
            basis.ncols(),
            basis.nrows()
        )
        .into());
    }
    backend.qr_q_factor(basis)
}
