// src/volume.rs

use ndarray::{s, Array1, ArrayView1};
use ndarray_linalg::Scalar;

use crate::ThreadSafeStdError;

/// Enforces Hermitian symmetry on a flattened Fourier volume.
///
/// The volume is viewed with shape `volume_shape`; on the block `[1:, 1:, 1:]`
/// every coefficient `v` is replaced by `0.5 * (conj(flip(v)) + v)`, where
/// `flip` reverses all three axes of that block. The first plane along each
/// axis (the unpaired Nyquist row of an even-sized grid) is left untouched.
/// The result is returned flat, like the input.
///
/// # Errors
/// Returns an error if `vol.len()` does not equal the product of `volume_shape`.
pub fn symmetrize_ft_volume<A>(vol: ArrayView1<'_, A>, volume_shape: [usize; 3]) -> Result<Array1<A>, ThreadSafeStdError>
where
    A: Scalar,
{
    let mut volume = vol
        .to_owned()
        .into_shape_with_order(volume_shape)
        .map_err(|e| format!("Cannot view a volume of {} voxels as {:?}: {}", vol.len(), volume_shape, e))?;

    let half = A::from_real(A::real(0.5));
    let symmetrized = {
        let block = volume.slice(s![1.., 1.., 1..]);
        let flipped = volume.slice(s![1..;-1, 1..;-1, 1..;-1]);
        let mut out = flipped.mapv(|x| x.conj());
        out.zip_mut_with(&block, |o, &b| *o = (*o + b) * half);
        out
    };
    volume.slice_mut(s![1.., 1.., 1..]).assign(&symmetrized);

    let n_voxels = volume.len();
    volume
        .into_shape_with_order(n_voxels)
        .map_err(|e| Box::new(e) as ThreadSafeStdError)
}

/// Edge length of the cubic grid holding `vol_size` voxels.
pub fn guess_grid_size_from_vol_size(vol_size: usize) -> usize {
    (vol_size as f64).cbrt().round() as usize
}

/// Cubic volume shape holding `vol_size` voxels.
pub fn guess_vol_shape_from_vol_size(vol_size: usize) -> [usize; 3] {
    [guess_grid_size_from_vol_size(vol_size); 3]
}
