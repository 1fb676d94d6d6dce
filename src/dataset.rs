// src/dataset.rs

use ndarray::{Array1, ArrayView1};

/// A dataset split that remembers which rows of the full particle stack it holds.
pub trait IndexedDataset {
    fn dataset_indices(&self) -> ArrayView1<'_, usize>;
}

/// Concatenates the dataset indices of every split, in order.
pub fn get_all_dataset_indices<T: IndexedDataset>(datasets: &[T]) -> Array1<usize> {
    datasets
        .iter()
        .flat_map(|dataset| dataset.dataset_indices().to_vec())
        .collect()
}

/// Permutation that maps positions in the original stack to positions in the
/// concatenation returned by [`get_all_dataset_indices`].
///
/// Ties keep their concatenation order.
pub fn get_inverse_dataset_indices<T: IndexedDataset>(datasets: &[T]) -> Array1<usize> {
    let all_indices = get_all_dataset_indices(datasets);
    let mut order: Vec<usize> = (0..all_indices.len()).collect();
    order.sort_by_key(|&position| all_indices[position]);
    Array1::from_vec(order)
}
