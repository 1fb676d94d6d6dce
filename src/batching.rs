// src/batching.rs

//! Empirical batch sizes that keep a pass within `gpu_memory` GB of device
//! memory. The constants were tuned on a 38 GB device; sizes scale linearly
//! with the memory budget. Memory can grow like
//! `O(vol_batch_size * image_batch_size)`, so the two are sized independently.

use ndarray::{ArrayBase, Data, Dimension};

use crate::memory::get_size_in_gb;

const REFERENCE_GPU_MEMORY_GB: f64 = 38.0;
const REFERENCE_GRID_SIZE: f64 = 256.0;

fn scaled_by_memory(base: f64, gpu_memory: f64) -> usize {
    (base * gpu_memory / REFERENCE_GPU_MEMORY_GB) as usize
}

/// Images per batch for a `grid_size`² image stack.
pub fn get_image_batch_size(grid_size: usize, gpu_memory: f64) -> usize {
    let base = 2.0 * 2f64.powi(24) / (grid_size as f64).powi(2);
    scaled_by_memory(base, gpu_memory)
}

/// Volumes per batch for a `grid_size`³ volume.
pub fn get_vol_batch_size(grid_size: usize, gpu_memory: f64) -> usize {
    let base = 25.0 * (REFERENCE_GRID_SIZE / grid_size as f64).powi(3);
    scaled_by_memory(base, gpu_memory)
}

/// Basis columns per batch for a `grid_size`³ volume.
pub fn get_column_batch_size(grid_size: usize, gpu_memory: f64) -> usize {
    let base = 50.0 * (REFERENCE_GRID_SIZE / grid_size as f64).powi(3);
    scaled_by_memory(base, gpu_memory)
}

/// Batch size for evaluating a latent density at `test_points` in a
/// `zdim`-dimensional latent space. Never below 1.
pub fn get_latent_density_batch_size<S, D>(test_points: &ArrayBase<S, D>, zdim: usize, gpu_memory: f64) -> usize
where
    S: Data,
    D: Dimension,
{
    let estimate = gpu_memory / 3.0 * (get_size_in_gb(test_points) * (zdim * zdim) as f64);
    (estimate as usize).max(1)
}
