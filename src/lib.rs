// Subspace comparison and volume utilities for cryo-EM reconstruction

#![doc = include_str!("../README.md")]

use std::error::Error;

pub mod batching;
pub mod dataset;
pub mod linalg_backends;
pub mod memory;
pub mod mrc;
pub mod options;
pub mod subspace;
pub mod variance;
pub mod volume;


/// A thread-safe wrapper for standard dynamic errors,
/// so they implement `Send` and `Sync`.
pub type ThreadSafeStdError = Box<dyn Error + Send + Sync + 'static>;

pub use subspace::{
    find_angle_between_subspaces, find_angle_between_subspaces_report, subspace_angles, SubspaceAngleReport,
    CONDITIONING_WARNING_THRESHOLD, SENTINEL_DISTANCE,
};
pub use variance::estimate_variance;
pub use mrc::{load_mrc, write_mrc};
pub use volume::symmetrize_ft_volume;
