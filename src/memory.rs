// src/memory.rs

//! Host and accelerator memory reporting for diagnostic logging.
//!
//! Accelerator statistics come from whatever device runtime the caller drives,
//! through [`DeviceMemoryStats`]. All gigabyte figures are decimal (1e9 bytes)
//! and truncated toward zero.

use ndarray::{ArrayBase, Data, Dimension};
use log::info;
use std::fmt;
use sysinfo::System;

use crate::ThreadSafeStdError;

const BYTES_PER_GB: f64 = 1e9;

/// Byte counters exposed by an accelerator device.
pub trait DeviceMemoryStats {
    /// Bytes currently allocated on the device.
    fn bytes_in_use(&self) -> u64;
    /// High-water mark of allocated bytes.
    fn peak_bytes_in_use(&self) -> u64;
    /// Bytes the runtime is allowed to allocate.
    fn bytes_limit(&self) -> u64;
}

fn bytes_to_whole_gb(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_GB) as u64
}

/// Resident set size of the current process, in whole GB.
pub fn get_process_memory_used() -> Result<u64, ThreadSafeStdError> {
    let pid = sysinfo::get_current_pid().map_err(|e| format!("Unable to get current PID: {}", e))?;
    let mut sys = System::new_all();
    sys.refresh_all();
    let process = sys
        .process(pid)
        .ok_or_else(|| format!("Process {} not found in system table.", pid))?;
    Ok(bytes_to_whole_gb(process.memory()))
}

pub fn get_gpu_memory_total<S: DeviceMemoryStats + ?Sized>(device: &S) -> u64 {
    bytes_to_whole_gb(device.bytes_limit())
}

pub fn get_gpu_memory_used<S: DeviceMemoryStats + ?Sized>(device: &S) -> u64 {
    bytes_to_whole_gb(device.bytes_in_use())
}

pub fn get_peak_gpu_memory_used<S: DeviceMemoryStats + ?Sized>(device: &S) -> u64 {
    bytes_to_whole_gb(device.peak_bytes_in_use())
}

/// Snapshot of device and host memory, in whole GB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    pub gpu_in_use_gb: u64,
    pub gpu_peak_gb: u64,
    pub gpu_total_gb: u64,
    pub process_gb: u64,
}

impl MemoryReport {
    pub fn collect<S: DeviceMemoryStats + ?Sized>(device: &S) -> Result<Self, ThreadSafeStdError> {
        Ok(Self {
            gpu_in_use_gb: get_gpu_memory_used(device),
            gpu_peak_gb: get_peak_gpu_memory_used(device),
            gpu_total_gb: get_gpu_memory_total(device),
            process_gb: get_process_memory_used()?,
        })
    }
}

impl fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPU mem in use:{}; peak:{}; total available:{}, process mem in use:{}",
            self.gpu_in_use_gb, self.gpu_peak_gb, self.gpu_total_gb, self.process_gb
        )
    }
}

/// Collects a [`MemoryReport`] for `device` and logs it at info level.
pub fn report_memory_device<S: DeviceMemoryStats + ?Sized>(device: &S) -> Result<MemoryReport, ThreadSafeStdError> {
    let report = MemoryReport::collect(device)?;
    info!("{}", report);
    Ok(report)
}

/// In-memory size of an array's elements, in GB.
pub fn get_size_in_gb<S, D>(array: &ArrayBase<S, D>) -> f64
where
    S: Data,
    D: Dimension,
{
    (array.len() * std::mem::size_of::<S::Elem>()) as f64 / BYTES_PER_GB
}

/// Bytes currently allocated through jemalloc.
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
pub fn get_allocator_bytes_allocated() -> Result<usize, ThreadSafeStdError> {
    use jemalloc_ctl::{epoch, stats};
    epoch::advance().map_err(|e| format!("Failed to advance jemalloc epoch: {}", e))?;
    let allocated = stats::allocated::read().map_err(|e| format!("Failed to read jemalloc stats: {}", e))?;
    Ok(allocated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};
    use ndarray_linalg::c64;

    struct FixedDevice {
        in_use: u64,
        peak: u64,
        limit: u64,
    }

    impl DeviceMemoryStats for FixedDevice {
        fn bytes_in_use(&self) -> u64 {
            self.in_use
        }
        fn peak_bytes_in_use(&self) -> u64 {
            self.peak
        }
        fn bytes_limit(&self) -> u64 {
            self.limit
        }
    }

    #[test]
    fn device_counters_truncate_to_whole_gb() {
        let device = FixedDevice { in_use: 2_999_999_999, peak: 5_000_000_000, limit: 40_500_000_000 };
        assert_eq!(get_gpu_memory_used(&device), 2);
        assert_eq!(get_peak_gpu_memory_used(&device), 5);
        assert_eq!(get_gpu_memory_total(&device), 40);
    }

    #[test]
    fn report_formats_like_the_pipeline_log_line() {
        let report = MemoryReport { gpu_in_use_gb: 3, gpu_peak_gb: 7, gpu_total_gb: 40, process_gb: 1 };
        assert_eq!(
            report.to_string(),
            "GPU mem in use:3; peak:7; total available:40, process mem in use:1"
        );
    }

    #[test]
    fn report_for_device_collects_process_memory() {
        let device = FixedDevice { in_use: 0, peak: 1_000_000_000, limit: 16_000_000_000 };
        let report = report_memory_device(&device).unwrap();
        assert_eq!(report.gpu_peak_gb, 1);
        assert_eq!(report.gpu_total_gb, 16);
    }

    #[test]
    fn size_in_gb_accounts_for_element_width() {
        let real = Array2::<f64>::zeros((1000, 1000));
        assert!((get_size_in_gb(&real) - 0.008).abs() < 1e-12);
        let complex = Array3::<c64>::zeros((100, 100, 100));
        assert!((get_size_in_gb(&complex) - 0.016).abs() < 1e-12);
    }
}
