// src/mrc.rs

//! Minimal MRC2014 volume reader and writer.
//!
//! Volumes are `(nz, ny, nx)` arrays in C order, so `x` varies fastest on disk.
//! Files are written as mode 2 (float32) in host byte order with the matching
//! machine stamp; reading honors the stamp of the file.

use ndarray::{Array3, ArrayView3};
use ndarray_linalg::Scalar;
use num_traits::ToPrimitive;
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::ThreadSafeStdError;

const HEADER_BYTES: usize = 1024;
const HEADER_WORDS: usize = HEADER_BYTES / 4;

// Zero-based word offsets into the 256-word header.
const NX: usize = 0;
const NY: usize = 1;
const NZ: usize = 2;
const MODE: usize = 3;
const MX: usize = 7;
const CELLA: usize = 10;
const CELLB: usize = 13;
const MAPC: usize = 16;
const MAPR: usize = 17;
const MAPS: usize = 18;
const DMIN: usize = 19;
const DMAX: usize = 20;
const DMEAN: usize = 21;
const NSYMBT: usize = 23;
const NVERSION: usize = 27;
const MAP: usize = 52;
const MACHST: usize = 53;
const RMS: usize = 54;

const MRC2014_VERSION: u32 = 20140;
const STAMP_LITTLE_ENDIAN: [u8; 4] = [0x44, 0x44, 0x00, 0x00];
const STAMP_BIG_ENDIAN: [u8; 4] = [0x11, 0x11, 0x00, 0x00];

/// Data modes this module can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MrcMode {
    Int8,
    Int16,
    Float32,
    UInt16,
}

impl MrcMode {
    fn from_code(code: i32) -> Result<Self, ThreadSafeStdError> {
        match code {
            0 => Ok(MrcMode::Int8),
            1 => Ok(MrcMode::Int16),
            2 => Ok(MrcMode::Float32),
            6 => Ok(MrcMode::UInt16),
            other => Err(format!("Unsupported MRC data mode {}.", other).into()),
        }
    }

    fn bytes_per_voxel(self) -> usize {
        match self {
            MrcMode::Int8 => 1,
            MrcMode::Int16 | MrcMode::UInt16 => 2,
            MrcMode::Float32 => 4,
        }
    }
}

fn host_machine_stamp() -> [u8; 4] {
    if cfg!(target_endian = "big") {
        STAMP_BIG_ENDIAN
    } else {
        STAMP_LITTLE_ENDIAN
    }
}

/// Writes the real part of `volume` as a float32 MRC file, overwriting `path`.
/// The voxel size is recorded as 1 Å.
pub fn write_mrc<A, P>(path: P, volume: ArrayView3<'_, A>) -> Result<(), ThreadSafeStdError>
where
    A: Scalar,
    P: AsRef<Path>,
{
    write_mrc_with_voxel_size(path, volume, 1.0)
}

/// [`write_mrc`] with an explicit voxel size in Å.
pub fn write_mrc_with_voxel_size<A, P>(path: P, volume: ArrayView3<'_, A>, voxel_size: f32) -> Result<(), ThreadSafeStdError>
where
    A: Scalar,
    P: AsRef<Path>,
{
    let (nz, ny, nx) = volume.dim();
    let dims = [nx, ny, nz]
        .iter()
        .map(|&d| i32::try_from(d).map_err(|_| format!("Volume dimension {} does not fit an MRC header.", d)))
        .collect::<Result<Vec<i32>, String>>()?;

    let real_part = volume.mapv(|x| x.re().to_f32().unwrap_or(f32::NAN));
    let real_part = real_part.as_standard_layout();
    let data = real_part
        .as_slice()
        .ok_or("Volume data is not contiguous after conversion to standard layout.")?;

    let mut header = [0u32; HEADER_WORDS];
    for (axis, &dim) in dims.iter().enumerate() {
        header[NX + axis] = dim as u32;
        header[MX + axis] = dim as u32;
        header[CELLA + axis] = (dim as f32 * voxel_size).to_bits();
        header[CELLB + axis] = 90.0_f32.to_bits();
    }
    header[MODE] = 2;
    header[MAPC] = 1;
    header[MAPR] = 2;
    header[MAPS] = 3;

    let stats = VoxelStatistics::from_data(data);
    header[DMIN] = stats.min.to_bits();
    header[DMAX] = stats.max.to_bits();
    header[DMEAN] = stats.mean.to_bits();
    header[RMS] = stats.rms.to_bits();

    header[NVERSION] = MRC2014_VERSION;
    header[MAP] = u32::from_ne_bytes(*b"MAP ");
    header[MACHST] = u32::from_ne_bytes(host_machine_stamp());

    let file = File::create(path.as_ref())
        .map_err(|e| format!("Failed to create file at {:?}: {}", path.as_ref(), e))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytemuck::cast_slice::<u32, u8>(&header[..]))?;
    writer.write_all(bytemuck::cast_slice::<f32, u8>(data))?;
    writer.flush()?;

    debug!("Wrote MRC volume {:?} of shape ({}, {}, {}).", path.as_ref(), nz, ny, nx);
    Ok(())
}

/// Reads an MRC volume as `(nz, ny, nx)` float32 data.
pub fn load_mrc<P: AsRef<Path>>(path: P) -> Result<Array3<f32>, ThreadSafeStdError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| format!("Failed to open file at {:?}: {}", path.as_ref(), e))?;
    if bytes.len() < HEADER_BYTES {
        return Err(format!(
            "File {:?} is {} bytes, shorter than an MRC header.",
            path.as_ref(),
            bytes.len()
        )
        .into());
    }

    let stamp = &bytes[MACHST * 4..MACHST * 4 + 4];
    let file_is_big_endian = stamp[0] == STAMP_BIG_ENDIAN[0];
    let swap = file_is_big_endian != cfg!(target_endian = "big");

    let mut header: [u32; HEADER_WORDS] = bytemuck::pod_read_unaligned(&bytes[..HEADER_BYTES]);
    if swap {
        header.iter_mut().for_each(|w| *w = w.swap_bytes());
    }

    let as_dim = |word: usize| -> Result<usize, ThreadSafeStdError> {
        let value = header[word] as i32;
        usize::try_from(value)
            .ok()
            .filter(|&d| d > 0)
            .ok_or_else(|| format!("Invalid MRC dimension {} in header word {}.", value, word + 1).into())
    };
    let nx = as_dim(NX)?;
    let ny = as_dim(NY)?;
    let nz = as_dim(NZ)?;
    let mode = MrcMode::from_code(header[MODE] as i32)?;
    let extended_header_bytes = usize::try_from(header[NSYMBT] as i32)
        .map_err(|_| format!("Negative extended header size {}.", header[NSYMBT] as i32))?;

    let data_start = HEADER_BYTES
        .checked_add(extended_header_bytes)
        .ok_or_else(|| format!("MRC extended header size {} overflows.", extended_header_bytes))?;
    let data_end = nx
        .checked_mul(ny)
        .and_then(|v| v.checked_mul(nz))
        .and_then(|v| v.checked_mul(mode.bytes_per_voxel()))
        .and_then(|v| v.checked_add(data_start))
        .ok_or_else(|| format!("MRC header dimensions overflow: ({}, {}, {}) voxels in mode {:?}.", nx, ny, nz, mode))?;
    if bytes.len() < data_end {
        return Err(format!(
            "MRC file {:?} is truncated: expected {} bytes of voxel data, found {}.",
            path.as_ref(),
            data_end - data_start,
            bytes.len().saturating_sub(data_start)
        )
        .into());
    }
    let raw = &bytes[data_start..data_end];
    debug!("Reading MRC {:?}: ({}, {}, {}) voxels, mode {:?}, swap {}.", path.as_ref(), nz, ny, nx, mode, swap);

    let values: Vec<f32> = match mode {
        MrcMode::Int8 => raw.iter().map(|&b| b as i8 as f32).collect(),
        MrcMode::Int16 => raw
            .chunks_exact(2)
            .map(|c| {
                let bits = u16::from_ne_bytes([c[0], c[1]]);
                (if swap { bits.swap_bytes() } else { bits }) as i16 as f32
            })
            .collect(),
        MrcMode::UInt16 => raw
            .chunks_exact(2)
            .map(|c| {
                let bits = u16::from_ne_bytes([c[0], c[1]]);
                (if swap { bits.swap_bytes() } else { bits }) as f32
            })
            .collect(),
        MrcMode::Float32 => raw
            .chunks_exact(4)
            .map(|c| {
                let bits = u32::from_ne_bytes([c[0], c[1], c[2], c[3]]);
                f32::from_bits(if swap { bits.swap_bytes() } else { bits })
            })
            .collect(),
    };

    Array3::from_shape_vec((nz, ny, nx), values).map_err(|e| Box::new(e) as ThreadSafeStdError)
}

struct VoxelStatistics {
    min: f32,
    max: f32,
    mean: f32,
    rms: f32,
}

impl VoxelStatistics {
    fn from_data(data: &[f32]) -> Self {
        if data.is_empty() {
            return Self { min: 0.0, max: 0.0, mean: 0.0, rms: 0.0 };
        }
        let n = data.len() as f64;
        let (min, max) = data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let variance = data.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        Self {
            min,
            max,
            mean: mean as f32,
            rms: variance.sqrt() as f32,
        }
    }
}
