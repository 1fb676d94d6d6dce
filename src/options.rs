// src/options.rs

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::ThreadSafeStdError;

/// Command-line arguments relevant to the downstream analysis, as parsed by
/// the calling driver.
#[derive(Clone, Debug)]
pub struct AlgorithmArgs {
    /// Volume mask choice, e.g. `"from_halfmaps"`, `"input"` or `"none"`.
    pub mask_option: String,
    /// Latent dimensions to run the analysis with.
    pub zdim: Vec<usize>,
    /// Contrast handling mode.
    pub contrast: String,
}

/// Plain configuration record handed to the reconstruction stages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmOptions {
    pub volume_mask_option: String,
    pub zs_dim_to_test: Vec<usize>,
    pub contrast: String,
}

impl Default for AlgorithmOptions {
    fn default() -> Self {
        AlgorithmOptions {
            volume_mask_option: "from_halfmaps".to_string(),
            zs_dim_to_test: vec![1, 2, 4, 10, 20],
            contrast: "none".to_string(),
        }
    }
}

impl AlgorithmOptions {
    /// Saves the options to `path` in bincode format.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ThreadSafeStdError> {
        let file = File::create(path.as_ref())
            .map_err(|e| format!("Failed to create file at {:?}: {}", path.as_ref(), e))?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| format!("Failed to serialize algorithm options: {}", e))?;
        Ok(())
    }

    /// Loads options previously written with [`AlgorithmOptions::save_to_file`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ThreadSafeStdError> {
        let file = File::open(path.as_ref())
            .map_err(|e| format!("Failed to open file at {:?}: {}", path.as_ref(), e))?;
        let mut reader = BufReader::new(file);
        let options: AlgorithmOptions = bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
            .map_err(|e| format!("Failed to deserialize algorithm options: {}", e))?;
        if options.zs_dim_to_test.iter().any(|&z| z == 0) {
            return Err("Loaded algorithm options contain a zero latent dimension.".into());
        }
        Ok(options)
    }
}

/// Maps parsed arguments onto an [`AlgorithmOptions`] record.
pub fn make_algorithm_options(args: &AlgorithmArgs) -> AlgorithmOptions {
    AlgorithmOptions {
        volume_mask_option: args.mask_option.clone(),
        zs_dim_to_test: args.zdim.clone(),
        contrast: args.contrast.clone(),
    }
}
