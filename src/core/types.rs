//! Batch configuration types.

use serde::{Deserialize, Serialize};
use crate::utils::{PipelineError, PipelineResult};

/// Smallest accepted resize target (2^6).
pub const MIN_TARGET_DIMENSION: u32 = 64;
/// Largest accepted resize target (2^14).
pub const MAX_TARGET_DIMENSION: u32 = 16_384;
/// Default compression level on the user-facing 1-100 scale.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 80;

/// PNG backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngBackend {
    /// Structural optimization only; pixels are untouched
    Lossless,
    /// Palette quantization; smaller files at the cost of exact color
    Lossy,
}

/// Configuration snapshot for one batch run.
///
/// Validated once at batch start and shared read-only by all workers;
/// nothing mutates it for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    /// Compression level (1-100), remapped nonlinearly to codec quality
    pub compression_level: u32,
    /// Power-of-two longest-edge target, or None to keep original size
    pub target_dimension: Option<u32>,
    /// Keep the alpha channel when the output codec supports it
    pub preserve_alpha: bool,
    /// Which PNG backend encodes PNG jobs
    pub png_backend: PngBackend,
    /// Reprocess outputs that already exist instead of skipping them
    pub overwrite: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            target_dimension: None,
            preserve_alpha: true,
            png_backend: PngBackend::Lossy,
            overwrite: false,
        }
    }
}

impl BatchConfig {
    /// Validates the configuration before any job runs.
    ///
    /// A failure here is fatal: the batch never starts.
    pub fn validate(&self) -> PipelineResult<()> {
        if !(1..=100).contains(&self.compression_level) {
            return Err(PipelineError::invalid_config(format!(
                "compression level must be within 1-100, got {}",
                self.compression_level
            )));
        }

        if let Some(dim) = self.target_dimension {
            if !dim.is_power_of_two() {
                return Err(PipelineError::invalid_config(format!(
                    "target dimension must be a power of two, got {}", dim
                )));
            }
            if !(MIN_TARGET_DIMENSION..=MAX_TARGET_DIMENSION).contains(&dim) {
                return Err(PipelineError::invalid_config(format!(
                    "target dimension must be within {}-{}, got {}",
                    MIN_TARGET_DIMENSION, MAX_TARGET_DIMENSION, dim
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_level() {
        let config = BatchConfig { compression_level: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = BatchConfig { compression_level: 101, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_power_of_two_target() {
        let config = BatchConfig { target_dimension: Some(1000), ..Default::default() };
        assert!(config.validate().is_err());

        let config = BatchConfig { target_dimension: Some(1024), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_target_outside_bounds() {
        let config = BatchConfig { target_dimension: Some(32), ..Default::default() };
        assert!(config.validate().is_err());

        let config = BatchConfig { target_dimension: Some(32_768), ..Default::default() };
        assert!(config.validate().is_err());
    }
}
