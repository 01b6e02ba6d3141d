//! Quality remapping from the user-facing 1-100 level to codec parameters.
//!
//! The user scale is deliberately nonlinear: a squared curve compresses the
//! low end so that most of the perceptually useful range sits near the top,
//! where small level changes produce steep quality changes.

use crate::utils::{PipelineError, PipelineResult};

/// Lowest codec quality any level maps to.
pub const MIN_QUALITY: u32 = 10;
/// Highest codec quality any level maps to.
pub const MAX_QUALITY: u32 = 95;

/// Maps a compression level in [1, 100] to a codec quality in
/// [`MIN_QUALITY`, `MAX_QUALITY`].
///
/// Out-of-range levels are rejected rather than clamped so caller bugs
/// surface before a batch starts.
pub fn map_quality(level: u32) -> PipelineResult<u32> {
    if !(1..=100).contains(&level) {
        return Err(PipelineError::invalid_config(format!(
            "compression level must be within 1-100, got {}", level
        )));
    }

    let normalized = (level - 1) as f64 / 99.0;
    let quality = MIN_QUALITY as f64
        + (normalized * normalized * (MAX_QUALITY - MIN_QUALITY) as f64).round();
    Ok(quality as u32)
}

/// Structural optimization preset for the lossless PNG backend.
///
/// High user levels ask for more quality, which on a lossless codec means
/// less time spent on structural search: level 100 maps to preset 0,
/// level 1 to preset 6.
pub fn oxipng_preset(level: u32) -> u8 {
    (6 - (level as f64 / 100.0 * 6.0) as u32) as u8
}

/// Quality window handed to the palette quantizer, pngquant-style:
/// accept results between `level - 10` and `level`.
pub fn quantizer_range(level: u32) -> (u8, u8) {
    let max = level.min(100) as u8;
    let min = level.saturating_sub(10) as u8;
    (min, max)
}

/// Quantizer speed/effort: slow-and-thorough above the midpoint,
/// balanced below it.
pub fn quantizer_speed(level: u32) -> i32 {
    if level > 50 { 1 } else { 3 }
}
