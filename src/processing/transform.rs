//! Pre-compression image transforms: alpha policy and power-of-two resizing.

use image::{DynamicImage, RgbImage, imageops::FilterType};
use tracing::debug;
use crate::utils::JobError;

/// Result of the transform stage.
#[derive(Debug)]
pub struct TransformedImage {
    pub image: DynamicImage,
    /// Informational note (e.g. resize skipped), not an error
    pub note: Option<String>,
}

/// Applies the configured transforms to a decoded image.
///
/// `alpha_supported` reflects the selected output codec: when the source
/// carries alpha that the caller wants preserved but the codec cannot
/// represent it, the job fails rather than silently dropping transparency.
pub fn apply(
    image: DynamicImage,
    target_dimension: Option<u32>,
    preserve_alpha: bool,
    alpha_supported: bool,
) -> Result<TransformedImage, JobError> {
    let has_alpha = image.color().has_alpha();

    let image = if has_alpha {
        if preserve_alpha {
            if !alpha_supported {
                return Err(JobError::UnsupportedAlphaFormat);
            }
            image
        } else {
            DynamicImage::ImageRgb8(flatten_onto_white(&image))
        }
    } else {
        image
    };

    let (image, note) = match target_dimension {
        Some(target) => resize_longest_edge(image, target),
        None => (image, None),
    };

    Ok(TransformedImage { image, note })
}

/// Composites the image over an opaque white background.
///
/// Lossy codecs without alpha support would otherwise discard transparency
/// with an undefined visual result.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut flat = RgbImage::new(width, height);

    for (out, pixel) in flat.pixels_mut().zip(rgba.pixels()) {
        let alpha = pixel[3] as u32;
        for channel in 0..3 {
            let value = pixel[channel] as u32;
            out[channel] = ((value * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
    }

    flat
}

/// Downscales so the longer edge equals `target`; never upscales.
fn resize_longest_edge(image: DynamicImage, target: u32) -> (DynamicImage, Option<String>) {
    let (width, height) = (image.width(), image.height());
    let longest = width.max(height);

    if longest <= target {
        let note = format!(
            "source {}x{} not upscaled to {} (longer edge already within target)",
            width, height, target
        );
        debug!("{note}");
        return (image, Some(note));
    }

    // `resize` fits within the bounding box preserving aspect ratio, so the
    // longer edge lands exactly on the target.
    let resized = image.resize(target, target, FilterType::Lanczos3);
    debug!("Resized {}x{} -> {}x{}", width, height, resized.width(), resized.height());
    (resized, None)
}
