//! Codec adapters over the interchangeable compression backends.
//!
//! Each adapter translates the remapped quality parameters into its
//! backend's native knobs and surfaces failures uniformly as
//! [`JobError::Codec`]. Retry policy belongs to the scheduler; adapters
//! never retry internally.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;

use crate::core::PngBackend;
use crate::processing::quality;
use crate::utils::{ImageFormat, JobError, PipelineResult};

/// Quality parameters handed to a codec.
///
/// `level` is the raw user-facing 1-100 value; `quality` is its nonlinear
/// remapping. Each backend picks the representation it needs.
#[derive(Debug, Clone, Copy)]
pub struct CodecParams {
    pub level: u32,
    pub quality: u32,
}

impl CodecParams {
    /// Builds params from a user level, failing on out-of-range input.
    pub fn from_level(level: u32) -> PipelineResult<Self> {
        Ok(Self { level, quality: quality::map_quality(level)? })
    }
}

/// A single compression backend.
pub trait Codec: Send + Sync {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Whether encoded output can carry an alpha channel
    fn supports_alpha(&self) -> bool;

    /// Encodes `image` into the backend's output bytes.
    fn encode(&self, image: &DynamicImage, params: &CodecParams) -> Result<Vec<u8>, JobError>;
}

/// Lossless PNG: re-encode then structurally optimize with oxipng.
pub struct LosslessPngCodec;

impl Codec for LosslessPngCodec {
    fn name(&self) -> &'static str {
        "png-lossless"
    }

    fn supports_alpha(&self) -> bool {
        true
    }

    fn encode(&self, image: &DynamicImage, params: &CodecParams) -> Result<Vec<u8>, JobError> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|e| JobError::codec(format!("PNG encode failed: {e}")))?;

        let mut opts = oxipng::Options::from_preset(quality::oxipng_preset(params.level));
        opts.strip = oxipng::StripChunks::Safe;

        oxipng::optimize_from_memory(&buf.into_inner(), &opts)
            .map_err(|e| JobError::codec(format!("oxipng failed: {e}")))
    }
}

/// Lossy PNG: palette quantization via libimagequant, then PNG re-encode.
pub struct LossyPngCodec;

impl Codec for LossyPngCodec {
    fn name(&self) -> &'static str {
        "png-lossy"
    }

    fn supports_alpha(&self) -> bool {
        true
    }

    fn encode(&self, image: &DynamicImage, params: &CodecParams) -> Result<Vec<u8>, JobError> {
        let rgba = image.to_rgba8();
        let (width, height) = (rgba.width() as usize, rgba.height() as usize);

        let (min_q, max_q) = quality::quantizer_range(params.level);

        let mut attr = imagequant::Attributes::new();
        attr.set_speed(quality::quantizer_speed(params.level))
            .map_err(|e| JobError::codec(format!("quantizer speed rejected: {e}")))?;
        attr.set_quality(min_q, max_q)
            .map_err(|e| JobError::codec(format!("quantizer quality rejected: {e}")))?;

        let pixels: Vec<rgb::RGBA<u8>> = rgba
            .chunks_exact(4)
            .map(|p| rgb::RGBA::new(p[0], p[1], p[2], p[3]))
            .collect();

        let mut liq_image = imagequant::Image::new(&attr, pixels.as_slice(), width, height, 0.0)
            .map_err(|e| JobError::codec(format!("quantizer image rejected: {e}")))?;
        let mut quantized = attr
            .quantize(&mut liq_image)
            .map_err(|e| JobError::codec(format!("quantization failed: {e}")))?;
        quantized
            .set_dithering_level(1.0)
            .map_err(|e| JobError::codec(format!("dithering rejected: {e}")))?;

        let (palette, indexed) = quantized
            .remapped(&mut liq_image)
            .map_err(|e| JobError::codec(format!("palette remap failed: {e}")))?;

        // Expand palette indices back to RGBA for the PNG encoder
        let mut expanded = Vec::with_capacity(width * height * 4);
        for index in &indexed {
            let p = palette[*index as usize];
            expanded.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }

        let quantized_image = image::RgbaImage::from_raw(rgba.width(), rgba.height(), expanded)
            .ok_or_else(|| JobError::codec("quantized buffer has wrong size"))?;

        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(quantized_image)
            .write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|e| JobError::codec(format!("PNG encode failed: {e}")))?;

        Ok(buf.into_inner())
    }
}

/// JPEG re-encode at the remapped quality. No alpha support.
pub struct JpegCodec;

impl Codec for JpegCodec {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn supports_alpha(&self) -> bool {
        false
    }

    fn encode(&self, image: &DynamicImage, params: &CodecParams) -> Result<Vec<u8>, JobError> {
        let mut buf = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buf, params.quality as u8);
        image
            .write_with_encoder(encoder)
            .map_err(|e| JobError::codec(format!("JPEG encode failed: {e}")))?;
        Ok(buf.into_inner())
    }
}

/// Registry of codecs keyed by (format, PNG backend).
///
/// The default set wires the three real backends; tests inject in-memory
/// fakes through [`CodecSet::insert`].
#[derive(Clone)]
pub struct CodecSet {
    codecs: HashMap<(ImageFormat, PngBackend), Arc<dyn Codec>>,
}

impl CodecSet {
    pub fn empty() -> Self {
        Self { codecs: HashMap::new() }
    }

    pub fn insert(&mut self, format: ImageFormat, backend: PngBackend, codec: Arc<dyn Codec>) {
        self.codecs.insert((format, backend), codec);
    }

    /// Resolves the codec for a job's format under the configured backend.
    pub fn select(&self, format: ImageFormat, backend: PngBackend) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&(format, backend)).cloned()
    }
}

impl Default for CodecSet {
    fn default() -> Self {
        let mut set = Self::empty();
        set.insert(ImageFormat::Png, PngBackend::Lossless, Arc::new(LosslessPngCodec));
        set.insert(ImageFormat::Png, PngBackend::Lossy, Arc::new(LossyPngCodec));
        // JPEG encoding is backend-independent
        let jpeg: Arc<dyn Codec> = Arc::new(JpegCodec);
        set.insert(ImageFormat::Jpeg, PngBackend::Lossless, jpeg.clone());
        set.insert(ImageFormat::Jpeg, PngBackend::Lossy, jpeg);
        set
    }
}
