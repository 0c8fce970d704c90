//! Cross-format conversion: sniff -> decode -> encode.
//!
//! [`Transcoder`] bundles the settings every conversion shares: decode
//! limits, which formats are enabled, and format-specific encoder options.
//! A single instance is `Sync` and can serve a whole batch concurrently.
//!
//! # Example
//!
//! ```no_run
//! use transcodecs::{ImageFormat, Limits, Transcoder};
//!
//! let png_bytes: &[u8] = &[]; // your image bytes
//! let transcoder = Transcoder::new().with_limits(Limits::default().with_max_pixels(50_000_000));
//! let result = transcoder.convert_one(png_bytes, ImageFormat::WebP, 80)?;
//!
//! println!(
//!     "{}x{} {} -> {} ({} bytes)",
//!     result.width, result.height, result.source_format, result.output_format, result.output_byte_size
//! );
//! # Ok::<(), transcodecs::ConversionError>(())
//! ```

mod quality;

use std::time::{Duration, Instant};

use crate::batch::{self, BatchJob, BatchReport, ConversionRequest};
use crate::codecs::{decoder_for, encoder_for};
use crate::config::CodecConfig;
use crate::error::{ConversionError, DecodeError, EncodeError};
use crate::format::ImageFormat;
use crate::limits::Limits;
use crate::raster::RasterImage;
use crate::registry::CodecRegistry;

pub use quality::{Quality, QualityPreset};

/// A successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ConversionResult {
    /// Encoded output.
    pub output_bytes: Vec<u8>,
    pub output_format: ImageFormat,
    /// Format sniffed from the input.
    pub source_format: ImageFormat,
    /// Dimensions of the decoded raster, which the output shares.
    pub width: u32,
    pub height: u32,
    pub source_byte_size: usize,
    pub output_byte_size: usize,
    /// Wall time spent in the encoder.
    pub encode_time: Duration,
}

impl ConversionResult {
    /// Output size relative to input; below 1.0 means the file shrank.
    pub fn compression_ratio(&self) -> f64 {
        if self.source_byte_size == 0 {
            return 0.0;
        }
        self.output_byte_size as f64 / self.source_byte_size as f64
    }
}

/// Shared conversion settings.
#[derive(Debug, Clone, Default)]
pub struct Transcoder {
    limits: Limits,
    registry: CodecRegistry,
    codec_config: CodecConfig,
}

impl Transcoder {
    /// Default limits, every format enabled, encoder options from quality.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_codec_config(mut self, config: CodecConfig) -> Self {
        self.codec_config = config;
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn codec_config(&self) -> &CodecConfig {
        &self.codec_config
    }

    /// Sniff and decode `data` into an RGBA8 raster.
    pub fn decode(&self, data: &[u8]) -> Result<(ImageFormat, RasterImage), DecodeError> {
        let format = ImageFormat::detect(data).ok_or(DecodeError::UnknownFormat)?;
        if !self.registry.can_decode(format) {
            return Err(DecodeError::DisabledFormat(format));
        }
        let image = decoder_for(format).decode(data, &self.limits)?;
        Ok((format, image))
    }

    /// Encode a raster to `format` at `quality` (1..=100).
    pub fn encode(&self, image: &RasterImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, EncodeError> {
        let quality = Quality::new(quality)?;
        if !self.registry.can_encode(format) {
            return Err(EncodeError::UnsupportedTargetFormat(format));
        }
        encoder_for(format, &self.codec_config).encode(image, quality)
    }

    /// Convert one encoded image to `target` at `quality`.
    ///
    /// Quality and target are checked before any decoding work.
    pub fn convert_one(&self, data: &[u8], target: ImageFormat, quality: u8) -> Result<ConversionResult, ConversionError> {
        let quality = Quality::new(quality)?;
        if !self.registry.can_encode(target) {
            return Err(EncodeError::UnsupportedTargetFormat(target).into());
        }

        let (source_format, image) = self.decode(data)?;

        let start = Instant::now();
        let output_bytes = encoder_for(target, &self.codec_config).encode(&image, quality)?;
        let encode_time = start.elapsed();

        log::debug!(
            "{source_format} {}x{} ({} bytes) -> {target} q{} ({} bytes) in {encode_time:?}",
            image.width(),
            image.height(),
            data.len(),
            quality.get(),
            output_bytes.len(),
        );

        Ok(ConversionResult {
            output_byte_size: output_bytes.len(),
            output_bytes,
            output_format: target,
            source_format,
            width: image.width(),
            height: image.height(),
            source_byte_size: data.len(),
            encode_time,
        })
    }

    /// Convert `requests` with at most `max_concurrency` in flight.
    ///
    /// Results are index-aligned with `requests`. One failure never aborts
    /// the others. A `max_concurrency` of 0 uses the available parallelism.
    pub fn convert_batch(
        &self,
        requests: &[ConversionRequest<'_>],
        max_concurrency: usize,
    ) -> Vec<Result<ConversionResult, ConversionError>> {
        let job = BatchJob::new(requests).with_max_concurrency(max_concurrency);
        batch::run(self, &job).results
    }

    /// Run a batch job with cancellation and progress reporting.
    pub fn run_batch(&self, job: &BatchJob<'_>) -> BatchReport {
        batch::run(self, job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::test_images::textured;

    fn png_bytes() -> Vec<u8> {
        Transcoder::new()
            .encode(&textured(16, 12, true), ImageFormat::Png, 100)
            .unwrap()
    }

    #[test]
    fn convert_reports_sizes_and_formats() {
        let input = png_bytes();
        let result = Transcoder::new().convert_one(&input, ImageFormat::WebP, 100).unwrap();
        assert_eq!(result.source_format, ImageFormat::Png);
        assert_eq!(result.output_format, ImageFormat::WebP);
        assert_eq!((result.width, result.height), (16, 12));
        assert_eq!(result.source_byte_size, input.len());
        assert_eq!(result.output_byte_size, result.output_bytes.len());
        assert!(result.compression_ratio() > 0.0);
    }

    #[test]
    fn quality_checked_before_decoding() {
        let err = Transcoder::new()
            .convert_one(b"garbage", ImageFormat::Jpeg, 0)
            .unwrap_err();
        assert!(matches!(err, ConversionError::Encode(EncodeError::InvalidQuality(0))));
    }

    #[test]
    fn unknown_input() {
        let err = Transcoder::new()
            .convert_one(b"garbage", ImageFormat::Jpeg, 80)
            .unwrap_err();
        assert!(matches!(err, ConversionError::Decode(DecodeError::UnknownFormat)));
    }

    #[test]
    fn bare_jpeg_soi_is_classified_by_header() {
        let transcoder = Transcoder::new();
        let err = transcoder
            .convert_one(&[0xFF, 0xD8, 0x00, 0x10, 0x20], ImageFormat::Png, 80)
            .unwrap_err();
        assert!(
            matches!(
                err,
                ConversionError::Decode(DecodeError::CorruptHeader {
                    format: ImageFormat::Jpeg,
                    ..
                })
            ),
            "{err:?}"
        );
        let err = transcoder
            .convert_one(&[0xFF, 0xD8], ImageFormat::Png, 80)
            .unwrap_err();
        assert!(
            matches!(
                err,
                ConversionError::Decode(DecodeError::TruncatedInput {
                    format: ImageFormat::Jpeg
                })
            ),
            "{err:?}"
        );
    }

    #[test]
    fn registry_gates_both_directions() {
        let input = png_bytes();
        let no_png_decode = Transcoder::new().with_registry(CodecRegistry::all().with_decode(ImageFormat::Png, false));
        assert!(matches!(
            no_png_decode.convert_one(&input, ImageFormat::Jpeg, 80),
            Err(ConversionError::Decode(DecodeError::DisabledFormat(ImageFormat::Png)))
        ));

        let no_gif_encode = Transcoder::new().with_registry(CodecRegistry::all().with_encode(ImageFormat::Gif, false));
        assert!(matches!(
            no_gif_encode.convert_one(&input, ImageFormat::Gif, 80),
            Err(ConversionError::Encode(EncodeError::UnsupportedTargetFormat(ImageFormat::Gif)))
        ));
    }

    #[test]
    fn limits_apply_to_decode() {
        let input = png_bytes();
        let strict = Transcoder::new().with_limits(Limits::default().with_max_pixels(100));
        assert!(matches!(
            strict.decode(&input),
            Err(DecodeError::DimensionsExceedLimit { width: 16, height: 12, .. })
        ));
    }

    #[test]
    fn same_format_reencode() {
        let input = png_bytes();
        let result = Transcoder::new().convert_one(&input, ImageFormat::Png, 100).unwrap();
        let (_, original) = Transcoder::new().decode(&input).unwrap();
        let (_, again) = Transcoder::new().decode(&result.output_bytes).unwrap();
        assert_eq!(original, again);
    }
}
