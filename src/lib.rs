//! # transcodecs
//!
//! Image transcoding between JPEG, PNG, WebP and GIF.
//!
//! Every input is sniffed from its leading bytes, decoded to a canonical
//! RGBA8 [`RasterImage`], then encoded to the requested format at a quality
//! in `1..=100`. Header dimensions are checked against [`Limits`] before a
//! decoder allocates pixel memory. Batches run on a bounded worker pool and
//! return one result per request, in request order.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use transcodecs::{ConversionRequest, ImageFormat};
//!
//! let png: &[u8] = &[]; // your image bytes
//! let webp = transcodecs::convert_one(png, ImageFormat::WebP, 85)?;
//! println!("{} -> {} bytes", webp.source_byte_size, webp.output_byte_size);
//!
//! let requests = [
//!     ConversionRequest::new(png, ImageFormat::Jpeg, 80),
//!     ConversionRequest::new(png, ImageFormat::Gif, 60),
//! ];
//! for result in transcodecs::convert_batch(&requests, 4) {
//!     match result {
//!         Ok(out) => println!("{}: {} bytes", out.output_format, out.output_byte_size),
//!         Err(e) => eprintln!("failed: {e}"),
//!     }
//! }
//! # Ok::<(), transcodecs::ConversionError>(())
//! ```

#![forbid(unsafe_code)]

mod batch;
pub mod codecs;
mod config;
mod error;
mod format;
mod info;
mod limits;
pub mod pipeline;
mod probe;
pub mod quantize;
mod raster;
mod registry;

pub use batch::{BatchJob, BatchReport, ConversionRequest, ConversionSettings, ItemStatus};
pub use config::{CodecConfig, PngCompression};
pub use error::{ConversionError, DecodeError, EncodeError, RasterError};
pub use format::ImageFormat;
pub use info::{ImageInfo, from_bytes, from_bytes_with_registry, probe};
pub use limits::{CancellationToken, Limits};
pub use pipeline::{ConversionResult, Quality, QualityPreset, Transcoder};
pub use probe::ProbeResult;
pub use quantize::DitherMode;
pub use raster::{RasterImage, SourceAsset};
pub use registry::CodecRegistry;

/// Convert one image with default limits and codec settings.
pub fn convert_one(source: &[u8], target: ImageFormat, quality: u8) -> Result<ConversionResult, ConversionError> {
    Transcoder::default().convert_one(source, target, quality)
}

/// Convert many images with default settings, at most `max_concurrency`
/// at a time (0 = available parallelism).
///
/// The returned vector is index-aligned with `requests`.
pub fn convert_batch(
    requests: &[ConversionRequest<'_>],
    max_concurrency: usize,
) -> Vec<Result<ConversionResult, ConversionError>> {
    Transcoder::default().convert_batch(requests, max_concurrency)
}
