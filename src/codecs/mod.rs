//! Codec adapters for format-specific implementations.
//!
//! Each format is one codec type implementing both [`Decoder`] and
//! [`Encoder`]. Adapters validate header dimensions before handing bytes to
//! the underlying crate, and fold that crate's errors into
//! [`DecodeError`]/[`EncodeError`].

mod gif;
mod jpeg;
mod png;
mod webp;

pub use self::gif::GifCodec;
pub use self::jpeg::JpegCodec;
pub use self::png::PngCodec;
pub use self::webp::WebpCodec;

use crate::config::CodecConfig;
use crate::error::{DecodeError, EncodeError};
use crate::format::ImageFormat;
use crate::limits::Limits;
use crate::pipeline::Quality;
use crate::raster::RasterImage;

/// Decodes one format into a [`RasterImage`].
pub trait Decoder: Send + Sync {
    fn format(&self) -> ImageFormat;

    /// Decode the first frame of `data`.
    ///
    /// Dimensions are checked against `limits` before pixel memory is
    /// allocated.
    fn decode(&self, data: &[u8], limits: &Limits) -> Result<RasterImage, DecodeError>;
}

/// Encodes a [`RasterImage`] into one format.
pub trait Encoder: Send + Sync {
    fn format(&self) -> ImageFormat;

    fn encode(&self, image: &RasterImage, quality: Quality) -> Result<Vec<u8>, EncodeError>;

    /// Validate a raw quality value, then encode.
    fn encode_with_quality(&self, image: &RasterImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
        self.encode(image, Quality::new(quality)?)
    }
}

/// The decoder for `format`.
pub fn decoder_for(format: ImageFormat) -> Box<dyn Decoder> {
    match format {
        ImageFormat::Jpeg => Box::new(JpegCodec::default()),
        ImageFormat::Png => Box::new(PngCodec::default()),
        ImageFormat::WebP => Box::new(WebpCodec::default()),
        ImageFormat::Gif => Box::new(GifCodec::default()),
    }
}

/// The encoder for `format`, configured from `config`.
pub fn encoder_for(format: ImageFormat, config: &CodecConfig) -> Box<dyn Encoder> {
    match format {
        ImageFormat::Jpeg => Box::new(JpegCodec::from_config(config)),
        ImageFormat::Png => Box::new(PngCodec::from_config(config)),
        ImageFormat::WebP => Box::new(WebpCodec::from_config(config)),
        ImageFormat::Gif => Box::new(GifCodec::from_config(config)),
    }
}

/// Reject rasters the target format cannot represent.
fn check_format_dimensions(image: &RasterImage, format: ImageFormat) -> Result<(), EncodeError> {
    let max = format.max_dimension();
    if image.width() > max || image.height() > max {
        return Err(EncodeError::DimensionsExceedFormat {
            format,
            width: image.width(),
            height: image.height(),
            max,
        });
    }
    Ok(())
}
