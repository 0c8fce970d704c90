//! WebP codec adapter.
//!
//! Decoding goes through image-webp; encoding uses libwebp via the webp
//! crate. Quality 100 selects the lossless encoder with exact RGB under
//! transparent pixels.

use std::io::Cursor;

use crate::config::CodecConfig;
use crate::error::{DecodeError, EncodeError};
use crate::format::ImageFormat;
use crate::limits::Limits;
use crate::pipeline::Quality;
use crate::probe::validated_dimensions;
use crate::raster::RasterImage;

use super::{Decoder, Encoder, check_format_dimensions};

/// libwebp's default lossy method.
const DEFAULT_METHOD: u8 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WebpCodec {
    /// Lossy compression method, 0..=6. `None` uses libwebp's default.
    pub method: Option<u8>,
}

impl WebpCodec {
    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            method: config.webp_method,
        }
    }
}

fn map_decode_error(error: image_webp::DecodingError) -> DecodeError {
    match error {
        image_webp::DecodingError::IoError(e) => DecodeError::from_io(ImageFormat::WebP, &e),
        image_webp::DecodingError::UnsupportedFeature(feature) => {
            DecodeError::unsupported(ImageFormat::WebP, feature)
        }
        other => DecodeError::corrupt(ImageFormat::WebP, other.to_string()),
    }
}

impl Decoder for WebpCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::WebP
    }

    fn decode(&self, data: &[u8], limits: &Limits) -> Result<RasterImage, DecodeError> {
        validated_dimensions(data, ImageFormat::WebP, limits)?;
        let mut decoder = image_webp::WebPDecoder::new(Cursor::new(data)).map_err(map_decode_error)?;
        // The canvas may differ from the first chunk header for extended files.
        let (width, height) = decoder.dimensions();
        limits.check_decode(width as u64, height as u64)?;

        let size = decoder
            .output_buffer_size()
            .ok_or_else(|| DecodeError::corrupt(ImageFormat::WebP, "output buffer size overflows"))?;
        let mut buf = vec![0u8; size];
        // Animated files yield their first frame.
        decoder.read_image(&mut buf).map_err(map_decode_error)?;
        log::trace!(
            "webp: {width}x{height} alpha={} animated={}",
            decoder.has_alpha(),
            decoder.is_animated()
        );

        let image = if decoder.has_alpha() {
            RasterImage::from_rgba8(width, height, &buf)
        } else {
            RasterImage::from_rgb8(width, height, &buf)
        };
        image.map_err(|e| DecodeError::corrupt(ImageFormat::WebP, e.to_string()))
    }
}

impl Encoder for WebpCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::WebP
    }

    fn encode(&self, image: &RasterImage, quality: Quality) -> Result<Vec<u8>, EncodeError> {
        check_format_dimensions(image, ImageFormat::WebP)?;

        let encoder = webp::Encoder::from_rgba(image.as_bytes(), image.width(), image.height());
        let mut config = webp::WebPConfig::new()
            .map_err(|()| EncodeError::from_codec(ImageFormat::WebP, "failed to create WebPConfig"))?;

        if quality == Quality::MAX {
            config.lossless = 1;
            config.exact = 1;
        } else {
            config.quality = quality.get() as f32;
            config.method = self.method.unwrap_or(DEFAULT_METHOD).min(6) as i32;
        }

        let mem = encoder
            .encode_advanced(&config)
            .map_err(|e| EncodeError::from_codec(ImageFormat::WebP, format!("{e:?}")))?;
        Ok(mem.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::test_images::textured;

    fn encode(image: &RasterImage, q: u8) -> Vec<u8> {
        WebpCodec::default().encode(image, Quality::new(q).unwrap()).unwrap()
    }

    #[test]
    fn lossless_at_max_quality() {
        let image = textured(29, 31, true);
        let bytes = encode(&image, 100);
        assert_eq!(ImageFormat::detect(&bytes), Some(ImageFormat::WebP));
        let decoded = WebpCodec::default().decode(&bytes, &Limits::default()).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn lossy_keeps_alpha() {
        let image = textured(32, 32, true);
        let bytes = encode(&image, 80);
        let decoded = WebpCodec::default().decode(&bytes, &Limits::default()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
        assert!(decoded.has_transparency());
    }

    #[test]
    fn opaque_lossy_decodes_opaque() {
        let image = textured(24, 24, false);
        let decoded = WebpCodec::default()
            .decode(&encode(&image, 60), &Limits::default())
            .unwrap();
        assert!(!decoded.has_transparency());
    }

    #[test]
    fn higher_quality_is_not_smaller() {
        let image = textured(64, 64, false);
        let sizes: Vec<usize> = [10, 50, 90].iter().map(|&q| encode(&image, q).len()).collect();
        assert!(sizes[0] <= sizes[1] && sizes[1] <= sizes[2], "{sizes:?}");
    }

    #[test]
    fn limits_reject_large_canvas() {
        let bytes = encode(&textured(40, 40, false), 50);
        let err = WebpCodec::default()
            .decode(&bytes, &Limits::default().with_max_pixels(100))
            .unwrap_err();
        assert!(matches!(err, DecodeError::DimensionsExceedLimit { width: 40, height: 40, .. }));
    }

    #[test]
    fn garbage_after_riff_header() {
        let mut bytes = b"RIFF\x20\x00\x00\x00WEBPVP8 ".to_vec();
        bytes.extend_from_slice(&[0xff; 20]);
        assert!(WebpCodec::default().decode(&bytes, &Limits::default()).is_err());
    }
}
