//! JPEG codec adapter using jpeg-decoder and jpeg-encoder.

use rgb::Rgba;

use crate::config::CodecConfig;
use crate::error::{DecodeError, EncodeError};
use crate::format::ImageFormat;
use crate::limits::Limits;
use crate::pipeline::Quality;
use crate::probe::validated_dimensions;
use crate::raster::RasterImage;

use super::{Decoder, Encoder, check_format_dimensions};

/// Baseline or progressive JPEG.
///
/// JPEG has no alpha channel. Translucent pixels are composited over white
/// before encoding, so every decoded pixel is opaque.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JpegCodec {
    pub progressive: bool,
}

impl JpegCodec {
    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            progressive: config.jpeg_progressive,
        }
    }
}

fn map_decode_error(error: jpeg_decoder::Error) -> DecodeError {
    match error {
        jpeg_decoder::Error::Io(e) => DecodeError::from_io(ImageFormat::Jpeg, &e),
        jpeg_decoder::Error::Unsupported(feature) => {
            DecodeError::unsupported(ImageFormat::Jpeg, format!("{feature:?}"))
        }
        other => DecodeError::corrupt(ImageFormat::Jpeg, other.to_string()),
    }
}

/// Expand decoder output to RGBA8.
fn to_rgba(format: jpeg_decoder::PixelFormat, data: &[u8]) -> Vec<Rgba<u8>> {
    use jpeg_decoder::PixelFormat;

    match format {
        PixelFormat::L8 => data.iter().map(|&l| Rgba::new(l, l, l, 255)).collect(),
        // Big-endian samples; keep the high byte.
        PixelFormat::L16 => data
            .chunks_exact(2)
            .map(|c| Rgba::new(c[0], c[0], c[0], 255))
            .collect(),
        PixelFormat::RGB24 => data
            .chunks_exact(3)
            .map(|c| Rgba::new(c[0], c[1], c[2], 255))
            .collect(),
        PixelFormat::CMYK32 => data
            .chunks_exact(4)
            .map(|c| {
                let k = 255 - c[3] as u32;
                let channel = |v: u8| ((255 - v as u32) * k / 255) as u8;
                Rgba::new(channel(c[0]), channel(c[1]), channel(c[2]), 255)
            })
            .collect(),
    }
}

impl Decoder for JpegCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn decode(&self, data: &[u8], limits: &Limits) -> Result<RasterImage, DecodeError> {
        let (width, height) = validated_dimensions(data, ImageFormat::Jpeg, limits)?;

        let mut decoder = jpeg_decoder::Decoder::new(data);
        if let Some(max) = limits.max_memory_bytes {
            decoder.set_max_decoding_buffer_size(usize::try_from(max).unwrap_or(usize::MAX));
        }
        let pixels = decoder.decode().map_err(map_decode_error)?;
        let info = decoder
            .info()
            .ok_or_else(|| DecodeError::corrupt(ImageFormat::Jpeg, "no frame header"))?;

        if (info.width as u32, info.height as u32) != (width, height) {
            return Err(DecodeError::corrupt(
                ImageFormat::Jpeg,
                format!(
                    "frame is {}x{}, header said {width}x{height}",
                    info.width, info.height
                ),
            ));
        }
        log::trace!("jpeg: {width}x{height} {:?}", info.pixel_format);

        RasterImage::new(width, height, to_rgba(info.pixel_format, &pixels))
            .map_err(|e| DecodeError::corrupt(ImageFormat::Jpeg, e.to_string()))
    }
}

impl Encoder for JpegCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(&self, image: &RasterImage, quality: Quality) -> Result<Vec<u8>, EncodeError> {
        check_format_dimensions(image, ImageFormat::Jpeg)?;

        let rgb: Vec<u8> = image
            .pixels()
            .iter()
            .flat_map(|p| {
                let a = p.a as u32;
                let over_white = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
                [over_white(p.r), over_white(p.g), over_white(p.b)]
            })
            .collect();

        let mut output = Vec::new();
        let mut encoder = jpeg_encoder::Encoder::new(&mut output, quality.get());
        encoder.set_progressive(self.progressive);
        encoder
            .encode(
                &rgb,
                image.width() as u16,
                image.height() as u16,
                jpeg_encoder::ColorType::Rgb,
            )
            .map_err(|e| EncodeError::from_codec(ImageFormat::Jpeg, e))?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::test_images::textured;

    fn encode(image: &RasterImage, q: u8) -> Vec<u8> {
        JpegCodec::default().encode(image, Quality::new(q).unwrap()).unwrap()
    }

    #[test]
    fn roundtrip_keeps_dimensions() {
        let image = textured(40, 24, false);
        let bytes = encode(&image, 90);
        assert_eq!(ImageFormat::detect(&bytes), Some(ImageFormat::Jpeg));
        let decoded = JpegCodec::default().decode(&bytes, &Limits::default()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 24));
    }

    #[test]
    fn output_is_opaque() {
        let image = textured(16, 16, true);
        let bytes = encode(&image, 95);
        let decoded = JpegCodec::default().decode(&bytes, &Limits::default()).unwrap();
        assert!(!decoded.has_transparency());
    }

    #[test]
    fn transparent_flattens_to_white() {
        let image = RasterImage::new(8, 8, vec![Rgba::new(0, 0, 0, 0); 64]).unwrap();
        let bytes = encode(&image, 100);
        let decoded = JpegCodec::default().decode(&bytes, &Limits::default()).unwrap();
        assert!(decoded.pixels().iter().all(|p| p.r > 245 && p.g > 245 && p.b > 245));
    }

    #[test]
    fn progressive_decodes() {
        let image = textured(33, 17, false);
        let codec = JpegCodec::from_config(&CodecConfig::default().with_jpeg_progressive(true));
        let bytes = codec.encode(&image, Quality::new(75).unwrap()).unwrap();
        let decoded = codec.decode(&bytes, &Limits::default()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (33, 17));
    }

    #[test]
    fn higher_quality_is_not_smaller() {
        let image = textured(64, 64, false);
        let sizes: Vec<usize> = [10, 50, 90].iter().map(|&q| encode(&image, q).len()).collect();
        assert!(sizes[0] <= sizes[1] && sizes[1] <= sizes[2], "{sizes:?}");
    }

    #[test]
    fn too_wide_for_format() {
        let image = RasterImage::new(70_000, 1, vec![Rgba::new(0, 0, 0, 255); 70_000]).unwrap();
        let err = JpegCodec::default().encode(&image, Quality::MAX).unwrap_err();
        assert!(matches!(err, EncodeError::DimensionsExceedFormat { max: 65_535, .. }));
    }

    #[test]
    fn cmyk_conversion() {
        let pixels = to_rgba(jpeg_decoder::PixelFormat::CMYK32, &[0, 0, 0, 0, 255, 0, 0, 0]);
        assert_eq!(pixels, vec![Rgba::new(255, 255, 255, 255), Rgba::new(0, 255, 255, 255)]);
    }
}
