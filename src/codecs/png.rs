//! PNG codec adapter using the png crate.

use std::io::Cursor;

use rgb::Rgba;

use crate::config::{CodecConfig, PngCompression};
use crate::error::{DecodeError, EncodeError};
use crate::format::ImageFormat;
use crate::limits::Limits;
use crate::pipeline::Quality;
use crate::probe::validated_dimensions;
use crate::raster::RasterImage;

use super::{Decoder, Encoder, check_format_dimensions};

/// Lossless PNG codec.
///
/// Quality only selects compression effort; decoded pixels are identical at
/// every setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PngCodec {
    /// Fixed compression effort. `None` derives it from quality.
    pub compression: Option<PngCompression>,
}

impl PngCodec {
    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            compression: config.png_compression,
        }
    }

    fn compression_for(&self, quality: Quality) -> PngCompression {
        self.compression.unwrap_or(match quality.get() {
            1..=33 => PngCompression::Fast,
            34..=66 => PngCompression::Balanced,
            _ => PngCompression::High,
        })
    }
}

fn map_decode_error(error: png::DecodingError) -> DecodeError {
    match error {
        png::DecodingError::IoError(e) => DecodeError::from_io(ImageFormat::Png, &e),
        png::DecodingError::LimitsExceeded => DecodeError::DimensionsExceedLimit {
            width: 0,
            height: 0,
            reason: "png decoder memory limit exceeded",
        },
        other => DecodeError::corrupt(ImageFormat::Png, other.to_string()),
    }
}

impl Decoder for PngCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn decode(&self, data: &[u8], limits: &Limits) -> Result<RasterImage, DecodeError> {
        let (width, height) = validated_dimensions(data, ImageFormat::Png, limits)?;

        let mut png_limits = png::Limits::default();
        png_limits.bytes = limits
            .max_memory_bytes
            .map_or(usize::MAX, |max| usize::try_from(max).unwrap_or(usize::MAX));
        let mut decoder = png::Decoder::new_with_limits(Cursor::new(data), png_limits);
        decoder.set_transformations(png::Transformations::normalize_to_color8());

        let mut reader = decoder.read_info().map_err(map_decode_error)?;
        let buffer_size = reader
            .output_buffer_size()
            .ok_or_else(|| DecodeError::corrupt(ImageFormat::Png, "output buffer size overflows"))?;
        let mut buf = vec![0u8; buffer_size];
        let frame = reader.next_frame(&mut buf).map_err(map_decode_error)?;
        buf.truncate(frame.buffer_size());

        let (color_type, bit_depth) = reader.output_color_type();
        if bit_depth != png::BitDepth::Eight {
            return Err(DecodeError::unsupported(
                ImageFormat::Png,
                format!("{bit_depth:?} output after normalization"),
            ));
        }
        log::trace!("png: {width}x{height} {color_type:?}");

        let image = match color_type {
            png::ColorType::Rgba => RasterImage::from_rgba8(width, height, &buf),
            png::ColorType::Rgb => RasterImage::from_rgb8(width, height, &buf),
            png::ColorType::GrayscaleAlpha => {
                let pixels = buf
                    .chunks_exact(2)
                    .map(|ga| Rgba::new(ga[0], ga[0], ga[0], ga[1]))
                    .collect();
                RasterImage::new(width, height, pixels)
            }
            png::ColorType::Grayscale => {
                let pixels = buf.iter().map(|&g| Rgba::new(g, g, g, 255)).collect();
                RasterImage::new(width, height, pixels)
            }
            png::ColorType::Indexed => {
                return Err(DecodeError::unsupported(
                    ImageFormat::Png,
                    "indexed output after expansion",
                ));
            }
        };
        image.map_err(|e| DecodeError::corrupt(ImageFormat::Png, e.to_string()))
    }
}

impl Encoder for PngCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn encode(&self, image: &RasterImage, quality: Quality) -> Result<Vec<u8>, EncodeError> {
        check_format_dimensions(image, ImageFormat::Png)?;

        // Opaque images drop the alpha channel; pixels are unchanged.
        let opaque = !image.has_transparency();
        let rgb_bytes;
        let (color, bytes) = if opaque {
            rgb_bytes = image
                .pixels()
                .iter()
                .flat_map(|p| [p.r, p.g, p.b])
                .collect::<Vec<u8>>();
            (png::ColorType::Rgb, rgb_bytes.as_slice())
        } else {
            (png::ColorType::Rgba, image.as_bytes())
        };

        let mut output = Vec::new();
        let mut encoder = png::Encoder::new(&mut output, image.width(), image.height());
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(self.compression_for(quality).to_png());

        let mut writer = encoder
            .write_header()
            .map_err(|e| EncodeError::from_codec(ImageFormat::Png, e))?;
        writer
            .write_image_data(bytes)
            .map_err(|e| EncodeError::from_codec(ImageFormat::Png, e))?;
        writer
            .finish()
            .map_err(|e| EncodeError::from_codec(ImageFormat::Png, e))?;

        Ok(output)
    }
}
