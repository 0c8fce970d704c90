//! GIF codec adapter using the gif crate.
//!
//! Encoding quantizes to a palette of at most 256 entries (see
//! [`crate::quantize`]); decoding returns the first frame composited onto a
//! transparent canvas the size of the logical screen.

use std::borrow::Cow;

use rgb::Rgba;

use crate::config::CodecConfig;
use crate::error::{DecodeError, EncodeError};
use crate::format::ImageFormat;
use crate::limits::Limits;
use crate::pipeline::Quality;
use crate::probe::validated_dimensions;
use crate::quantize::{DitherMode, build_palette, map_pixels, palette_len_for_quality};
use crate::raster::RasterImage;

use super::{Decoder, Encoder, check_format_dimensions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GifCodec {
    pub dither: DitherMode,
    /// Palette size cap. `None` derives it from quality.
    pub max_colors: Option<u16>,
}

impl GifCodec {
    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            dither: config.gif_dither,
            max_colors: config.gif_max_colors,
        }
    }

    fn palette_len(&self, quality: Quality) -> usize {
        self.max_colors
            .map_or_else(|| palette_len_for_quality(quality), usize::from)
    }
}

fn map_decode_error(error: gif::DecodingError) -> DecodeError {
    match error {
        gif::DecodingError::Io(e) => DecodeError::from_io(ImageFormat::Gif, &e),
        other => DecodeError::corrupt(ImageFormat::Gif, other.to_string()),
    }
}

impl Decoder for GifCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Gif
    }

    fn decode(&self, data: &[u8], limits: &Limits) -> Result<RasterImage, DecodeError> {
        let (width, height) = validated_dimensions(data, ImageFormat::Gif, limits)?;

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(data).map_err(map_decode_error)?;

        let (left, top, frame_w, frame_h) = match decoder.next_frame_info().map_err(map_decode_error)? {
            Some(frame) => (
                frame.left as usize,
                frame.top as usize,
                frame.width as usize,
                frame.height as usize,
            ),
            None => return Err(DecodeError::corrupt(ImageFormat::Gif, "no image frames")),
        };
        limits.check_decode(frame_w as u64, frame_h as u64)?;

        let mut frame = vec![0u8; decoder.buffer_size()];
        decoder.read_into_buffer(&mut frame).map_err(map_decode_error)?;
        log::trace!("gif: {width}x{height} screen, first frame {frame_w}x{frame_h} at ({left}, {top})");

        let (w, h) = (width as usize, height as usize);
        let mut canvas = vec![Rgba::new(0, 0, 0, 0); w * h];
        if frame_w > 0 {
            for (y, row) in frame.chunks_exact(frame_w * 4).enumerate().take(frame_h) {
                let cy = top + y;
                if cy >= h {
                    break;
                }
                for (x, px) in row.chunks_exact(4).enumerate() {
                    let cx = left + x;
                    if cx >= w {
                        break;
                    }
                    canvas[cy * w + cx] = Rgba::new(px[0], px[1], px[2], px[3]);
                }
            }
        }

        RasterImage::new(width, height, canvas)
            .map_err(|e| DecodeError::corrupt(ImageFormat::Gif, e.to_string()))
    }
}

impl Encoder for GifCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Gif
    }

    fn encode(&self, image: &RasterImage, quality: Quality) -> Result<Vec<u8>, EncodeError> {
        check_format_dimensions(image, ImageFormat::Gif)?;
        let (width, height) = (image.width() as u16, image.height() as u16);

        let palette = build_palette(image.pixels(), self.palette_len(quality));
        let indices = map_pixels(image.as_img(), &palette, self.dither);

        let mut output = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut output, width, height, &palette.to_rgb_bytes())
                .map_err(|e| EncodeError::from_codec(ImageFormat::Gif, e))?;
            let frame = gif::Frame {
                width,
                height,
                buffer: Cow::Borrowed(&indices),
                transparent: palette.transparent_index(),
                ..gif::Frame::default()
            };
            encoder
                .write_frame(&frame)
                .map_err(|e| EncodeError::from_codec(ImageFormat::Gif, e))?;
        }
        Ok(output)
    }
}
