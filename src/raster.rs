//! Canonical decoded raster and borrowed source buffers.

use imgref::{ImgRef, ImgVec};
use rgb::{ComponentBytes, Rgba};

use crate::error::RasterError;
use crate::format::ImageFormat;

/// Row-major, non-premultiplied RGBA8 image.
///
/// Width and height are non-zero and the buffer holds exactly
/// `width * height` pixels. Immutable once built; encoders borrow it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pixels: ImgVec<Rgba<u8>>,
}

impl RasterImage {
    /// Wrap a pixel buffer, checking the shape invariants.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba<u8>>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::ZeroDimension { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels: ImgVec::new(pixels, width as usize, height as usize),
        })
    }

    /// Build from interleaved RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, RasterError> {
        if bytes.len() % 4 != 0 {
            return Err(RasterError::BufferSize {
                expected: width as usize * height as usize,
                actual: bytes.len() / 4,
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| Rgba::new(c[0], c[1], c[2], c[3]))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Build from interleaved RGB8 bytes with every pixel opaque.
    pub fn from_rgb8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, RasterError> {
        if bytes.len() % 3 != 0 {
            return Err(RasterError::BufferSize {
                expected: width as usize * height as usize,
                actual: bytes.len() / 3,
            });
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|c| Rgba::new(c[0], c[1], c[2], 255))
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.height() as u32
    }

    pub fn pixels(&self) -> &[Rgba<u8>] {
        self.pixels.buf()
    }

    /// Interleaved RGBA8 bytes, `width * height * 4` long.
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.buf().as_bytes()
    }

    pub fn as_img(&self) -> ImgRef<'_, Rgba<u8>> {
        self.pixels.as_ref()
    }

    /// Whether any pixel is less than fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.pixels().iter().any(|p| p.a != 255)
    }

    /// Decoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels().len() * 4
    }
}

/// Encoded bytes borrowed from the caller, tagged with their sniffed format.
#[derive(Clone, Copy, Debug)]
pub struct SourceAsset<'a> {
    bytes: &'a [u8],
    format: Option<ImageFormat>,
}

impl<'a> SourceAsset<'a> {
    /// Borrow `bytes` and sniff their format.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            format: ImageFormat::detect(bytes),
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Sniffed format, `None` when no signature matched.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        assert_eq!(
            RasterImage::new(0, 4, Vec::new()),
            Err(RasterError::ZeroDimension { width: 0, height: 4 })
        );
    }

    #[test]
    fn rejects_short_buffer() {
        let err = RasterImage::new(2, 2, vec![Rgba::new(0, 0, 0, 255); 3]).unwrap_err();
        assert_eq!(err, RasterError::BufferSize { expected: 4, actual: 3 });
    }

    #[test]
    fn rgb_input_is_opaque() {
        let img = RasterImage::from_rgb8(2, 1, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(img.as_bytes(), &[1, 2, 3, 255, 4, 5, 6, 255]);
        assert!(!img.has_transparency());
    }

    #[test]
    fn byte_view_matches_pixels() {
        let img = RasterImage::from_rgba8(1, 2, &[9, 8, 7, 6, 5, 4, 3, 2]).unwrap();
        assert_eq!(img.width(), 1);
        assert_eq!(img.height(), 2);
        assert_eq!(img.byte_len(), 8);
        assert_eq!(img.pixels()[1], Rgba::new(5, 4, 3, 2));
        assert!(img.has_transparency());
    }

    #[test]
    fn source_asset_sniffs() {
        let png = SourceAsset::new(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(png.format(), Some(ImageFormat::Png));
        assert_eq!(SourceAsset::new(b"hello").format(), None);
    }
}
