//! Image metadata inspection without pixel decode.

use crate::error::DecodeError;
use crate::probe::{self, ProbeResult};
use crate::registry::CodecRegistry;
use crate::format::ImageFormat;

/// Header-level description of an encoded image.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// False when the header cannot tell (GIF, paletted PNG).
    pub has_alpha: bool,
    pub has_animation: bool,
    pub bit_depth: Option<u8>,
}

impl ImageInfo {
    fn from_probe(probe: ProbeResult, width: u32, height: u32) -> Self {
        Self {
            format: probe.format,
            width,
            height,
            has_alpha: probe.has_alpha.unwrap_or(false),
            has_animation: probe.has_animation.unwrap_or(false),
            bit_depth: probe.bit_depth,
        }
    }
}

/// Probe partial image data.
///
/// Works on truncated data (e.g. the first few KiB of a file); fields the
/// data does not reach are `None`.
pub fn probe(data: &[u8]) -> Result<ProbeResult, DecodeError> {
    let format = ImageFormat::detect(data).ok_or(DecodeError::UnknownFormat)?;
    Ok(ProbeResult::for_format(data, format))
}

/// Probe image metadata, requiring complete dimensions.
pub fn from_bytes(data: &[u8]) -> Result<ImageInfo, DecodeError> {
    from_bytes_with_registry(data, &CodecRegistry::all())
}

/// Probe image metadata, accepting only formats the registry can decode.
pub fn from_bytes_with_registry(
    data: &[u8],
    registry: &CodecRegistry,
) -> Result<ImageInfo, DecodeError> {
    let format = ImageFormat::detect(data).ok_or(DecodeError::UnknownFormat)?;
    if !registry.can_decode(format) {
        return Err(DecodeError::DisabledFormat(format));
    }
    let (width, height) = probe::header_dimensions(data, format)?;
    Ok(ImageInfo::from_probe(
        ProbeResult::for_format(data, format),
        width,
        height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIF_HEADER: &[u8] = b"GIF89a\x20\x00\x10\x00\x00\x00\x00";

    #[test]
    fn unrecognized_format() {
        assert!(matches!(
            from_bytes(b"not an image"),
            Err(DecodeError::UnknownFormat)
        ));
        assert!(matches!(probe(b""), Err(DecodeError::UnknownFormat)));
    }

    #[test]
    fn disabled_format() {
        let registry = CodecRegistry::none();
        assert!(matches!(
            from_bytes_with_registry(GIF_HEADER, &registry),
            Err(DecodeError::DisabledFormat(ImageFormat::Gif))
        ));
    }

    #[test]
    fn gif_info() {
        let info = from_bytes(GIF_HEADER).unwrap();
        assert_eq!(info.format, ImageFormat::Gif);
        assert_eq!((info.width, info.height), (32, 16));
        assert!(!info.has_animation);
    }

    #[test]
    fn partial_probe_keeps_format() {
        let result = probe(&GIF_HEADER[..8]).unwrap();
        assert_eq!(result.format, ImageFormat::Gif);
        assert_eq!(result.width, None);
        assert!(matches!(
            from_bytes(&GIF_HEADER[..8]),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }
}
