//! Error taxonomy for decode, encode, and whole conversions.
//!
//! Codec-crate errors are folded into these enums at the adapter boundary,
//! so callers only ever match on the variants below.

use std::io;

use thiserror::Error;

use crate::format::ImageFormat;

/// Failure while turning encoded bytes into a [`RasterImage`](crate::RasterImage).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The buffer ended before the image (or its header) was complete.
    #[error("{format:?} input is truncated")]
    TruncatedInput { format: ImageFormat },

    /// Structural data is invalid or self-contradictory.
    #[error("corrupt {format:?} data: {detail}")]
    CorruptHeader { format: ImageFormat, detail: String },

    /// Valid file using a feature this decoder does not handle.
    #[error("unsupported {format:?} variant: {detail}")]
    UnsupportedVariant { format: ImageFormat, detail: String },

    /// Declared dimensions exceed the configured [`Limits`](crate::Limits).
    #[error("{width}x{height} image rejected: {reason}")]
    DimensionsExceedLimit {
        width: u64,
        height: u64,
        reason: &'static str,
    },

    /// No known signature matched.
    #[error("unrecognized image format")]
    UnknownFormat,

    /// Format recognized but decoding is disabled in the registry.
    #[error("decoding {0:?} is disabled in the codec registry")]
    DisabledFormat(ImageFormat),
}

impl DecodeError {
    pub(crate) fn corrupt(format: ImageFormat, detail: impl Into<String>) -> Self {
        DecodeError::CorruptHeader {
            format,
            detail: detail.into(),
        }
    }

    pub(crate) fn unsupported(format: ImageFormat, detail: impl Into<String>) -> Self {
        DecodeError::UnsupportedVariant {
            format,
            detail: detail.into(),
        }
    }

    /// Map an I/O error raised inside a codec crate.
    ///
    /// Every decoder here reads from an in-memory slice, so an I/O error can
    /// only mean the slice ran out.
    pub(crate) fn from_io(format: ImageFormat, error: &io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::TruncatedInput { format }
        } else {
            DecodeError::corrupt(format, error.to_string())
        }
    }
}

/// Failure while turning a raster into encoded bytes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// Quality outside `1..=100`.
    #[error("quality {0} is outside 1..=100")]
    InvalidQuality(u8),

    /// No encoder is available or enabled for the format.
    #[error("encoding to {0:?} is not supported")]
    UnsupportedTargetFormat(ImageFormat),

    /// The raster is larger than the target format can represent.
    #[error("{width}x{height} exceeds the {format:?} maximum of {max} pixels per side")]
    DimensionsExceedFormat {
        format: ImageFormat,
        width: u32,
        height: u32,
        max: u32,
    },

    /// The underlying codec rejected the input.
    #[error("{format:?} encoder failed: {message}")]
    Codec {
        format: ImageFormat,
        message: String,
    },
}

impl EncodeError {
    /// Wrap a codec-specific error.
    pub(crate) fn from_codec(format: ImageFormat, error: impl std::fmt::Display) -> Self {
        EncodeError::Codec {
            format,
            message: error.to_string(),
        }
    }
}

/// Outcome of a failed conversion request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConversionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The batch was cancelled before this item started.
    #[error("conversion cancelled before it started")]
    Cancelled,
}

/// A raster buffer that violates its shape invariants.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RasterError {
    #[error("raster dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("raster buffer holds {actual} pixels, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_truncated() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            DecodeError::from_io(ImageFormat::Png, &err),
            DecodeError::TruncatedInput {
                format: ImageFormat::Png
            }
        ));
    }

    #[test]
    fn other_io_maps_to_corrupt() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "bad crc");
        let mapped = DecodeError::from_io(ImageFormat::Gif, &err);
        assert!(matches!(mapped, DecodeError::CorruptHeader { .. }));
        assert!(mapped.to_string().contains("bad crc"));
    }

    #[test]
    fn conversion_error_is_transparent() {
        let err: ConversionError = EncodeError::InvalidQuality(0).into();
        assert_eq!(err.to_string(), "quality 0 is outside 1..=100");
    }
}
