//! Runtime codec registry for enabling/disabling formats.

use crate::format::ImageFormat;

/// Set of image formats represented as bitflags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FormatSet(u8);

impl FormatSet {
    const EMPTY: Self = FormatSet(0);
    const ALL: Self = FormatSet(0b1111);

    fn bit(format: ImageFormat) -> u8 {
        match format {
            ImageFormat::Jpeg => 1 << 0,
            ImageFormat::Png => 1 << 1,
            ImageFormat::WebP => 1 << 2,
            ImageFormat::Gif => 1 << 3,
        }
    }

    fn contains(self, format: ImageFormat) -> bool {
        self.0 & Self::bit(format) != 0
    }

    fn set(&mut self, format: ImageFormat, enabled: bool) {
        if enabled {
            self.0 |= Self::bit(format);
        } else {
            self.0 &= !Self::bit(format);
        }
    }

    fn iter(self) -> impl Iterator<Item = ImageFormat> {
        ImageFormat::ALL.into_iter().filter(move |&f| self.contains(f))
    }
}

/// Which formats may be decoded and encoded.
///
/// Every codec is always compiled in; the registry only narrows what a
/// [`Transcoder`](crate::Transcoder) accepts, e.g. to refuse GIF output
/// for a particular caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecRegistry {
    decode_enabled: FormatSet,
    encode_enabled: FormatSet,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::all()
    }
}

impl CodecRegistry {
    /// All codecs enabled.
    pub fn all() -> Self {
        Self {
            decode_enabled: FormatSet::ALL,
            encode_enabled: FormatSet::ALL,
        }
    }

    /// Nothing enabled; the caller must opt in.
    pub fn none() -> Self {
        Self {
            decode_enabled: FormatSet::EMPTY,
            encode_enabled: FormatSet::EMPTY,
        }
    }

    /// Enable or disable decoding for a format.
    pub fn with_decode(mut self, format: ImageFormat, enabled: bool) -> Self {
        self.decode_enabled.set(format, enabled);
        self
    }

    /// Enable or disable encoding for a format.
    pub fn with_encode(mut self, format: ImageFormat, enabled: bool) -> Self {
        self.encode_enabled.set(format, enabled);
        self
    }

    pub fn can_decode(&self, format: ImageFormat) -> bool {
        self.decode_enabled.contains(format)
    }

    pub fn can_encode(&self, format: ImageFormat) -> bool {
        self.encode_enabled.contains(format)
    }

    /// Formats enabled for decoding.
    pub fn decodable_formats(&self) -> impl Iterator<Item = ImageFormat> {
        self.decode_enabled.iter()
    }

    /// Formats enabled for encoding.
    pub fn encodable_formats(&self) -> impl Iterator<Item = ImageFormat> {
        self.encode_enabled.iter()
    }
}
