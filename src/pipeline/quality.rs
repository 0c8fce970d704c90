//! Quality values and preset mapping.

use crate::error::EncodeError;
use crate::format::ImageFormat;

/// Encoder quality in `1..=100`.
///
/// For JPEG and WebP this scales quantization; WebP at 100 switches to the
/// lossless encoder. For PNG it picks compression effort and for GIF the
/// palette size. Out-of-range values cannot be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(1);
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u8) -> Result<Self, EncodeError> {
        if (1..=100).contains(&value) {
            Ok(Quality(value))
        } else {
            Err(EncodeError::InvalidQuality(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Quality {
    type Error = EncodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Quality::new(value)
    }
}

/// Quality presets with approximate perceptual equivalence across formats.
///
/// | Preset       | JPEG | WebP     | PNG effort | GIF colors |
/// |--------------|------|----------|------------|------------|
/// | Lossless     | 100  | lossless | high       | 256        |
/// | NearLossless | 97   | 95       | high       | 256        |
/// | HighQuality  | 90   | 90       | high       | 256        |
/// | Balanced     | 80   | 80       | high       | 204        |
/// | SmallFile    | 60   | 60       | balanced   | 127        |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QualityPreset {
    /// Lossless where the format allows it, maximum quality otherwise.
    Lossless,
    /// Visually indistinguishable from source.
    NearLossless,
    /// High quality, small artifacts acceptable.
    HighQuality,
    /// Good balance of quality and file size.
    Balanced,
    /// Prioritize small file size.
    SmallFile,
    /// Explicit quality, validated when the conversion runs.
    Custom(u8),
}

impl QualityPreset {
    /// Concrete quality value for the given target format.
    pub fn for_format(self, format: ImageFormat) -> u8 {
        let lossless_only = !format.supports_lossy();
        match self {
            QualityPreset::Lossless => 100,
            QualityPreset::NearLossless if lossless_only => 100,
            QualityPreset::NearLossless => match format {
                ImageFormat::WebP => 95,
                _ => 97,
            },
            QualityPreset::HighQuality if lossless_only => 100,
            QualityPreset::HighQuality => 90,
            QualityPreset::Balanced => 80,
            QualityPreset::SmallFile if lossless_only => 50,
            QualityPreset::SmallFile => 60,
            QualityPreset::Custom(q) => q,
        }
    }
}
