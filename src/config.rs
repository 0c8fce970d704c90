//! Format-specific codec configuration.
//!
//! The [`CodecConfig`] struct bundles all format-specific overrides into a
//! single value. When a field is unset, the codec derives its setting from
//! the request quality.

use crate::quantize::DitherMode;

/// PNG deflate effort. Output pixels are identical at every level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PngCompression {
    Fast,
    #[default]
    Balanced,
    High,
}

impl PngCompression {
    pub(crate) fn to_png(self) -> png::Compression {
        match self {
            PngCompression::Fast => png::Compression::Fast,
            PngCompression::Balanced => png::Compression::Balanced,
            PngCompression::High => png::Compression::High,
        }
    }
}

/// Format-specific configuration overrides.
///
/// # Example
///
/// ```
/// use transcodecs::{CodecConfig, DitherMode, PngCompression};
///
/// let config = CodecConfig::default()
///     .with_png_compression(PngCompression::High)
///     .with_gif_dither(DitherMode::Ordered);
/// assert_eq!(config.gif_dither, DitherMode::Ordered);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct CodecConfig {
    /// Emit progressive JPEG scans instead of baseline.
    pub jpeg_progressive: bool,

    /// PNG compression effort (overrides the quality mapping).
    pub png_compression: Option<PngCompression>,

    /// libwebp lossy method, 0 (fast) to 6 (slow, smaller). Default 4.
    pub webp_method: Option<u8>,

    /// Error diffusion or noise applied when mapping pixels to a GIF palette.
    pub gif_dither: DitherMode,

    /// Palette size cap for GIF output (overrides the quality mapping).
    pub gif_max_colors: Option<u16>,
}

impl CodecConfig {
    pub fn with_jpeg_progressive(mut self, progressive: bool) -> Self {
        self.jpeg_progressive = progressive;
        self
    }

    /// Set PNG compression level.
    pub fn with_png_compression(mut self, compression: PngCompression) -> Self {
        self.png_compression = Some(compression);
        self
    }

    /// Set the WebP lossy method, clamped to 0..=6.
    pub fn with_webp_method(mut self, method: u8) -> Self {
        self.webp_method = Some(method.min(6));
        self
    }

    pub fn with_gif_dither(mut self, dither: DitherMode) -> Self {
        self.gif_dither = dither;
        self
    }

    /// Cap the GIF palette, clamped to 2..=256 entries.
    pub fn with_gif_max_colors(mut self, colors: u16) -> Self {
        self.gif_max_colors = Some(colors.clamp(2, 256));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_defer_to_quality() {
        let config = CodecConfig::default();
        assert!(!config.jpeg_progressive);
        assert_eq!(config.png_compression, None);
        assert_eq!(config.webp_method, None);
        assert_eq!(config.gif_max_colors, None);
        assert_eq!(config.gif_dither, DitherMode::FloydSteinberg);
    }

    #[test]
    fn builders_clamp() {
        let config = CodecConfig::default()
            .with_webp_method(9)
            .with_gif_max_colors(1000);
        assert_eq!(config.webp_method, Some(6));
        assert_eq!(config.gif_max_colors, Some(256));
        assert_eq!(CodecConfig::default().with_gif_max_colors(0).gif_max_colors, Some(2));
    }

    #[test]
    fn png_compression_override_compares() {
        let config = CodecConfig::default().with_png_compression(PngCompression::High);
        assert_eq!(config.png_compression, Some(PngCompression::High));
        assert_ne!(config, CodecConfig::default());
        assert!(matches!(PngCompression::Fast.to_png(), png::Compression::Fast));
        assert!(matches!(PngCompression::High.to_png(), png::Compression::High));
    }
}
