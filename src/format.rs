//! Image format detection and per-format capabilities.

/// The raster formats the transcoder reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl ImageFormat {
    /// Every supported format, in registry order.
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::WebP,
        ImageFormat::Gif,
    ];

    /// Detect format from magic bytes. Returns None if unrecognized.
    ///
    /// Buffers shorter than a signature never match.
    pub fn detect(data: &[u8]) -> Option<Self> {
        // JPEG: SOI. What follows is left to the header parser.
        if data.starts_with(&[0xFF, 0xD8]) {
            return Some(ImageFormat::Jpeg);
        }

        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // WebP: "RIFF" <u32 size> "WEBP"
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }

    /// Detect format from file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            "gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }

    /// MIME type string.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Common file extensions, preferred one first.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ImageFormat::Jpeg => &["jpg", "jpeg", "jpe", "jfif"],
            ImageFormat::Png => &["png"],
            ImageFormat::WebP => &["webp"],
            ImageFormat::Gif => &["gif"],
        }
    }

    /// Preferred file extension.
    pub fn extension(self) -> &'static str {
        self.extensions()[0]
    }

    /// Whether quality trades fidelity for size in this format.
    pub fn supports_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::WebP)
    }

    /// Whether this format can store pixels exactly.
    ///
    /// GIF is lossless only for images with at most 256 colors.
    pub fn supports_lossless(self) -> bool {
        matches!(self, ImageFormat::Png | ImageFormat::WebP | ImageFormat::Gif)
    }

    /// Whether this format can carry animation.
    pub fn supports_animation(self) -> bool {
        matches!(self, ImageFormat::WebP | ImageFormat::Gif)
    }

    /// Whether this format has an alpha channel (binary for GIF).
    pub fn supports_alpha(self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }

    /// Largest width or height the format can store.
    pub fn max_dimension(self) -> u32 {
        match self {
            ImageFormat::Jpeg | ImageFormat::Gif => u16::MAX as u32,
            ImageFormat::WebP => 16_383,
            ImageFormat::Png => i32::MAX as u32,
        }
    }

    /// Bytes needed for a header probe to report dimensions.
    ///
    /// JPEG has no fixed bound (the SOF marker can follow arbitrary
    /// metadata), so its value is only a typical minimum.
    pub fn min_probe_bytes(self) -> usize {
        match self {
            ImageFormat::Png => 33,
            ImageFormat::Gif => 13,
            ImageFormat::WebP => 30,
            ImageFormat::Jpeg => 2048,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
            ImageFormat::Gif => "gif",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_jpeg() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert_eq!(ImageFormat::detect(&data), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0x00]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD9]), None);
    }

    #[test]
    fn detect_png() {
        let data = [
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
        ];
        assert_eq!(ImageFormat::detect(&data), Some(ImageFormat::Png));
    }

    #[test]
    fn detect_gif_both_versions() {
        assert_eq!(ImageFormat::detect(b"GIF87a\x01\x00"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::detect(b"GIF89a\x01\x00"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::detect(b"GIF88a\x01\x00"), None);
    }

    #[test]
    fn detect_webp() {
        let data = b"RIFF\x00\x00\x00\x00WEBP";
        assert_eq!(ImageFormat::detect(data), Some(ImageFormat::WebP));
    }

    #[test]
    fn riff_without_webp_is_unknown() {
        assert_eq!(ImageFormat::detect(b"RIFF\x00\x00\x00\x00WAVE"), None);
    }

    #[test]
    fn detect_too_short() {
        assert_eq!(ImageFormat::detect(&[0xFF]), None);
        assert_eq!(ImageFormat::detect(&[0x89, b'P', b'N']), None);
        assert_eq!(ImageFormat::detect(b"RIFF"), None);
        assert_eq!(ImageFormat::detect(&[]), None);
    }

    #[test]
    fn from_extension_case_insensitive() {
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("WebP"), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_extension("avif"), None);
    }

    #[test]
    fn preferred_extension_round_trips() {
        for format in ImageFormat::ALL {
            assert_eq!(ImageFormat::from_extension(format.extension()), Some(format));
        }
    }
}
