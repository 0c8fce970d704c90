//! Header probing without pixel decode.
//!
//! Pure byte parsing of each format's structural header: dimensions, alpha,
//! animation, and bit depth. Decoders call [`validated_dimensions`] before
//! any allocation sized from these untrusted fields.

use crate::error::DecodeError;
use crate::format::ImageFormat;
use crate::limits::Limits;

/// Result of probing (possibly partial) image data.
///
/// Every field except `format` is optional, since partial data may not
/// reach the field.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProbeResult {
    pub format: ImageFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_alpha: Option<bool>,
    pub has_animation: Option<bool>,
    /// Bits per channel as stored (8 or 16 for PNG, 8/12 for JPEG).
    pub bit_depth: Option<u8>,
    /// The data ended before the header was complete.
    pub truncated: bool,
    /// Number of bytes examined from the input.
    pub bytes_examined: usize,
}

impl ProbeResult {
    fn empty(format: ImageFormat) -> Self {
        Self {
            format,
            width: None,
            height: None,
            has_alpha: None,
            has_animation: None,
            bit_depth: None,
            truncated: false,
            bytes_examined: 0,
        }
    }

    fn short(format: ImageFormat, data: &[u8]) -> Self {
        Self {
            truncated: true,
            bytes_examined: data.len(),
            ..Self::empty(format)
        }
    }

    /// Probe data for a specific format.
    ///
    /// Does not verify magic bytes; the caller is responsible for detection.
    pub fn for_format(data: &[u8], format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => probe_png(data),
            ImageFormat::Gif => probe_gif(data),
            ImageFormat::WebP => probe_webp(data),
            ImageFormat::Jpeg => probe_jpeg(data),
        }
    }

    /// Both dimensions, when known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

/// Header dimensions, or the reason they cannot be trusted.
pub(crate) fn header_dimensions(data: &[u8], format: ImageFormat) -> Result<(u32, u32), DecodeError> {
    let probe = ProbeResult::for_format(data, format);
    match probe.dimensions() {
        Some((w, h)) if w > 0 && h > 0 => Ok((w, h)),
        Some((w, h)) => Err(DecodeError::corrupt(
            format,
            format!("header declares a {w}x{h} image"),
        )),
        None if probe.truncated => Err(DecodeError::TruncatedInput { format }),
        None => Err(DecodeError::corrupt(format, "missing or malformed image header")),
    }
}

/// Header dimensions checked against `limits`.
pub(crate) fn validated_dimensions(
    data: &[u8],
    format: ImageFormat,
    limits: &Limits,
) -> Result<(u32, u32), DecodeError> {
    let (width, height) = header_dimensions(data, format)?;
    limits.check_decode(width as u64, height as u64)?;
    log::trace!("{format} header: {width}x{height}");
    Ok((width, height))
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn le_u24(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], 0])
}

// PNG: 8-byte signature, then IHDR (4 len + 4 type + 13 data + 4 CRC).
fn probe_png(data: &[u8]) -> ProbeResult {
    const IHDR_END: usize = 33;
    if data.len() < IHDR_END {
        return ProbeResult::short(ImageFormat::Png, data);
    }
    let mut result = ProbeResult {
        bytes_examined: IHDR_END,
        ..ProbeResult::empty(ImageFormat::Png)
    };
    if &data[12..16] != b"IHDR" {
        return result;
    }

    let color_type = data[25];
    result.width = Some(be_u32(&data[16..20]));
    result.height = Some(be_u32(&data[20..24]));
    result.bit_depth = Some(data[24]);
    // Palette images gain alpha from a tRNS chunk, which a header probe can't see.
    result.has_alpha = match color_type {
        4 | 6 => Some(true),
        0 | 2 => Some(false),
        _ => None,
    };
    result
}

// GIF: 6-byte version tag, then the 7-byte logical screen descriptor.
fn probe_gif(data: &[u8]) -> ProbeResult {
    if data.len() < 13 {
        return ProbeResult::short(ImageFormat::Gif, data);
    }
    ProbeResult {
        width: Some(u16::from_le_bytes([data[6], data[7]]) as u32),
        height: Some(u16::from_le_bytes([data[8], data[9]]) as u32),
        // Transparency lives in per-frame graphic control extensions.
        has_alpha: None,
        bit_depth: Some(8),
        bytes_examined: 13,
        ..ProbeResult::empty(ImageFormat::Gif)
    }
}

// WebP: RIFF header (12 bytes), then the first chunk header at 12..20.
//
// - VP8X: flags at 20, canvas size minus one as 24-bit LE at 24..30
// - VP8 : frame tag 20..23, start code 9D 01 2A, 14-bit sizes at 26..30
// - VP8L: signature 0x2F at 20, 14-bit sizes minus one packed in 21..25
fn probe_webp(data: &[u8]) -> ProbeResult {
    if data.len() < 16 {
        return ProbeResult::short(ImageFormat::WebP, data);
    }
    let mut result = ProbeResult::empty(ImageFormat::WebP);

    match &data[12..16] {
        b"VP8X" => {
            if data.len() < 30 {
                return ProbeResult::short(ImageFormat::WebP, data);
            }
            let flags = data[20];
            result.width = Some(le_u24(&data[24..27]) + 1);
            result.height = Some(le_u24(&data[27..30]) + 1);
            result.has_alpha = Some(flags & 0x10 != 0);
            result.has_animation = Some(flags & 0x02 != 0);
            result.bit_depth = Some(8);
            result.bytes_examined = 30;
        }
        b"VP8 " => {
            if data.len() < 30 {
                return ProbeResult::short(ImageFormat::WebP, data);
            }
            result.bytes_examined = 30;
            if data[23..26] == [0x9D, 0x01, 0x2A] {
                let width = u16::from_le_bytes([data[26], data[27]]) & 0x3FFF;
                let height = u16::from_le_bytes([data[28], data[29]]) & 0x3FFF;
                result.width = Some(width as u32);
                result.height = Some(height as u32);
                result.has_alpha = Some(false);
                result.has_animation = Some(false);
                result.bit_depth = Some(8);
            }
        }
        b"VP8L" => {
            if data.len() < 25 {
                return ProbeResult::short(ImageFormat::WebP, data);
            }
            result.bytes_examined = 25;
            if data[20] == 0x2F {
                let bits = u32::from_le_bytes([data[21], data[22], data[23], data[24]]);
                result.width = Some((bits & 0x3FFF) + 1);
                result.height = Some(((bits >> 14) & 0x3FFF) + 1);
                result.has_alpha = Some(bits & (1 << 28) != 0);
                result.has_animation = Some(false);
                result.bit_depth = Some(8);
            }
        }
        _ => result.bytes_examined = 16,
    }
    result
}

// JPEG: walk marker segments after SOI until a SOFn marker.
//
// Standalone markers (TEM, RSTn) have no length. SOS or EOI before any SOF
// means the frame header is missing.
fn probe_jpeg(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult {
        has_alpha: Some(false),
        has_animation: Some(false),
        ..ProbeResult::empty(ImageFormat::Jpeg)
    };
    let mut pos = 2;

    loop {
        if pos + 1 >= data.len() {
            result.truncated = true;
            break;
        }
        if data[pos] != 0xFF {
            // lost sync
            break;
        }
        // fill bytes
        while pos + 1 < data.len() && data[pos + 1] == 0xFF {
            pos += 1;
        }
        let Some(&marker) = data.get(pos + 1) else {
            result.truncated = true;
            break;
        };
        pos += 2;

        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        if marker == 0xDA || marker == 0xD9 || marker == 0x00 {
            break;
        }

        let Some(len_bytes) = data.get(pos..pos + 2) else {
            result.truncated = true;
            break;
        };
        let seg_len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;

        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            // length (2) + precision (1) + height (2) + width (2)
            let Some(sof) = data.get(pos..pos + 7) else {
                result.truncated = true;
                break;
            };
            result.bit_depth = Some(sof[2]);
            result.height = Some(u16::from_be_bytes([sof[3], sof[4]]) as u32);
            result.width = Some(u16::from_be_bytes([sof[5], sof[6]]) as u32);
            pos += 7;
            break;
        }

        if seg_len < 2 {
            break;
        }
        pos += seg_len;
    }

    result.bytes_examined = pos.min(data.len());
    result
}
