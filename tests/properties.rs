//! End-to-end properties of the conversion pipeline, exercised through the
//! public API only.

use std::collections::{HashMap, HashSet};

use nanorand::{Rng, WyRand};
use rgb::Rgba;
use transcodecs::{
    CodecConfig, ConversionError, ConversionRequest, DecodeError, DitherMode, ImageFormat,
    RasterImage, Transcoder,
};

/// Smooth gradient with seeded noise, so lossy encoders have real detail to
/// spend bits on.
fn photo_like(width: u32, height: u32, seed: u64) -> RasterImage {
    let mut rng = WyRand::new_seed(seed);
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let mut jitter = || rng.generate_range(0u8..24);
            let r = (x * 200 / width) as u8 + jitter();
            let g = (y * 200 / height) as u8 + jitter();
            let b = ((x + y) * 100 / (width + height)) as u8 + jitter();
            pixels.push(Rgba::new(r, g, b, 255));
        }
    }
    RasterImage::new(width, height, pixels).unwrap()
}

fn with_alpha_ramp(image: &RasterImage) -> RasterImage {
    let width = image.width();
    let pixels = image
        .pixels()
        .iter()
        .enumerate()
        .map(|(i, p)| Rgba::new(p.r, p.g, p.b, ((i as u32 % width) * 255 / (width - 1)) as u8))
        .collect();
    RasterImage::new(width, image.height(), pixels).unwrap()
}

fn encode_png(image: &RasterImage) -> Vec<u8> {
    Transcoder::new().encode(image, ImageFormat::Png, 100).unwrap()
}

#[test]
fn png_roundtrip_is_pixel_identical() {
    let transcoder = Transcoder::new();
    let original = with_alpha_ramp(&photo_like(61, 47, 1));

    let first = encode_png(&original);
    let (format, decoded) = transcoder.decode(&first).unwrap();
    assert_eq!(format, ImageFormat::Png);
    assert_eq!(decoded, original);

    let second = transcoder.convert_one(&first, ImageFormat::Png, 40).unwrap();
    let (_, decoded_again) = transcoder.decode(&second.output_bytes).unwrap();
    assert_eq!(decoded_again, original);
}

#[test]
fn lossy_size_grows_with_quality() {
    let source = encode_png(&photo_like(128, 128, 2));
    for format in [ImageFormat::Jpeg, ImageFormat::WebP] {
        let sizes: Vec<usize> = [10, 50, 90]
            .into_iter()
            .map(|q| {
                transcodecs::convert_one(&source, format, q)
                    .unwrap()
                    .output_byte_size
            })
            .collect();
        assert!(
            sizes.windows(2).all(|w| w[0] <= w[1]),
            "{format} sizes not monotonic: {sizes:?}"
        );
    }
}

#[test]
fn huge_declared_dimensions_are_rejected_early() {
    // PNG: signature + IHDR claiming 100000x100000 RGBA, no image data.
    let mut png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR".to_vec();
    png.extend_from_slice(&100_000u32.to_be_bytes());
    png.extend_from_slice(&100_000u32.to_be_bytes());
    png.extend_from_slice(&[8, 6, 0, 0, 0]);
    png.extend_from_slice(&[0, 0, 0, 0]);

    // WebP: extended header with a 100000x100000 canvas.
    let mut webp = b"RIFF\x16\x00\x00\x00WEBPVP8X\x0a\x00\x00\x00\x10\x00\x00\x00".to_vec();
    let side = (100_000u32 - 1).to_le_bytes();
    webp.extend_from_slice(&side[..3]);
    webp.extend_from_slice(&side[..3]);

    // GIF: logical screen descriptor claiming 65535x65535.
    let mut gif = b"GIF89a".to_vec();
    gif.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00]);

    // JPEG: SOI then a baseline SOF0 for a 65535x65535 three-component frame.
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08];
    jpeg.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0x03]);
    jpeg.extend_from_slice(&[1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);

    for data in [png, webp, gif, jpeg] {
        let err = transcodecs::convert_one(&data, ImageFormat::Jpeg, 80).unwrap_err();
        assert!(
            matches!(
                err,
                ConversionError::Decode(
                    DecodeError::DimensionsExceedLimit { .. } | DecodeError::TruncatedInput { .. }
                )
            ),
            "{err:?}"
        );
    }
}

#[test]
fn alpha_survives_lossless_webp_and_jpeg_is_opaque() {
    let original = with_alpha_ramp(&photo_like(40, 30, 3));
    assert!(original.has_transparency());
    let png = encode_png(&original);
    let transcoder = Transcoder::new();

    let webp = transcoder.convert_one(&png, ImageFormat::WebP, 100).unwrap();
    let (_, from_webp) = transcoder.decode(&webp.output_bytes).unwrap();
    assert_eq!(from_webp, original);

    let jpeg = transcoder.convert_one(&png, ImageFormat::Jpeg, 90).unwrap();
    let (_, from_jpeg) = transcoder.decode(&jpeg.output_bytes).unwrap();
    assert!(from_jpeg.pixels().iter().all(|p| p.a == 255));
}

#[test]
fn corrupt_item_does_not_affect_siblings() {
    let good: Vec<Vec<u8>> = (0..5).map(|seed| encode_png(&photo_like(24, 16, seed))).collect();
    let corrupt = good[2][..20].to_vec();

    let requests: Vec<ConversionRequest<'_>> = (0..5)
        .map(|i| {
            let bytes = if i == 2 { &corrupt } else { &good[i] };
            ConversionRequest::new(bytes, ImageFormat::WebP, 75)
        })
        .collect();

    let results = transcodecs::convert_batch(&requests, 3);
    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        if i == 2 {
            assert!(matches!(result, Err(ConversionError::Decode(_))), "{result:?}");
        } else {
            let out = result.as_ref().unwrap();
            assert_eq!((out.width, out.height), (24, 16));
            assert_eq!(out.source_byte_size, good[i].len());
        }
    }
}

#[test]
fn gif_palette_is_bounded_and_groups_close_colors() {
    // Eight horizontal bands; within a band every channel varies by at most 4.
    let (width, band_height) = (64u32, 8u32);
    let mut rng = WyRand::new_seed(4);
    let mut pixels = Vec::new();
    for band in 0..8u8 {
        let base = [20 + band * 28, 200 - band * 20, 60 + band * 10];
        for _ in 0..width * band_height {
            let mut near = |c: u8| c - 2 + rng.generate_range(0u8..5);
            pixels.push(Rgba::new(near(base[0]), near(base[1]), near(base[2]), 255));
        }
    }
    let image = RasterImage::new(width, band_height * 8, pixels).unwrap();

    let transcoder =
        Transcoder::new().with_codec_config(CodecConfig::default().with_gif_dither(DitherMode::None));
    let gif = transcoder.encode(&image, ImageFormat::Gif, 100).unwrap();
    let (format, decoded) = transcoder.decode(&gif).unwrap();
    assert_eq!(format, ImageFormat::Gif);

    let distinct: HashSet<Rgba<u8>> = decoded.pixels().iter().copied().collect();
    assert!(distinct.len() <= 256);

    let band_len = (width * band_height) as usize;
    let mut band_colors = HashMap::new();
    for (band, chunk) in decoded.pixels().chunks(band_len).enumerate() {
        let first = chunk[0];
        assert!(chunk.iter().all(|&p| p == first), "band {band} split across entries");
        band_colors.insert(band, first);
    }
    let unique_bands: HashSet<_> = band_colors.values().collect();
    assert_eq!(unique_bands.len(), 8);
}

#[test]
fn batch_of_mixed_targets_matches_single_conversions() {
    let source = encode_png(&photo_like(32, 32, 9));
    let targets = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP, ImageFormat::Gif];
    let requests: Vec<_> = targets
        .iter()
        .map(|&t| ConversionRequest::new(&source, t, 70))
        .collect();
    let batch = transcodecs::convert_batch(&requests, 0);
    for (result, target) in batch.into_iter().zip(targets) {
        let single = transcodecs::convert_one(&source, target, 70).unwrap();
        assert_eq!(result.unwrap().output_bytes, single.output_bytes, "{target}");
    }
}
