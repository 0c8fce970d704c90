//! Mapping pixels onto a palette, with optional dithering.

use std::collections::HashMap;

use imgref::ImgRef;
use nanorand::{Rng, WyRand};
use rgb::Rgba;

use super::{ALPHA_CUTOFF, Palette};

/// How quantization error is spread when mapping to a palette.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DitherMode {
    /// Nearest color, no dithering.
    None,
    /// 8×8 Bayer threshold matrix.
    Ordered,
    /// Floyd–Steinberg error diffusion.
    #[default]
    FloydSteinberg,
    /// Uniform noise from a seeded generator. The same seed always yields
    /// the same output.
    Random { seed: u64 },
}

const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Nearest-entry lookup memoized on exact color.
struct Mapper<'a> {
    palette: &'a Palette,
    cache: HashMap<[i32; 3], u8>,
}

impl<'a> Mapper<'a> {
    fn new(palette: &'a Palette) -> Self {
        Self {
            palette,
            cache: HashMap::new(),
        }
    }

    fn index(&mut self, color: [i32; 3]) -> u8 {
        let palette = self.palette;
        *self
            .cache
            .entry(color)
            .or_insert_with(|| palette.nearest(color))
    }
}

/// Typical distance between neighboring palette colors, used to scale
/// threshold and noise offsets.
fn palette_spread(palette: &Palette) -> f32 {
    let levels = (palette.colors().len().max(2) as f32).cbrt();
    255.0 / levels
}

fn clamp_channel(v: f32) -> i32 {
    v.round().clamp(0.0, 255.0) as i32
}

/// Map every pixel to a palette index, row-major.
pub(crate) fn map_pixels(img: ImgRef<'_, Rgba<u8>>, palette: &Palette, mode: DitherMode) -> Vec<u8> {
    let transparent = palette.transparent_index().unwrap_or(0);
    let mut mapper = Mapper::new(palette);
    let mut out = Vec::with_capacity(img.width() * img.height());

    match mode {
        DitherMode::None => {
            for p in img.pixels() {
                out.push(if p.a < ALPHA_CUTOFF {
                    transparent
                } else {
                    mapper.index([p.r as i32, p.g as i32, p.b as i32])
                });
            }
        }
        DitherMode::Ordered => {
            let spread = palette_spread(palette);
            for (y, row) in img.rows().enumerate() {
                for (x, p) in row.iter().enumerate() {
                    if p.a < ALPHA_CUTOFF {
                        out.push(transparent);
                        continue;
                    }
                    let t = (BAYER_8X8[y % 8][x % 8] as f32 + 0.5) / 64.0 - 0.5;
                    let offset = t * spread;
                    out.push(mapper.index([
                        clamp_channel(p.r as f32 + offset),
                        clamp_channel(p.g as f32 + offset),
                        clamp_channel(p.b as f32 + offset),
                    ]));
                }
            }
        }
        DitherMode::Random { seed } => {
            let spread = palette_spread(palette) * 0.5;
            let mut rng = WyRand::new_seed(seed);
            for p in img.pixels() {
                if p.a < ALPHA_CUTOFF {
                    out.push(transparent);
                    continue;
                }
                let mut noise = || (rng.generate::<u16>() as f32 / u16::MAX as f32 - 0.5) * spread;
                out.push(mapper.index([
                    clamp_channel(p.r as f32 + noise()),
                    clamp_channel(p.g as f32 + noise()),
                    clamp_channel(p.b as f32 + noise()),
                ]));
            }
        }
        DitherMode::FloydSteinberg => floyd_steinberg(img, &mut mapper, transparent, &mut out),
    }
    out
}

fn floyd_steinberg(img: ImgRef<'_, Rgba<u8>>, mapper: &mut Mapper<'_>, transparent: u8, out: &mut Vec<u8>) {
    let width = img.width();
    // One column of padding on each side keeps neighbor writes in bounds.
    let mut current = vec![[0.0f32; 3]; width + 2];
    let mut next = vec![[0.0f32; 3]; width + 2];

    for row in img.rows() {
        for (x, p) in row.iter().enumerate() {
            if p.a < ALPHA_CUTOFF {
                out.push(transparent);
                continue;
            }
            let err = current[x + 1];
            let wanted = [
                clamp_channel(p.r as f32 + err[0]),
                clamp_channel(p.g as f32 + err[1]),
                clamp_channel(p.b as f32 + err[2]),
            ];
            let index = mapper.index(wanted);
            out.push(index);

            let Some(&chosen) = mapper.palette.colors().get(index as usize) else {
                continue;
            };
            let diff = [
                (wanted[0] - chosen.r as i32) as f32,
                (wanted[1] - chosen.g as i32) as f32,
                (wanted[2] - chosen.b as i32) as f32,
            ];
            for c in 0..3 {
                current[x + 2][c] += diff[c] * 7.0 / 16.0;
                next[x][c] += diff[c] * 3.0 / 16.0;
                next[x + 1][c] += diff[c] * 5.0 / 16.0;
                next[x + 2][c] += diff[c] / 16.0;
            }
        }
        std::mem::swap(&mut current, &mut next);
        next.iter_mut().for_each(|e| *e = [0.0; 3]);
    }
}
