//! Palette quantization for indexed output.
//!
//! A variance-splitting median cut over the image's color histogram.
//! Each round splits the box with the largest squared error at the point
//! along its widest axis that minimizes the two halves' error. Boxes whose
//! every channel spans fewer than [`MIN_SPLIT_RANGE`] levels are left whole,
//! so colors that close always land on the same palette entry.

mod dither;

use std::collections::HashMap;

use rgb::{Rgb, Rgba};

use crate::pipeline::Quality;

pub use dither::DitherMode;
pub(crate) use dither::map_pixels;

/// Pixels with alpha below this become the transparent palette entry.
pub const ALPHA_CUTOFF: u8 = 128;

/// Largest palette an indexed format can hold.
pub const MAX_PALETTE_LEN: usize = 256;

/// Boxes narrower than this on every channel are never split.
pub const MIN_SPLIT_RANGE: u8 = 8;

/// Palette size for a quality: 2 colors at q=1 up to 256 at q=100.
pub fn palette_len_for_quality(quality: Quality) -> usize {
    let q = quality.get() as usize;
    2 + (q - 1) * (MAX_PALETTE_LEN - 2) / 99
}

/// An indexed color table.
///
/// Opaque colors come first; the transparent entry, when present, is last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb<u8>>,
    transparent: Option<u8>,
}

impl Palette {
    /// Opaque palette colors.
    pub fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    /// Index reserved for transparent pixels, if any pixel needed it.
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent
    }

    /// Total entries including the transparent one.
    pub fn len(&self) -> usize {
        self.colors.len() + usize::from(self.transparent.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat RGB table with the transparent entry as black.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut table: Vec<u8> = self.colors.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
        if self.transparent.is_some() || table.is_empty() {
            table.extend_from_slice(&[0, 0, 0]);
        }
        table
    }

    /// Index of the opaque entry closest to `color`.
    ///
    /// Channels are weighted 2:4:3 (R:G:B) to roughly track perceived
    /// difference. Falls back to the transparent index for an empty palette.
    pub fn nearest(&self, color: [i32; 3]) -> u8 {
        let mut best = 0usize;
        let mut best_dist = i32::MAX;
        for (i, c) in self.colors.iter().enumerate() {
            let dr = color[0] - c.r as i32;
            let dg = color[1] - c.g as i32;
            let db = color[2] - c.b as i32;
            let dist = 2 * dr * dr + 4 * dg * dg + 3 * db * db;
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        if self.colors.is_empty() {
            return self.transparent.unwrap_or(0);
        }
        best as u8
    }
}

/// Build a palette of at most `max_len` entries (clamped to 2..=256).
///
/// One entry is reserved for transparency when any pixel has alpha below
/// [`ALPHA_CUTOFF`]. Images with few enough distinct opaque colors get an
/// exact palette.
pub fn build_palette(pixels: &[Rgba<u8>], max_len: usize) -> Palette {
    let max_len = max_len.clamp(2, MAX_PALETTE_LEN);
    let mut histogram: HashMap<[u8; 3], u32> = HashMap::new();
    let mut has_transparent = false;
    for p in pixels {
        if p.a < ALPHA_CUTOFF {
            has_transparent = true;
        } else {
            *histogram.entry([p.r, p.g, p.b]).or_insert(0) += 1;
        }
    }

    let budget = if has_transparent { max_len - 1 } else { max_len };
    let mut entries: Vec<([u8; 3], u32)> = histogram.into_iter().collect();
    entries.sort_unstable();

    let colors = if entries.len() <= budget {
        entries.iter().map(|&([r, g, b], _)| Rgb::new(r, g, b)).collect()
    } else {
        median_cut(&mut entries, budget)
    };
    log::trace!(
        "palette: {} colors, transparent: {}",
        colors.len(),
        has_transparent
    );

    let transparent = has_transparent.then_some(colors.len() as u8);
    Palette {
        colors,
        transparent,
    }
}

/// A contiguous run of histogram entries with cached statistics.
#[derive(Clone, Debug)]
struct ColorBox {
    start: usize,
    end: usize,
    count: f64,
    sum: [f64; 3],
    /// Squared error around the mean, per channel.
    error: [f64; 3],
    splittable: bool,
}

impl ColorBox {
    fn new(entries: &[([u8; 3], u32)], start: usize, end: usize) -> Self {
        let mut count = 0.0;
        let mut sum = [0.0f64; 3];
        let mut sum_sq = [0.0f64; 3];
        let mut lo = [u8::MAX; 3];
        let mut hi = [u8::MIN; 3];
        for &(color, weight) in &entries[start..end] {
            let w = weight as f64;
            count += w;
            for c in 0..3 {
                let v = color[c] as f64;
                sum[c] += v * w;
                sum_sq[c] += v * v * w;
                lo[c] = lo[c].min(color[c]);
                hi[c] = hi[c].max(color[c]);
            }
        }
        let error = std::array::from_fn(|c| (sum_sq[c] - sum[c] * sum[c] / count).max(0.0));
        let widest = (0..3).map(|c| hi[c] - lo[c]).max().unwrap_or(0);
        Self {
            start,
            end,
            count,
            sum,
            error,
            splittable: end - start > 1 && widest >= MIN_SPLIT_RANGE,
        }
    }

    fn total_error(&self) -> f64 {
        self.error.iter().sum()
    }

    fn mean(&self) -> Rgb<u8> {
        let channel = |c: usize| (self.sum[c] / self.count).round().clamp(0.0, 255.0) as u8;
        Rgb::new(channel(0), channel(1), channel(2))
    }

    /// Split at the point along the highest-error axis that minimizes the
    /// halves' combined error on that axis. Never separates equal values.
    fn split(&self, entries: &mut [([u8; 3], u32)]) -> Option<(ColorBox, ColorBox)> {
        let axis = (0..3)
            .max_by(|&a, &b| self.error[a].total_cmp(&self.error[b]))
            .unwrap_or(0);
        let run = &mut entries[self.start..self.end];
        run.sort_unstable_by_key(|&(color, _)| color[axis]);

        let mut best: Option<(usize, f64)> = None;
        let (mut n_left, mut s_left, mut sq_left) = (0.0f64, 0.0f64, 0.0f64);
        let total_n = self.count;
        let total_s = self.sum[axis];
        let total_sq: f64 = run
            .iter()
            .map(|&(c, w)| (c[axis] as f64).powi(2) * w as f64)
            .sum();

        for k in 1..run.len() {
            let (color, weight) = run[k - 1];
            let v = color[axis] as f64;
            let w = weight as f64;
            n_left += w;
            s_left += v * w;
            sq_left += v * v * w;
            if run[k].0[axis] == color[axis] {
                continue;
            }
            let n_right = total_n - n_left;
            let s_right = total_s - s_left;
            let sq_right = total_sq - sq_left;
            let cost = (sq_left - s_left * s_left / n_left) + (sq_right - s_right * s_right / n_right);
            if best.is_none_or(|(_, c)| cost < c) {
                best = Some((k, cost));
            }
        }

        let (k, _) = best?;
        let mid = self.start + k;
        Some((
            ColorBox::new(entries, self.start, mid),
            ColorBox::new(entries, mid, self.end),
        ))
    }
}

fn median_cut(entries: &mut [([u8; 3], u32)], budget: usize) -> Vec<Rgb<u8>> {
    let mut boxes = vec![ColorBox::new(entries, 0, entries.len())];

    while boxes.len() < budget {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.splittable && b.total_error() > 0.0)
            .max_by(|(_, a), (_, b)| a.total_error().total_cmp(&b.total_error()))
            .map(|(i, _)| i);
        let Some(index) = candidate else {
            break;
        };

        match boxes[index].split(entries) {
            Some((left, right)) => {
                boxes[index] = left;
                boxes.push(right);
            }
            None => boxes[index].splittable = false,
        }
    }

    boxes.iter().map(ColorBox::mean).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(r: u8, g: u8, b: u8) -> Rgba<u8> {
        Rgba::new(r, g, b, 255)
    }

    #[test]
    fn palette_len_tracks_quality() {
        let len = |q| palette_len_for_quality(Quality::new(q).unwrap());
        assert_eq!(len(1), 2);
        assert_eq!(len(50), 127);
        assert_eq!(len(100), 256);
        let mut previous = 0;
        for q in 1..=100 {
            assert!(len(q) >= previous);
            previous = len(q);
        }
    }

    #[test]
    fn few_colors_are_exact() {
        let pixels = [opaque(1, 2, 3), opaque(200, 100, 0), opaque(1, 2, 3)];
        let palette = build_palette(&pixels, 16);
        assert_eq!(palette.colors().len(), 2);
        assert_eq!(palette.transparent_index(), None);
        assert!(palette.colors().contains(&Rgb::new(200, 100, 0)));
    }

    #[test]
    fn transparency_reserves_last_entry() {
        let pixels = [opaque(10, 10, 10), Rgba::new(0, 0, 0, 0), opaque(90, 90, 90)];
        let palette = build_palette(&pixels, 4);
        assert_eq!(palette.transparent_index(), Some(2));
        assert_eq!(palette.len(), 3);
        assert_eq!(palette.to_rgb_bytes().len(), 9);
    }

    #[test]
    fn fully_transparent_image() {
        let palette = build_palette(&[Rgba::new(5, 5, 5, 0); 4], 16);
        assert!(palette.colors().is_empty());
        assert_eq!(palette.transparent_index(), Some(0));
        assert_eq!(palette.nearest([5, 5, 5]), 0);
        assert_eq!(palette.to_rgb_bytes(), vec![0, 0, 0]);
    }

    #[test]
    fn never_exceeds_budget() {
        let pixels: Vec<Rgba<u8>> = (0..64 * 64)
            .map(|i| opaque((i % 64 * 4) as u8, (i / 64 * 4) as u8, (i * 7 % 256) as u8))
            .collect();
        for max in [2, 16, 255, 256, 1000] {
            let palette = build_palette(&pixels, max);
            assert!(palette.len() <= max.min(MAX_PALETTE_LEN));
            assert!(palette.len() >= 2);
        }
    }

    #[test]
    fn close_colors_share_an_entry() {
        // 8 bands 32 levels apart in red, each with ±2 jitter on every channel
        let mut pixels = Vec::new();
        for band in 0..8u8 {
            let base = 16 + band * 32;
            for j in 0..125u8 {
                let dr = j % 5;
                let dg = (j / 5) % 5;
                let db = j / 25;
                pixels.push(opaque(base + dr - 2, 100 + dg - 2, 50 + db - 2));
            }
        }
        let palette = build_palette(&pixels, 16);
        assert_eq!(palette.colors().len(), 8);

        for band in 0..8usize {
            let members = &pixels[band * 125..(band + 1) * 125];
            let first = palette.nearest([members[0].r as i32, members[0].g as i32, members[0].b as i32]);
            for p in members {
                assert_eq!(palette.nearest([p.r as i32, p.g as i32, p.b as i32]), first);
            }
        }
    }

    #[test]
    fn split_prefers_gaps() {
        let mut entries = vec![([0, 0, 0], 10), ([2, 0, 0], 10), ([100, 0, 0], 10), ([102, 0, 0], 10)];
        let colors = median_cut(&mut entries, 2);
        assert_eq!(colors.len(), 2);
        assert!(colors.contains(&Rgb::new(1, 0, 0)));
        assert!(colors.contains(&Rgb::new(101, 0, 0)));
    }
}
