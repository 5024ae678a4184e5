//! Scalar color helpers: luminance, RGB/HSL plane conversion, hue arithmetic.
//!
//! All values are normalized floats in `[0, 1]`. Hue is a fraction of a full
//! turn, so `0.5` is 180 degrees and values wrap modulo 1.

use serde::{Deserialize, Serialize};

/// Rec. 601 luminance of a normalized RGB triple.
#[inline]
pub fn luminance(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Luminance of a pixel inside an interleaved float plane.
#[inline]
pub fn luminance_at(data: &[f32], offset: usize) -> f32 {
    luminance(data[offset], data[offset + 1], data[offset + 2])
}

/// Split a packed `0x00BBGGRR` color into normalized channels.
///
/// Red sits in the low byte, matching the byte order of the interleaved
/// RGBA source buffers.
pub fn rgb_u32_to_f32(color: u32) -> [f32; 3] {
    let [r, g, b] = rgb_u32_to_u8(color);
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

/// Split a packed `0x00BBGGRR` color into 8-bit channels.
pub fn rgb_u32_to_u8(color: u32) -> [u8; 3] {
    [
        (color & 0xff) as u8,
        ((color >> 8) & 0xff) as u8,
        ((color >> 16) & 0xff) as u8,
    ]
}

/// Convert an interleaved RGB plane to HSL in place-compatible buffers.
///
/// Saturation uses the simple `max - min` chroma measure; the inverse below
/// mirrors it, so the pair round-trips.
pub fn rgb_to_hsl_plane(src: &[f32], dest: &mut [f32]) {
    debug_assert_eq!(src.len(), dest.len());
    for (rgb, hsl) in src.chunks_exact(3).zip(dest.chunks_exact_mut(3)) {
        let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let mut h = 0.0;
        let mut s = 0.0;
        if max != min {
            let d = max - min;
            s = d;
            h = if max == r {
                (g - b) / d + if g < b { 6.0 } else { 0.0 }
            } else if max == g {
                (b - r) / d + 2.0
            } else {
                (r - g) / d + 4.0
            };
            h /= 6.0;
        }
        hsl[0] = h;
        hsl[1] = s;
        hsl[2] = l;
    }
}

/// Convert an interleaved HSL plane back to RGB.
pub fn hsl_to_rgb_plane(src: &[f32], dest: &mut [f32]) {
    debug_assert_eq!(src.len(), dest.len());
    for (hsl, rgb) in src.chunks_exact(3).zip(dest.chunks_exact_mut(3)) {
        let (mut h, s, l) = (hsl[0], hsl[1], hsl[2]);
        let (r, g, b);
        if s == 0.0 {
            // achromatic
            r = l;
            g = l;
            b = l;
        } else {
            let p = s / 2.0;
            let max = l + p;
            let min = l - p;
            h -= h.floor();
            h *= 6.0;
            if h < 1.0 {
                r = max;
                g = min + (max - min) * h;
                b = min;
            } else if h < 2.0 {
                r = min + (max - min) * (2.0 - h);
                g = max;
                b = min;
            } else if h < 3.0 {
                r = min;
                g = max;
                b = min + (max - min) * (h - 2.0);
            } else if h < 4.0 {
                r = min;
                g = min + (max - min) * (4.0 - h);
                b = max;
            } else if h < 5.0 {
                r = min + (max - min) * (h - 4.0);
                g = min;
                b = max;
            } else {
                r = max;
                g = min;
                b = min + (max - min) * (6.0 - h);
            }
        }
        rgb[0] = r.clamp(0.0, 1.0);
        rgb[1] = g.clamp(0.0, 1.0);
        rgb[2] = b.clamp(0.0, 1.0);
    }
}

/// Wrap a hue into `[0, 1)`.
#[inline]
pub fn hue_wrap(hue: f32) -> f32 {
    hue - hue.floor()
}

/// Add two hues modulo 1.
#[inline]
pub fn hue_add(hue: f32, add: f32) -> f32 {
    hue_wrap(hue + add)
}

/// Signed shortest distance from `hue2` to `hue1`, in `[-0.5, 0.5)`.
pub fn hue_diff(hue1: f32, hue2: f32) -> f32 {
    let d = hue_wrap(hue1 - hue2);
    if d < 0.5 {
        d
    } else {
        d - 1.0
    }
}

/// Clamp a hue to the arc starting at `min` spanning `range`.
pub fn hue_clip(min: f32, range: f32, hue: f32) -> f32 {
    let radius = range / 2.0;
    let center = hue_add(min, radius);
    let d = hue_diff(hue, center);
    if d < -radius {
        hue_add(center, -radius)
    } else if d > radius {
        hue_add(center, radius)
    } else {
        hue
    }
}

/// An HSL sub-space, used by color-space reduction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HslRange {
    pub h_min: f32,
    pub h_range: f32,
    pub s_min: f32,
    pub s_max: f32,
    pub l_min: f32,
    pub l_max: f32,
}

impl Default for HslRange {
    fn default() -> Self {
        Self {
            h_min: 0.0,
            h_range: 1.0,
            s_min: 0.0,
            s_max: 1.0,
            l_min: 0.0,
            l_max: 1.0,
        }
    }
}
