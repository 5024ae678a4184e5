//! Palette abstraction: mapping normalized color tuples to integer codes.
//!
//! The reduction stage depends only on the [`Palette`] trait, never on a
//! concrete implementation. [`FixedPalette`] covers the uniform per-channel
//! quantizers; [`IndexedPalette`] covers fixed color enumerations, including
//! externally learned ones.

mod fixed;
mod indexed;

use serde::{Deserialize, Serialize};

pub use fixed::FixedPalette;
pub use indexed::IndexedPalette;

/// How a channel value is mapped onto its quantization levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundMethod {
    /// Codes are evenly spaced output levels; the first and last code map
    /// to exactly 0 and 1.
    Nearest,
    /// Codes represent the centers of `2^bits` equal-width buckets spanning
    /// `[0, 1]`, avoiding bias toward the extremes. Undefined for 1-bit
    /// channels, which fall back to nearest rounding.
    EqualDivision,
}

/// Capability interface for color reduction.
pub trait Palette {
    /// Total number of representable colors.
    fn num_colors(&self) -> usize;

    /// Quantize one normalized color tuple.
    ///
    /// `src` holds one sample per color channel. `dest` receives the
    /// integer codes (one per color channel for direct palettes, a single
    /// index for indexed palettes). `error` receives the per-channel
    /// residual `src - quantized`, used for error diffusion.
    fn reduce(&self, src: &[f32], dest: &mut [u8], error: &mut [f32]);

    /// Reconstruct an 8-bit RGB preview color from a code tuple.
    /// Single-channel palettes fan the value out to R, G and B.
    fn extract(&self, src: &[u8], dest: &mut [u8; 3]);

    /// Average quantization step size per color channel, used to scale
    /// ordered-pattern dithering.
    fn average_step(&self) -> Vec<f32>;
}
