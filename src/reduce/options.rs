//! Reduction configuration.

use serde::{Deserialize, Serialize};

/// Default strength for both dither groups; full-strength diffusion tends
/// to look noisy on very low bit depths.
pub const DEFAULT_DITHER_STRENGTH: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DitherMethod {
    None,
    /// Serpentine Floyd-Steinberg error diffusion.
    Diffusion,
    /// Ordered 4x4 Bayer pattern, applied to the color channels before
    /// quantization.
    Pattern,
}

/// Per-group dithering controls for the reduction stage.
///
/// Dithering only ever triggers on channel groups that actually lose
/// precision; an 8-bit channel passes through untouched regardless of the
/// configured method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReduceOptions {
    pub color_dither_method: DitherMethod,
    pub alpha_dither_method: DitherMethod,
    pub color_dither_strength: f32,
    pub alpha_dither_strength: f32,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            color_dither_method: DitherMethod::Diffusion,
            alpha_dither_method: DitherMethod::Diffusion,
            color_dither_strength: DEFAULT_DITHER_STRENGTH,
            alpha_dither_strength: DEFAULT_DITHER_STRENGTH,
        }
    }
}

impl ReduceOptions {
    #[inline]
    pub fn with_color_dither(mut self, method: DitherMethod, strength: f32) -> Self {
        self.color_dither_method = method;
        self.color_dither_strength = strength;
        self
    }

    #[inline]
    pub fn with_alpha_dither(mut self, method: DitherMethod, strength: f32) -> Self {
        self.alpha_dither_method = method;
        self.alpha_dither_strength = strength;
        self
    }

    pub fn no_dither() -> Self {
        Self {
            color_dither_method: DitherMethod::None,
            alpha_dither_method: DitherMethod::None,
            color_dither_strength: DEFAULT_DITHER_STRENGTH,
            alpha_dither_strength: DEFAULT_DITHER_STRENGTH,
        }
    }
}
