//! Per-channel independent uniform quantizer.

use crate::error::ConvertError;
use crate::image::PixelFormatInfo;

use super::{Palette, RoundMethod};

/// Uniform quantizer treating every channel independently.
///
/// For each channel, `reduce` maps the normalized input through
/// `clip01((v - in_min) / (in_max - in_min))` and rounds onto
/// `2^bits` levels. The `in_min`/`in_max` window depends on the
/// [`RoundMethod`]; see the trait docs.
#[derive(Debug, Clone)]
pub struct FixedPalette {
    channel_bits: Vec<u8>,
    in_min: Vec<f32>,
    in_max: Vec<f32>,
    out_max: Vec<u8>,
}

impl FixedPalette {
    pub fn new(channel_bits: &[u8], round_method: RoundMethod) -> Result<Self, ConvertError> {
        if channel_bits.is_empty() || channel_bits.len() > 4 {
            return Err(ConvertError::InvalidChannelCount {
                context: "fixed palette",
                got: channel_bits.len(),
            });
        }
        let mut in_min = Vec::with_capacity(channel_bits.len());
        let mut in_max = Vec::with_capacity(channel_bits.len());
        let mut out_max = Vec::with_capacity(channel_bits.len());
        for &bits in channel_bits {
            if !(1..=8).contains(&bits) {
                return Err(ConvertError::InvalidBitDepth { got: bits });
            }
            let num_levels = 1u32 << bits;
            // Equal division is undefined for a single-level step; 1-bit
            // channels always use the nearest window.
            let equ_div = round_method == RoundMethod::EqualDivision && bits >= 2;
            let n2 = (num_levels * 2) as f32;
            in_min.push(if equ_div { 1.0 / n2 } else { 0.0 });
            in_max.push(if equ_div { (n2 - 1.0) / n2 } else { 1.0 });
            out_max.push((num_levels - 1) as u8);
        }
        Ok(Self {
            channel_bits: channel_bits.to_vec(),
            in_min,
            in_max,
            out_max,
        })
    }

    /// Build the quantizer matching a target format's color depths.
    pub fn for_format(
        format: &PixelFormatInfo,
        round_method: RoundMethod,
    ) -> Result<Self, ConvertError> {
        Self::new(&format.color_bits, round_method)
    }
}

impl Palette for FixedPalette {
    fn num_colors(&self) -> usize {
        self.channel_bits
            .iter()
            .map(|&bits| 1usize << bits)
            .product()
    }

    fn reduce(&self, src: &[f32], dest: &mut [u8], error: &mut [f32]) {
        for ch in 0..self.channel_bits.len() {
            let in_norm = src[ch];
            let in_mod =
                ((in_norm - self.in_min[ch]) / (self.in_max[ch] - self.in_min[ch])).clamp(0.0, 1.0);
            let out_max = self.out_max[ch] as f32;
            let out = (out_max * in_mod).round();
            dest[ch] = out as u8;
            error[ch] = in_norm - out / out_max;
        }
    }

    fn extract(&self, src: &[u8], dest: &mut [u8; 3]) {
        if self.channel_bits.len() == 1 {
            // grayscale fan-out
            let gray = (src[0] as u32 * 255 + self.out_max[0] as u32 / 2) / self.out_max[0] as u32;
            dest.fill(gray as u8);
        } else {
            for ch in 0..3 {
                let out_max = self.out_max[ch] as u32;
                dest[ch] = ((src[ch] as u32 * 255 + out_max / 2) / out_max) as u8;
            }
        }
    }

    fn average_step(&self) -> Vec<f32> {
        self.channel_bits
            .iter()
            .map(|&bits| 1.0 / ((1u32 << bits) - 1) as f32)
            .collect()
    }
}
