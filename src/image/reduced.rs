//! Per-channel code planes produced by palette quantization.

use crate::palette::Palette;

use super::PixelFormatInfo;

/// The output of the reduction stage: one `u8` code plane per code channel,
/// each `width * height` long, every element in `[0, 2^bits - 1]`.
///
/// Created once per conversion run and read-only afterwards; consumed by
/// the encoder and by preview generation.
#[derive(Debug, Clone)]
pub struct ReducedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormatInfo,
    /// Code planes: color channels (or a single index plane) first, alpha
    /// last when present.
    pub data: Vec<Vec<u8>>,
}

impl ReducedImage {
    pub fn new(width: u32, height: u32, format: PixelFormatInfo) -> Self {
        let num_pixels = width as usize * height as usize;
        let data = (0..format.num_code_channels())
            .map(|_| vec![0u8; num_pixels])
            .collect();
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Reconstruct an RGBA8 preview buffer via [`Palette::extract`].
    ///
    /// Purely for display; not part of the encoding contract.
    pub fn to_preview_rgba(&self, palette: &dyn Palette) -> Vec<u8> {
        let num_pixels = self.width as usize * self.height as usize;
        let num_code_ch = self.format.num_code_channels();
        let color_codes = num_code_ch - usize::from(self.format.has_alpha());
        let alpha_out_max = if self.format.has_alpha() {
            (1u32 << self.format.alpha_bits) - 1
        } else {
            1
        };

        let mut codes = vec![0u8; num_code_ch];
        let mut rgb = [0u8; 3];
        let mut dest = vec![0u8; num_pixels * 4];
        for i in 0..num_pixels {
            for (ch, plane) in self.data.iter().enumerate() {
                codes[ch] = plane[i];
            }
            palette.extract(&codes[..color_codes], &mut rgb);
            dest[i * 4] = rgb[0];
            dest[i * 4 + 1] = rgb[1];
            dest[i * 4 + 2] = rgb[2];
            dest[i * 4 + 3] = if self.format.has_alpha() {
                let code = codes[self.format.alpha_plane_index()] as u32;
                ((code * 255 + alpha_out_max / 2) / alpha_out_max) as u8
            } else {
                255
            };
        }
        dest
    }
}
