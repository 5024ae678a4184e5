//! Target pixel format descriptions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Color model of the normalized pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    Grayscale,
    Rgb,
}

impl ColorSpace {
    /// Number of color channels carried by a [`super::NormalizedImage`].
    pub fn num_channels(self) -> usize {
        match self {
            ColorSpace::Grayscale => 1,
            ColorSpace::Rgb => 3,
        }
    }
}

/// The supported target pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8888,
    Rgb888,
    Rgb666,
    Rgb565,
    Rgb555,
    Rgb444,
    Rgb332,
    Rgb111,
    Gray4,
    Gray2,
    Bw,
    /// 2-bit index into a palette of RGB888 colors.
    I2Rgb888,
    /// 4-bit index into a palette of RGB888 colors.
    I4Rgb888,
    /// 6-bit index into a palette of RGB888 colors.
    I6Rgb888,
}

/// Structural description of a target pixel format.
///
/// Immutable once constructed from a [`PixelFormat`]. `color_bits` holds the
/// per-channel bit depths in channel order (one entry for grayscale, three
/// for RGB); `alpha_bits == 0` means no alpha, `index_bits == 0` means not
/// indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormatInfo {
    pub color_space: ColorSpace,
    pub color_bits: Vec<u8>,
    pub alpha_bits: u8,
    pub index_bits: u8,
}

impl PixelFormatInfo {
    pub fn new(format: PixelFormat) -> Self {
        let (color_space, color_bits, alpha_bits, index_bits) = match format {
            PixelFormat::Rgba8888 => (ColorSpace::Rgb, vec![8, 8, 8], 8, 0),
            PixelFormat::Rgb888 => (ColorSpace::Rgb, vec![8, 8, 8], 0, 0),
            PixelFormat::Rgb666 => (ColorSpace::Rgb, vec![6, 6, 6], 0, 0),
            PixelFormat::Rgb565 => (ColorSpace::Rgb, vec![5, 6, 5], 0, 0),
            PixelFormat::Rgb555 => (ColorSpace::Rgb, vec![5, 5, 5], 0, 0),
            PixelFormat::Rgb444 => (ColorSpace::Rgb, vec![4, 4, 4], 0, 0),
            PixelFormat::Rgb332 => (ColorSpace::Rgb, vec![3, 3, 2], 0, 0),
            PixelFormat::Rgb111 => (ColorSpace::Rgb, vec![1, 1, 1], 0, 0),
            PixelFormat::Gray4 => (ColorSpace::Grayscale, vec![4], 0, 0),
            PixelFormat::Gray2 => (ColorSpace::Grayscale, vec![2], 0, 0),
            PixelFormat::Bw => (ColorSpace::Grayscale, vec![1], 0, 0),
            PixelFormat::I2Rgb888 => (ColorSpace::Rgb, vec![8, 8, 8], 0, 2),
            PixelFormat::I4Rgb888 => (ColorSpace::Rgb, vec![8, 8, 8], 0, 4),
            PixelFormat::I6Rgb888 => (ColorSpace::Rgb, vec![8, 8, 8], 0, 6),
        };
        Self {
            color_space,
            color_bits,
            alpha_bits,
            index_bits,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha_bits > 0
    }

    pub fn is_indexed(&self) -> bool {
        self.index_bits > 0
    }

    pub fn num_color_channels(&self) -> usize {
        self.color_bits.len()
    }

    /// Number of code planes a [`super::ReducedImage`] carries for this
    /// format: one per color channel (or a single index plane), plus an
    /// alpha plane when present.
    pub fn num_code_channels(&self) -> usize {
        let color = if self.is_indexed() {
            1
        } else {
            self.num_color_channels()
        };
        color + usize::from(self.has_alpha())
    }

    /// Plane index of the alpha codes. Only meaningful when `has_alpha()`.
    pub fn alpha_plane_index(&self) -> usize {
        self.num_code_channels() - 1
    }

    /// Short channel label used in generated layout comments.
    pub fn channel_name(&self, channel: usize) -> &'static str {
        if self.is_indexed() {
            return if channel == 0 { "I" } else { "A" };
        }
        match self.color_space {
            ColorSpace::Grayscale => {
                if channel == 0 {
                    "V"
                } else {
                    "A"
                }
            }
            ColorSpace::Rgb => ["R", "G", "B", "A"].get(channel).copied().unwrap_or("?"),
        }
    }
}

impl fmt::Display for PixelFormatInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_indexed() {
            return write!(f, "Index{}", self.index_bits);
        }
        match self.color_space {
            ColorSpace::Grayscale => {
                if self.color_bits[0] == 1 {
                    write!(f, "B/W")
                } else {
                    write!(f, "Gray{}", self.color_bits[0])
                }
            }
            ColorSpace::Rgb => {
                let bits: String = self.color_bits.iter().map(|b| b.to_string()).collect();
                if self.has_alpha() {
                    write!(f, "RGBA{}{}", bits, self.alpha_bits)
                } else {
                    write!(f, "RGB{}", bits)
                }
            }
        }
    }
}
