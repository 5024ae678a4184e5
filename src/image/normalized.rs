//! Canonical float image representation.

use super::ColorSpace;

/// The canonical intermediate image: component-interleaved float color
/// plane plus a separate alpha plane, both nominally in `[0, 1]`.
///
/// Error diffusion may transiently push samples outside that range; the
/// palette clips on quantization. Each stage consumes a `NormalizedImage`
/// and produces a new one rather than mutating shared state.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    /// `width * height * num_color_channels()` interleaved samples.
    pub color: Vec<f32>,
    /// `width * height` alpha samples.
    pub alpha: Vec<f32>,
}

impl NormalizedImage {
    pub fn new(width: u32, height: u32, color_space: ColorSpace) -> Self {
        let num_pixels = width as usize * height as usize;
        Self {
            width,
            height,
            color_space,
            color: vec![0.0; num_pixels * color_space.num_channels()],
            alpha: vec![0.0; num_pixels],
        }
    }

    pub fn num_color_channels(&self) -> usize {
        self.color_space.num_channels()
    }

    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_sizes() {
        let img = NormalizedImage::new(4, 3, ColorSpace::Rgb);
        assert_eq!(img.color.len(), 4 * 3 * 3);
        assert_eq!(img.alpha.len(), 4 * 3);

        let gray = NormalizedImage::new(4, 3, ColorSpace::Grayscale);
        assert_eq!(gray.color.len(), 4 * 3);
        assert_eq!(gray.num_color_channels(), 1);
    }
}
