//! Fixed color enumeration palette (indexed formats, learned palettes).

use crate::error::ConvertError;

use super::Palette;

/// A palette of up to `2^index_bits` explicit colors.
///
/// Entries start disabled; hosts (or an external palette learner) fill them
/// in with [`set_color`](Self::set_color). `reduce` performs a nearest-color
/// search by squared distance over the enabled entries and emits a single
/// index code.
#[derive(Debug, Clone)]
pub struct IndexedPalette {
    num_color_channels: usize,
    index_bits: u8,
    /// `num_colors() * num_color_channels` normalized components.
    colors: Vec<f32>,
    enabled: Vec<bool>,
}

impl IndexedPalette {
    pub fn new(num_color_channels: usize, index_bits: u8) -> Result<Self, ConvertError> {
        if num_color_channels != 1 && num_color_channels != 3 {
            return Err(ConvertError::InvalidChannelCount {
                context: "indexed palette",
                got: num_color_channels,
            });
        }
        let num_colors = 1usize << index_bits;
        Ok(Self {
            num_color_channels,
            index_bits,
            colors: vec![0.0; num_colors * num_color_channels],
            enabled: vec![false; num_colors],
        })
    }

    pub fn index_bits(&self) -> u8 {
        self.index_bits
    }

    /// Set and enable one palette entry. `color` holds one normalized
    /// component per color channel.
    pub fn set_color(&mut self, index: usize, color: &[f32]) {
        let n = self.num_color_channels;
        self.colors[index * n..(index + 1) * n].copy_from_slice(&color[..n]);
        self.enabled[index] = true;
    }

    pub fn disable(&mut self, index: usize) {
        self.enabled[index] = false;
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.enabled[index]
    }

    fn color_at(&self, index: usize) -> &[f32] {
        let n = self.num_color_channels;
        &self.colors[index * n..(index + 1) * n]
    }
}

impl Palette for IndexedPalette {
    fn num_colors(&self) -> usize {
        1usize << self.index_bits
    }

    fn reduce(&self, src: &[f32], dest: &mut [u8], error: &mut [f32]) {
        let n = self.num_color_channels;
        let mut best_idx = 0usize;
        let mut best_dist = f32::MAX;
        for i in 0..self.num_colors() {
            if !self.enabled[i] {
                continue;
            }
            let mut dist = 0.0;
            for ch in 0..n {
                let diff = src[ch] - self.colors[i * n + ch];
                dist += diff * diff;
            }
            if dist < best_dist {
                best_dist = dist;
                best_idx = i;
            }
        }
        dest[0] = best_idx as u8;
        for ch in 0..n {
            error[ch] = src[ch] - self.colors[best_idx * n + ch];
        }
    }

    fn extract(&self, src: &[u8], dest: &mut [u8; 3]) {
        let entry = self.color_at(src[0] as usize);
        if self.num_color_channels == 1 {
            // grayscale fan-out
            dest.fill((entry[0] * 255.0).round() as u8);
        } else {
            for ch in 0..3 {
                dest[ch] = (entry[ch] * 255.0).round() as u8;
            }
        }
    }

    fn average_step(&self) -> Vec<f32> {
        let n = self.num_color_channels;
        let num_levels = (self.num_colors() as f32)
            .powf(1.0 / n as f32)
            .max(2.0);
        (0..n)
            .map(|ch| {
                let mut min = 1.0f32;
                let mut max = 0.0f32;
                for i in 0..self.num_colors() {
                    if !self.enabled[i] {
                        continue;
                    }
                    let v = self.colors[i * n + ch];
                    min = min.min(v);
                    max = max.max(v);
                }
                (max - min).max(0.1) / (num_levels - 1.0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bwr_palette() -> IndexedPalette {
        // black / white / red, as on three-color e-paper
        let mut palette = IndexedPalette::new(3, 2).unwrap();
        palette.set_color(0, &[0.0, 0.0, 0.0]);
        palette.set_color(1, &[1.0, 1.0, 1.0]);
        palette.set_color(2, &[1.0, 0.0, 0.0]);
        palette
    }

    #[test]
    fn test_nearest_color_search() {
        let palette = bwr_palette();
        let mut code = [0u8];
        let mut error = [0f32; 3];

        palette.reduce(&[0.9, 0.1, 0.1], &mut code, &mut error);
        assert_eq!(code[0], 2, "near-red should map to the red entry");

        palette.reduce(&[0.9, 0.9, 0.9], &mut code, &mut error);
        assert_eq!(code[0], 1, "near-white should map to the white entry");
    }

    #[test]
    fn test_reduce_reports_residual() {
        let palette = bwr_palette();
        let mut code = [0u8];
        let mut error = [0f32; 3];
        palette.reduce(&[0.8, 0.1, 0.0], &mut code, &mut error);
        assert_eq!(code[0], 2);
        assert!((error[0] + 0.2).abs() < 1e-6);
        assert!((error[1] - 0.1).abs() < 1e-6);
        assert!((error[2] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_entries_are_skipped() {
        let mut palette = bwr_palette();
        palette.disable(2);
        let mut code = [0u8];
        let mut error = [0f32; 3];
        palette.reduce(&[1.0, 0.0, 0.0], &mut code, &mut error);
        assert_ne!(code[0], 2, "disabled entry must not be chosen");
    }

    #[test]
    fn test_extract_round_trips_entries() {
        let palette = bwr_palette();
        let mut rgb = [0u8; 3];
        palette.extract(&[2], &mut rgb);
        assert_eq!(rgb, [255, 0, 0]);
    }

    #[test]
    fn test_invalid_channel_count_rejected() {
        assert!(IndexedPalette::new(2, 4).is_err());
    }
}
