//! The preprocessing stage: geometry, alpha policy and tone correction.

use tracing::debug;

use crate::color::{self, HslRange};
use crate::error::ConvertError;
use crate::geom::{Rect, Size};
use crate::image::{ColorSpace, NormalizedImage};

use super::options::{AlphaMode, CsrMode, PreprocessOptions, ScalarParam};
use super::resize::{self, MAX_OUTPUT_PIXELS};

const HISTOGRAM_SIZE: usize = 16;

/// Output of a preprocessing run: the normalized image plus the resolved
/// tone values (meaningful when the corresponding parameter was automatic).
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    pub image: NormalizedImage,
    pub gamma: f32,
    pub brightness: f32,
    pub contrast: f32,
}

/// Runs the full preprocessing pipeline:
/// trim, key color, resize, normalization, alpha policy, HSL adjustment,
/// gamma, brightness, contrast, inversion and color space reduction.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    options: PreprocessOptions,
}

impl Preprocessor {
    pub fn new(options: PreprocessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// Convert a raw interleaved RGBA8 buffer into a [`NormalizedImage`].
    pub fn process(&self, src: &[u8], src_size: Size) -> Result<PreprocessResult, ConvertError> {
        let opt = &self.options;
        let out_size = opt.out_size;
        if out_size.width < 1 || out_size.height < 1 {
            return Err(ConvertError::InvalidGeometry {
                context: "output",
                width: out_size.width as i64,
                height: out_size.height as i64,
            });
        }
        if out_size.num_pixels() as u64 > MAX_OUTPUT_PIXELS {
            return Err(ConvertError::OutputTooLarge {
                width: out_size.width,
                height: out_size.height,
                max_pixels: MAX_OUTPUT_PIXELS,
            });
        }
        let expected = src_size.num_pixels() * 4;
        if src.len() != expected {
            return Err(ConvertError::SourceBufferMismatch {
                got: src.len(),
                expected,
                width: src_size.width,
                height: src_size.height,
            });
        }

        let trim_rect = opt.trim_rect.unwrap_or(Rect::new(
            0,
            0,
            src_size.width,
            src_size.height,
        ));
        debug!(
            src_width = src_size.width,
            src_height = src_size.height,
            out_width = out_size.width,
            out_height = out_size.height,
            "Preprocessing image"
        );

        let (mut trimmed, rect) =
            resize::trim(src, src_size, trim_rect, out_size, opt.scaling_method)?;
        if opt.alpha_mode == AlphaMode::SetKeyColor {
            resize::apply_key_color(&mut trimmed, opt.key_color, opt.key_tolerance);
        }
        let resized = resize::resample(&trimmed, rect.size(), out_size, opt.interp_method);
        let mut img = resize::normalize(&resized, out_size, opt.color_space);

        match opt.alpha_mode {
            AlphaMode::Binarize => binarize_alpha(&mut img, opt.alpha_thresh as f32 / 255.0),
            AlphaMode::Fill => fill_background(&mut img, opt.back_color),
            AlphaMode::Keep | AlphaMode::SetKeyColor => {}
        }

        correct_hsl(&mut img, opt.hue, opt.saturation, opt.lightness);
        let gamma = correct_gamma(&mut img, opt.gamma);
        let brightness = offset_brightness(&mut img, opt.brightness);
        let contrast = correct_contrast(&mut img, opt.contrast);

        if opt.invert {
            for v in img.color.iter_mut() {
                *v = 1.0 - *v;
            }
        }

        match opt.csr_mode {
            CsrMode::Clip => {
                clip_color_space(&mut img, &opt.csr_hsl_range, opt.csr_hue_tolerance)
            }
            CsrMode::Fold => fold_color_space(&mut img, &opt.csr_hsl_range),
            CsrMode::None => {}
        }

        debug!(gamma, brightness, contrast, "Resolved tone parameters");
        Ok(PreprocessResult {
            image: img,
            gamma,
            brightness,
            contrast,
        })
    }
}

fn binarize_alpha(img: &mut NormalizedImage, thresh: f32) {
    for a in img.alpha.iter_mut() {
        *a = if *a < thresh { 0.0 } else { 1.0 };
    }
}

/// Composite every pixel over the background color, then force alpha to 1.
fn fill_background(img: &mut NormalizedImage, back_color: u32) {
    let [r, g, b] = color::rgb_u32_to_f32(back_color);
    let back: Vec<f32> = match img.color_space {
        ColorSpace::Grayscale => vec![color::luminance(r, g, b)],
        ColorSpace::Rgb => vec![r, g, b],
    };
    let num_ch = img.num_color_channels();
    for i in 0..img.num_pixels() {
        let a1 = img.alpha[i];
        let a0 = 1.0 - a1;
        for c in 0..num_ch {
            let v = &mut img.color[i * num_ch + c];
            *v = back[c] * a0 + *v * a1;
        }
        img.alpha[i] = 1.0;
    }
}

fn correct_hsl(img: &mut NormalizedImage, h_shift: f32, s_coeff: f32, l_coeff: f32) {
    match img.color_space {
        ColorSpace::Grayscale => {
            if l_coeff == 1.0 {
                return;
            }
            for v in img.color.iter_mut() {
                *v = (*v * l_coeff).clamp(0.0, 1.0);
            }
        }
        ColorSpace::Rgb => {
            if h_shift == 0.0 && s_coeff == 1.0 && l_coeff == 1.0 {
                return;
            }
            let mut hsl = vec![0.0f32; img.color.len()];
            color::rgb_to_hsl_plane(&img.color, &mut hsl);
            for px in hsl.chunks_exact_mut(3) {
                px[0] = color::hue_add(px[0], h_shift);
                px[1] = (px[1] * s_coeff).clamp(0.0, 1.0);
                px[2] = (px[2] * l_coeff).clamp(0.0, 1.0);
            }
            color::hsl_to_rgb_plane(&hsl, &mut img.color);
        }
    }
}

/// Clamp each pixel into the HSL range. Hues further than `hue_tolerance`
/// from the range lose saturation entirely; closer ones fade linearly.
fn clip_color_space(img: &mut NormalizedImage, range: &HslRange, hue_tolerance: f32) {
    let h_min = color::hue_wrap(range.h_min);
    let h_range = range.h_range.clamp(0.0, 1.0);
    let s_min = range.s_min.clamp(0.0, 1.0);
    let s_max = range.s_max.clamp(s_min, 1.0);
    let l_min = range.l_min.clamp(0.0, 1.0);
    let l_max = range.l_max.clamp(l_min, 1.0);
    let h_reduction = h_range < 1.0 - 1e-5;
    let s_reduction = s_min != 0.0 || s_max != 1.0;
    let l_reduction = l_min != 0.0 || l_max != 1.0;

    match img.color_space {
        ColorSpace::Grayscale => {
            if !l_reduction {
                return;
            }
            for v in img.color.iter_mut() {
                *v = v.clamp(l_min, l_max);
            }
        }
        ColorSpace::Rgb => {
            if !(h_reduction || s_reduction || l_reduction) {
                return;
            }
            let mut hsl = vec![0.0f32; img.color.len()];
            color::rgb_to_hsl_plane(&img.color, &mut hsl);
            for px in hsl.chunks_exact_mut(3) {
                let h = px[0];
                let mut s = px[1];
                let h_clipped = color::hue_clip(h_min, h_range, h);
                let h_diff = color::hue_diff(h_clipped, h).abs();
                if h_diff >= hue_tolerance {
                    s = 0.0;
                } else {
                    s *= 1.0 - h_diff / hue_tolerance;
                }
                px[0] = h_clipped;
                px[1] = s.clamp(s_min, s_max);
                px[2] = px[2].clamp(l_min, l_max);
            }
            color::hsl_to_rgb_plane(&hsl, &mut img.color);
        }
    }
}

/// Compress the whole gamut into the HSL range instead of clamping.
fn fold_color_space(img: &mut NormalizedImage, range: &HslRange) {
    let h_min = color::hue_wrap(range.h_min);
    let h_range = range.h_range.clamp(0.0, 1.0);
    let s_min = range.s_min.clamp(0.0, 1.0);
    let s_max = range.s_max.clamp(s_min, 1.0);
    let l_min = range.l_min.clamp(0.0, 1.0);
    let l_max = range.l_max.clamp(l_min, 1.0);
    let h_reduction = h_range < 1.0 - 1e-5;
    let s_reduction = s_min != 0.0 || s_max != 1.0;
    let l_reduction = l_min != 0.0 || l_max != 1.0;

    match img.color_space {
        ColorSpace::Grayscale => {
            if !l_reduction {
                return;
            }
            for v in img.color.iter_mut() {
                *v = (l_min + (*v - l_min) * (l_max - l_min)).clamp(0.0, 1.0);
            }
        }
        ColorSpace::Rgb => {
            if !(h_reduction || s_reduction || l_reduction) {
                return;
            }
            let h_half_range = h_range / 2.0;
            let h_center = color::hue_add(h_min, h_half_range);
            let mut hsl = vec![0.0f32; img.color.len()];
            color::rgb_to_hsl_plane(&img.color, &mut hsl);
            for px in hsl.chunks_exact_mut(3) {
                let mut h = px[0];
                if h_half_range == 0.0 {
                    h = h_min;
                } else {
                    let mut h_dist = color::hue_diff(h, h_center);
                    if h_dist < -h_half_range || h_dist > h_half_range {
                        let sign = if h_dist < 0.0 { -1.0 } else { 1.0 };
                        h_dist = h_dist.abs();
                        h_dist = (0.5 - h_dist) / (0.5 - h_half_range);
                        h_dist *= sign * h_half_range;
                        h = color::hue_add(h_center, h_dist);
                    }
                }
                px[0] = h;
                px[1] = (s_min + (px[1] - s_min) * (s_max - s_min)).clamp(0.0, 1.0);
                px[2] = (l_min + (px[2] - l_min) * (l_max - l_min)).clamp(0.0, 1.0);
            }
            color::hsl_to_rgb_plane(&hsl, &mut img.color);
        }
    }
}

/// Luminance histogram over the not-fully-transparent pixels.
fn make_histogram(img: &NormalizedImage) -> [u32; HISTOGRAM_SIZE] {
    let mut histogram = [0u32; HISTOGRAM_SIZE];
    let num_ch = img.num_color_channels();
    for i in 0..img.num_pixels() {
        if img.alpha[i] > 0.0 {
            let gray = match img.color_space {
                ColorSpace::Grayscale => img.color[i],
                ColorSpace::Rgb => color::luminance_at(&img.color, i * num_ch),
            };
            let bucket = (gray * (HISTOGRAM_SIZE - 1) as f32).round() as usize;
            histogram[bucket.min(HISTOGRAM_SIZE - 1)] += 1;
        }
    }
    histogram
}

/// Binary search for the gamma that balances pixel mass around mid-gray.
fn determine_gamma(img: &NormalizedImage) -> f32 {
    let histogram = make_histogram(img);
    let mut min = 0.5f32;
    let mut max = 2.0f32;
    let mut gamma = 1.0;
    while max - min > 0.01 {
        gamma = (min + max) / 2.0;
        let mut lo = 0u64;
        let mut hi = 0u64;
        for (i, &count) in histogram.iter().enumerate() {
            let val = (i as f32 / (HISTOGRAM_SIZE - 1) as f32).powf(1.0 / gamma);
            if val < 0.5 {
                lo += count as u64;
            } else {
                hi += count as u64;
            }
        }
        if lo > hi {
            min = gamma;
        } else {
            max = gamma;
        }
    }
    gamma
}

fn correct_gamma(img: &mut NormalizedImage, param: ScalarParam) -> f32 {
    let mut gamma = if param.automatic {
        determine_gamma(img)
    } else {
        param.value
    };
    gamma = gamma.clamp(0.01, 5.0);
    if gamma != 1.0 {
        for v in img.color.iter_mut() {
            *v = v.powf(1.0 / gamma);
        }
    }
    gamma
}

fn offset_brightness(img: &mut NormalizedImage, param: ScalarParam) -> f32 {
    let mut offset = if param.automatic {
        let (min, max) = color_min_max(img);
        0.5 - (min + max) / 2.0
    } else {
        param.value
    };
    offset = offset.clamp(-1.0, 1.0);
    if offset != 0.0 {
        for v in img.color.iter_mut() {
            *v = (*v + offset).clamp(0.0, 1.0);
        }
    }
    offset
}

fn correct_contrast(img: &mut NormalizedImage, param: ScalarParam) -> f32 {
    let mut contrast = if param.automatic {
        // expand whichever side of the midpoint is closer to 0.5 so it
        // exactly reaches 0 or 1; leave 1 for symmetric histograms
        let (min, max) = color_min_max(img);
        let middle = (min + max) / 2.0;
        if middle < 0.5 && min < middle {
            0.5 / (middle - min)
        } else if middle > 0.5 && max > middle {
            0.5 / (max - middle)
        } else {
            1.0
        }
    } else {
        param.value
    };
    contrast = contrast.clamp(0.01, 10.0);
    if contrast != 1.0 {
        for v in img.color.iter_mut() {
            *v = ((*v - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
        }
    }
    contrast
}

/// Luminance extremes over the not-fully-transparent pixels, `(0.5, 0.5)`
/// when every pixel is transparent.
fn color_min_max(img: &NormalizedImage) -> (f32, f32) {
    let num_ch = img.num_color_channels();
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for i in 0..img.num_pixels() {
        if img.alpha[i] > 0.0 {
            let gray = match img.color_space {
                ColorSpace::Grayscale => img.color[i],
                ColorSpace::Rgb => color::luminance_at(&img.color, i * num_ch),
            };
            min = min.min(gray);
            max = max.max(gray);
        }
    }
    if min <= max {
        (min, max)
    } else {
        (0.5, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Size;
    use crate::preprocess::options::ScalingMethod;

    fn gray_rgba(levels: &[u8]) -> Vec<u8> {
        levels
            .iter()
            .flat_map(|&v| [v, v, v, 255])
            .collect()
    }

    #[test]
    fn test_identity_tone_leaves_color_untouched() {
        let src = gray_rgba(&[0, 64, 128, 255]);
        let pre = Preprocessor::new(PreprocessOptions::new(Size::new(2, 2)));
        let result = pre.process(&src, Size::new(2, 2)).unwrap();
        let expected: Vec<f32> = src
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .map(|v| v as f32 / 255.0)
            .collect();
        assert_eq!(
            result.image.color, expected,
            "gamma=1, brightness=0, contrast=1 must be exact"
        );
    }

    #[test]
    fn test_output_budget_checked_before_processing() {
        let pre = Preprocessor::new(PreprocessOptions::new(Size::new(2000, 2000)));
        let result = pre.process(&[], Size::new(1, 1));
        assert!(matches!(result, Err(ConvertError::OutputTooLarge { .. })));
    }

    #[test]
    fn test_buffer_length_validated() {
        let pre = Preprocessor::new(PreprocessOptions::new(Size::new(2, 2)));
        let result = pre.process(&[0u8; 10], Size::new(2, 2));
        assert!(matches!(
            result,
            Err(ConvertError::SourceBufferMismatch { expected: 16, .. })
        ));
    }

    #[test]
    fn test_binarize_alpha_threshold() {
        let mut src = gray_rgba(&[100, 100]);
        src[3] = 10;
        src[7] = 200;
        let options = PreprocessOptions::new(Size::new(2, 1))
            .with_color_space(ColorSpace::Grayscale)
            .with_alpha_mode(AlphaMode::Binarize);
        let result = Preprocessor::new(options).process(&src, Size::new(2, 1)).unwrap();
        assert_eq!(result.image.alpha, vec![0.0, 1.0]);
    }

    #[test]
    fn test_fill_composites_over_background() {
        // half-transparent white over a black background is mid gray
        let src = [255, 255, 255, 128];
        let options = PreprocessOptions::new(Size::new(1, 1))
            .with_alpha_mode(AlphaMode::Fill)
            .with_back_color(0x000000);
        let result = Preprocessor::new(options).process(&src, Size::new(1, 1)).unwrap();
        assert!((result.image.color[0] - 128.0 / 255.0).abs() < 1e-3);
        assert_eq!(result.image.alpha[0], 1.0);
    }

    #[test]
    fn test_invert_flips_color_only() {
        let src = [255, 0, 0, 128];
        let options = PreprocessOptions::new(Size::new(1, 1)).with_invert(true);
        let result = Preprocessor::new(options).process(&src, Size::new(1, 1)).unwrap();
        assert_eq!(result.image.color[0], 0.0);
        assert_eq!(result.image.color[1], 1.0);
        assert_eq!(result.image.color[2], 1.0);
        assert!((result.image.alpha[0] - 128.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_auto_brightness_centers_range() {
        // luminance range [0.2, 0.4] wants a +0.2 shift
        let mut img = NormalizedImage::new(2, 1, ColorSpace::Grayscale);
        img.color = vec![0.2, 0.4];
        img.alpha = vec![1.0, 1.0];
        let offset = offset_brightness(&mut img, ScalarParam::auto());
        assert!((offset - 0.2).abs() < 1e-6);
        assert!((img.color[0] - 0.4).abs() < 1e-6);
        assert!((img.color[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_auto_contrast_expands_dark_side() {
        // range [0.3, 0.5]: middle 0.4, below midpoint, expands by 5x
        let mut img = NormalizedImage::new(2, 1, ColorSpace::Grayscale);
        img.color = vec![0.3, 0.5];
        img.alpha = vec![1.0, 1.0];
        let contrast = correct_contrast(&mut img, ScalarParam::auto());
        assert!((contrast - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_auto_contrast_symmetric_range_is_identity() {
        let mut img = NormalizedImage::new(2, 1, ColorSpace::Grayscale);
        img.color = vec![0.2, 0.8];
        img.alpha = vec![1.0, 1.0];
        let contrast = correct_contrast(&mut img, ScalarParam::auto());
        assert_eq!(contrast, 1.0);
        assert_eq!(img.color, vec![0.2, 0.8]);
    }

    #[test]
    fn test_auto_gamma_brightens_dark_image() {
        let mut img = NormalizedImage::new(4, 1, ColorSpace::Grayscale);
        img.color = vec![0.1, 0.15, 0.2, 0.25];
        img.alpha = vec![1.0; 4];
        let gamma = correct_gamma(&mut img, ScalarParam::auto());
        assert!(gamma > 1.0, "dark images should resolve gamma above 1");
    }

    #[test]
    fn test_transparent_pixels_excluded_from_auto_tone() {
        let mut img = NormalizedImage::new(2, 1, ColorSpace::Grayscale);
        img.color = vec![0.4, 0.0];
        img.alpha = vec![1.0, 0.0];
        let (min, max) = color_min_max(&img);
        assert_eq!((min, max), (0.4, 0.4));
    }

    #[test]
    fn test_hsl_fast_path_exact() {
        let mut img = NormalizedImage::new(1, 1, ColorSpace::Rgb);
        img.color = vec![0.123, 0.456, 0.789];
        correct_hsl(&mut img, 0.0, 1.0, 1.0);
        assert_eq!(img.color, vec![0.123, 0.456, 0.789]);
    }

    #[test]
    fn test_hue_shift_half_turn_swaps_primaries() {
        let mut img = NormalizedImage::new(1, 1, ColorSpace::Rgb);
        img.color = vec![1.0, 0.0, 0.0];
        img.alpha = vec![1.0];
        correct_hsl(&mut img, 0.5, 1.0, 1.0);
        assert!(img.color[0] < 0.01, "red goes away");
        assert!(img.color[1] > 0.99 && img.color[2] > 0.99, "cyan appears");
    }

    #[test]
    fn test_csr_clip_desaturates_far_hues() {
        // narrow range around red; a green pixel is far outside tolerance
        let range = HslRange {
            h_min: 0.0,
            h_range: 0.01,
            ..HslRange::default()
        };
        let mut img = NormalizedImage::new(1, 1, ColorSpace::Rgb);
        img.color = vec![0.0, 1.0, 0.0];
        img.alpha = vec![1.0];
        clip_color_space(&mut img, &range, 60.0 / 360.0);
        let px = &img.color;
        assert!((px[0] - px[1]).abs() < 1e-5 && (px[1] - px[2]).abs() < 1e-5);
    }

    #[test]
    fn test_csr_fold_compresses_hues_into_range() {
        // hue range [0, 0.2] (red through yellow-green), center 0.1.
        // Pure green (hue 1/3) sits 0.2333 away from the center and folds
        // onto hue 0.1 + (0.5 - 0.2333) / (0.5 - 0.1) * 0.1 = 1/6: yellow.
        let range = HslRange {
            h_min: 0.0,
            h_range: 0.2,
            ..HslRange::default()
        };
        let mut img = NormalizedImage::new(1, 1, ColorSpace::Rgb);
        img.color = vec![0.0, 1.0, 0.0];
        img.alpha = vec![1.0];
        fold_color_space(&mut img, &range);
        assert!((img.color[0] - 1.0).abs() < 1e-3, "r: {}", img.color[0]);
        assert!((img.color[1] - 1.0).abs() < 1e-3, "g: {}", img.color[1]);
        assert!(img.color[2] < 1e-3, "b: {}", img.color[2]);
    }

    #[test]
    fn test_csr_fold_keeps_in_range_hues() {
        let range = HslRange {
            h_min: 0.0,
            h_range: 0.2,
            ..HslRange::default()
        };
        let mut img = NormalizedImage::new(1, 1, ColorSpace::Rgb);
        img.color = vec![1.0, 0.0, 0.0];
        img.alpha = vec![1.0];
        fold_color_space(&mut img, &range);
        assert!((img.color[0] - 1.0).abs() < 1e-5);
        assert!(img.color[1].abs() < 1e-5);
        assert!(img.color[2].abs() < 1e-5);
    }

    #[test]
    fn test_zoom_trim_through_process() {
        // wide source into a square output: only the center square remains
        let mut src = vec![0u8; 4 * 2 * 4];
        // columns 1 and 2 are white, outer columns black, all opaque
        for y in 0..2 {
            for x in 0..4 {
                let i = (y * 4 + x) * 4;
                let v = if x == 1 || x == 2 { 255 } else { 0 };
                src[i] = v;
                src[i + 1] = v;
                src[i + 2] = v;
                src[i + 3] = 255;
            }
        }
        let options = PreprocessOptions::new(Size::new(2, 2))
            .with_color_space(ColorSpace::Grayscale)
            .with_scaling_method(ScalingMethod::Zoom);
        let result = Preprocessor::new(options).process(&src, Size::new(4, 2)).unwrap();
        assert!(result.image.color.iter().all(|&v| v > 0.99));
    }
}
