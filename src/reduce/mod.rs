//! Color reduction: quantize a [`NormalizedImage`] into per-channel code
//! planes, optionally dithering.
//!
//! Scan order is serpentine (left-to-right on even rows, right-to-left on
//! odd rows). The Floyd-Steinberg kernel is direction-dependent, so any
//! other order would change which neighbors absorb each pixel's residual
//! and produce a different dither texture.
//!
//! [`NormalizedImage`]: crate::image::NormalizedImage

mod options;

use tracing::debug;

use crate::image::{NormalizedImage, PixelFormatInfo, ReducedImage};
use crate::palette::Palette;

pub use options::{DitherMethod, ReduceOptions, DEFAULT_DITHER_STRENGTH};

/// 4x4 Bayer thresholds, centered on zero.
const DITHER_PATTERN: [f32; 16] = [
    0.5 / 16.0 - 0.5,
    8.5 / 16.0 - 0.5,
    2.5 / 16.0 - 0.5,
    10.5 / 16.0 - 0.5,
    12.5 / 16.0 - 0.5,
    4.5 / 16.0 - 0.5,
    14.5 / 16.0 - 0.5,
    6.5 / 16.0 - 0.5,
    3.5 / 16.0 - 0.5,
    11.5 / 16.0 - 0.5,
    1.5 / 16.0 - 0.5,
    9.5 / 16.0 - 0.5,
    15.5 / 16.0 - 0.5,
    7.5 / 16.0 - 0.5,
    13.5 / 16.0 - 0.5,
    5.5 / 16.0 - 0.5,
];

/// Quantize `src` through `palette` into a [`ReducedImage`].
///
/// The input is not modified; diffusion works on internal copies of the
/// color and alpha planes.
pub fn reduce(
    src: &NormalizedImage,
    format: &PixelFormatInfo,
    palette: &dyn Palette,
    options: &ReduceOptions,
) -> ReducedImage {
    let out_w = src.width as usize;
    let out_h = src.height as usize;
    let num_col_ch = src.num_color_channels();
    let mut output = ReducedImage::new(src.width, src.height, format.clone());

    // dithering only matters on channel groups that lose precision
    let color_lossy = format.is_indexed() || format.color_bits.iter().any(|&bits| bits < 8);
    let alpha_lossy = format.has_alpha() && format.alpha_bits < 8;
    let col_diffuse = color_lossy && options.color_dither_method == DitherMethod::Diffusion;
    let alp_diffuse = alpha_lossy && options.alpha_dither_method == DitherMethod::Diffusion;

    let mut color = src.color.clone();
    let mut alpha = src.alpha.clone();

    if color_lossy && options.color_dither_method == DitherMethod::Pattern {
        apply_pattern(
            &mut color,
            out_w,
            num_col_ch,
            &palette.average_step(),
            options.color_dither_strength,
        );
    }

    debug!(
        width = out_w,
        height = out_h,
        format = %format,
        color_diffusion = col_diffuse,
        alpha_diffusion = alp_diffuse,
        "Reducing image"
    );

    let num_color_codes = output.data.len() - usize::from(format.has_alpha());
    let alp_out_max = if format.has_alpha() {
        (1u32 << format.alpha_bits) - 1
    } else {
        0
    };
    let mut col_out = vec![0u8; num_color_codes];
    let mut col_err = vec![0f32; num_col_ch];
    let mut alp_err = [0f32; 1];

    for y in 0..out_h {
        let fwd = y % 2 == 0;
        for ix in 0..out_w {
            let x = if fwd { ix } else { out_w - 1 - ix };
            let i_pix = y * out_w + x;

            let mut transparent = false;
            let mut alp_out = alp_out_max;
            if format.has_alpha() {
                let alp_norm_in = alpha[i_pix];
                alp_out = ((alp_norm_in * alp_out_max as f32).round() as i64)
                    .clamp(0, alp_out_max as i64) as u32;
                alp_err[0] = alp_norm_in - alp_out as f32 / alp_out_max as f32;
                transparent = alp_out == 0;
            }

            palette.reduce(
                &color[i_pix * num_col_ch..(i_pix + 1) * num_col_ch],
                &mut col_out,
                &mut col_err,
            );

            for (ch, &code) in col_out.iter().enumerate() {
                output.data[ch][i_pix] = code;
            }
            if format.has_alpha() {
                output.data[num_color_codes][i_pix] = alp_out as u8;
            }

            if alp_diffuse {
                if options.alpha_dither_strength < 1.0 {
                    alp_err[0] *= options.alpha_dither_strength;
                }
                diffuse_error(&mut alpha, out_w, out_h, 1, &alp_err, x, y, fwd);
            }

            // skip color diffusion out of fully transparent pixels so the
            // noise does not leak through transparency
            if col_diffuse && !transparent {
                if options.color_dither_strength < 1.0 {
                    for e in col_err.iter_mut() {
                        *e *= options.color_dither_strength;
                    }
                }
                diffuse_error(&mut color, out_w, out_h, num_col_ch, &col_err, x, y, fwd);
            }
        }
    }

    output
}

fn apply_pattern(color: &mut [f32], width: usize, num_ch: usize, step: &[f32], strength: f32) {
    let height = color.len() / (width * num_ch);
    for y in 0..height {
        let i_pat_step = (y % 4) * 4;
        for x in 0..width {
            let i_pixel = (y * width + x) * num_ch;
            let pat = DITHER_PATTERN[i_pat_step + (x % 4)];
            for ch in 0..num_ch {
                let v = color[i_pixel + ch] + step[ch] * pat * strength;
                color[i_pixel + ch] = v.clamp(0.0, 1.0);
            }
        }
    }
}

/// Distribute a residual to the not-yet-visited Floyd-Steinberg neighbors.
/// Weights mirror on backward rows.
#[allow(clippy::too_many_arguments)]
fn diffuse_error(
    target: &mut [f32],
    width: usize,
    height: usize,
    num_ch: usize,
    error: &[f32],
    x: usize,
    y: usize,
    forward: bool,
) {
    let stride = width * num_ch;
    for (ch, &e) in error.iter().enumerate().take(num_ch) {
        if e == 0.0 {
            continue;
        }
        let i = y * stride + x * num_ch + ch;
        if forward {
            if x < width - 1 {
                target[i + num_ch] += e * 7.0 / 16.0;
            }
            if y < height - 1 {
                if x > 0 {
                    target[i + stride - num_ch] += e * 3.0 / 16.0;
                }
                target[i + stride] += e * 5.0 / 16.0;
                if x < width - 1 {
                    target[i + stride + num_ch] += e * 1.0 / 16.0;
                }
            }
        } else {
            if x > 0 {
                target[i - num_ch] += e * 7.0 / 16.0;
            }
            if y < height - 1 {
                if x < width - 1 {
                    target[i + stride + num_ch] += e * 3.0 / 16.0;
                }
                target[i + stride] += e * 5.0 / 16.0;
                if x > 0 {
                    target[i + stride - num_ch] += e * 1.0 / 16.0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ColorSpace, PixelFormat};
    use crate::palette::{FixedPalette, RoundMethod};

    fn gray_image(width: u32, height: u32, levels: &[f32]) -> NormalizedImage {
        let mut img = NormalizedImage::new(width, height, ColorSpace::Grayscale);
        img.color.copy_from_slice(levels);
        img.alpha.fill(1.0);
        img
    }

    #[test]
    fn test_no_dither_quantizes_independently() {
        let img = gray_image(4, 1, &[0.0, 0.3, 0.7, 1.0]);
        let format = PixelFormatInfo::new(PixelFormat::Bw);
        let palette = FixedPalette::for_format(&format, RoundMethod::Nearest).unwrap();
        let out = reduce(&img, &format, &palette, &ReduceOptions::no_dither());
        assert_eq!(out.data[0], vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_diffusion_wakes_up_flat_midtone() {
        // a flat 0.5 gray under 1-bit diffusion must produce a mix of
        // black and white, not a constant plane
        let img = gray_image(8, 8, &[0.5; 64]);
        let format = PixelFormatInfo::new(PixelFormat::Bw);
        let palette = FixedPalette::for_format(&format, RoundMethod::Nearest).unwrap();
        let options = ReduceOptions::default().with_color_dither(DitherMethod::Diffusion, 1.0);
        let out = reduce(&img, &format, &palette, &options);
        let ones: u32 = out.data[0].iter().map(|&v| v as u32).sum();
        assert!(ones > 0 && ones < 64, "expected a dither mix, got {ones}");
    }

    #[test]
    fn test_diffusion_preserves_average_level() {
        // error conservation: the mean output level stays close to the
        // mean input level when nothing clips
        let img = gray_image(16, 16, &[0.25; 256]);
        let format = PixelFormatInfo::new(PixelFormat::Bw);
        let palette = FixedPalette::for_format(&format, RoundMethod::Nearest).unwrap();
        let options = ReduceOptions::default().with_color_dither(DitherMethod::Diffusion, 1.0);
        let out = reduce(&img, &format, &palette, &options);
        let ones: u32 = out.data[0].iter().map(|&v| v as u32).sum();
        let mean = ones as f32 / 256.0;
        assert!(
            (mean - 0.25).abs() < 0.05,
            "diffusion should conserve the mean, got {mean}"
        );
    }

    #[test]
    fn test_input_image_not_mutated() {
        let img = gray_image(4, 4, &[0.5; 16]);
        let before = img.color.clone();
        let format = PixelFormatInfo::new(PixelFormat::Bw);
        let palette = FixedPalette::for_format(&format, RoundMethod::Nearest).unwrap();
        let options = ReduceOptions::default().with_color_dither(DitherMethod::Diffusion, 1.0);
        let _ = reduce(&img, &format, &palette, &options);
        assert_eq!(img.color, before);
    }

    #[test]
    fn test_eight_bit_channels_skip_dithering() {
        // RGB888 loses no precision, so even with diffusion requested the
        // output is a plain per-pixel quantization
        let mut img = NormalizedImage::new(2, 1, ColorSpace::Rgb);
        img.color = vec![0.5, 0.25, 0.75, 0.1, 0.9, 0.0];
        img.alpha = vec![1.0, 1.0];
        let format = PixelFormatInfo::new(PixelFormat::Rgb888);
        let palette = FixedPalette::for_format(&format, RoundMethod::Nearest).unwrap();
        let dithered = reduce(&img, &format, &palette, &ReduceOptions::default());
        let plain = reduce(&img, &format, &palette, &ReduceOptions::no_dither());
        assert_eq!(dithered.data, plain.data);
    }

    #[test]
    fn test_alpha_quantized_by_nearest_rounding() {
        let mut img = NormalizedImage::new(2, 1, ColorSpace::Rgb);
        img.color = vec![1.0; 6];
        img.alpha = vec![0.2, 0.9];
        let format = PixelFormatInfo::new(PixelFormat::Rgba8888);
        let palette = FixedPalette::for_format(&format, RoundMethod::Nearest).unwrap();
        let out = reduce(&img, &format, &palette, &ReduceOptions::no_dither());
        assert_eq!(out.data[3][0], (0.2f32 * 255.0).round() as u8);
        assert_eq!(out.data[3][1], (0.9f32 * 255.0).round() as u8);
    }

    #[test]
    fn test_transparent_pixels_block_color_diffusion() {
        // left pixel transparent with a huge color residual; its neighbor
        // must not absorb any of it
        let mut img = NormalizedImage::new(2, 1, ColorSpace::Grayscale);
        img.color = vec![0.4, 0.0];
        img.alpha = vec![0.0, 1.0];
        let format = PixelFormatInfo {
            color_space: ColorSpace::Grayscale,
            color_bits: vec![1],
            alpha_bits: 1,
            index_bits: 0,
        };
        let palette = FixedPalette::new(&[1], RoundMethod::Nearest).unwrap();
        let options = ReduceOptions::no_dither().with_color_dither(DitherMethod::Diffusion, 1.0);
        let out = reduce(&img, &format, &palette, &options);
        assert_eq!(out.data[0][1], 0, "neighbor stays black");
    }

    #[test]
    fn test_pattern_dither_varies_with_position() {
        let img = gray_image(4, 4, &[0.5; 16]);
        let format = PixelFormatInfo::new(PixelFormat::Bw);
        let palette = FixedPalette::for_format(&format, RoundMethod::Nearest).unwrap();
        let options = ReduceOptions::no_dither().with_color_dither(DitherMethod::Pattern, 1.0);
        let out = reduce(&img, &format, &palette, &options);
        let ones: u32 = out.data[0].iter().map(|&v| v as u32).sum();
        assert!(ones > 0 && ones < 16, "Bayer pattern should checker a flat gray");
    }
}
