//! Trim, key color and resampling passes. All of these run on the raw
//! 8-bit RGBA buffer; [`normalize`] converts the result into the float
//! model at the very end.

use crate::color;
use crate::error::ConvertError;
use crate::geom::{Point, Rect, Size};
use crate::image::{ColorSpace, NormalizedImage};

use super::options::{InterpMethod, ScalingMethod};

/// Largest accepted output size, as a total pixel count.
pub const MAX_OUTPUT_PIXELS: u64 = 1024 * 1024;

/// The trim rectangle after aspect reconciliation, plus where the source
/// content lands inside the trimmed buffer (offset and size differ from the
/// rectangle itself only for letterboxed [`ScalingMethod::Fit`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrimLayout {
    pub rect: Rect,
    pub dest_offset: Point,
    pub dest_size: Size,
}

/// Reconcile the trim rectangle with the output aspect ratio.
///
/// Zoom shrinks the long trim axis and re-centers so the output is fully
/// covered; Fit grows the short axis and centers the content with
/// letterbox offsets; Stretch leaves the rectangle alone.
pub(crate) fn normalize_trim_rect(
    trim_rect: Rect,
    out_size: Size,
    scaling_method: ScalingMethod,
) -> TrimLayout {
    let out_aspect = out_size.width as f64 / out_size.height as f64;
    let trim_aspect = trim_rect.width as f64 / trim_rect.height as f64;

    let mut rect = trim_rect;
    let mut dest_offset = Point::new(0, 0);
    let mut dest_size = trim_rect.size();

    match scaling_method {
        ScalingMethod::Zoom => {
            if out_aspect > trim_aspect {
                rect.height = ((rect.width as f64 * out_size.height as f64
                    / out_size.width as f64)
                    .round() as u32)
                    .max(1);
                rect.y += ((trim_rect.height as f64 - rect.height as f64) / 2.0).round() as i32;
            } else if out_aspect < trim_aspect {
                rect.width = ((rect.height as f64 * out_size.width as f64
                    / out_size.height as f64)
                    .round() as u32)
                    .max(1);
                rect.x += ((trim_rect.width as f64 - rect.width as f64) / 2.0).round() as i32;
            }
            dest_size = rect.size();
        }
        ScalingMethod::Fit => {
            if out_aspect > trim_aspect {
                rect.width = ((rect.height as f64 * out_size.width as f64
                    / out_size.height as f64)
                    .round() as u32)
                    .max(1);
                dest_offset.x =
                    ((rect.width as f64 - trim_rect.width as f64) / 2.0).round() as i32;
            } else if out_aspect < trim_aspect {
                rect.height = ((rect.width as f64 * out_size.height as f64
                    / out_size.width as f64)
                    .round() as u32)
                    .max(1);
                dest_offset.y =
                    ((rect.height as f64 - trim_rect.height as f64) / 2.0).round() as i32;
            }
        }
        ScalingMethod::Stretch => {}
    }

    TrimLayout {
        rect,
        dest_offset,
        dest_size,
    }
}

/// Copy the trim region out of the source buffer into a tight RGBA buffer
/// of the aspect-adjusted rectangle's size. Samples outside the source
/// image stay transparent black.
pub(crate) fn trim(
    src: &[u8],
    src_size: Size,
    trim_rect: Rect,
    out_size: Size,
    scaling_method: ScalingMethod,
) -> Result<(Vec<u8>, Rect), ConvertError> {
    if src_size.width < 1 || src_size.height < 1 {
        return Err(ConvertError::InvalidGeometry {
            context: "source",
            width: src_size.width as i64,
            height: src_size.height as i64,
        });
    }
    if trim_rect.width < 1 || trim_rect.height < 1 {
        return Err(ConvertError::InvalidGeometry {
            context: "trim",
            width: trim_rect.width as i64,
            height: trim_rect.height as i64,
        });
    }
    if out_size.width < 1 || out_size.height < 1 {
        return Err(ConvertError::InvalidGeometry {
            context: "output",
            width: out_size.width as i64,
            height: out_size.height as i64,
        });
    }

    let layout = normalize_trim_rect(trim_rect, out_size, scaling_method);
    let rect = layout.rect;

    let dest_stride = rect.width as usize * 4;
    let src_stride = src_size.width as usize * 4;
    let mut out = vec![0u8; dest_stride * rect.height as usize];

    for y in 0..layout.dest_size.height as i64 {
        let src_y = rect.y as i64 + y;
        if src_y < 0 || src_y >= src_size.height as i64 {
            continue;
        }
        let dest_y = (layout.dest_offset.y as i64 + y) as usize;
        for x in 0..layout.dest_size.width as i64 {
            let src_x = rect.x as i64 + x;
            if src_x < 0 || src_x >= src_size.width as i64 {
                continue;
            }
            let i_src = src_y as usize * src_stride + src_x as usize * 4;
            let i_dest = dest_y * dest_stride + (layout.dest_offset.x as i64 + x) as usize * 4;
            out[i_dest..i_dest + 4].copy_from_slice(&src[i_src..i_src + 4]);
        }
    }

    Ok((out, rect))
}

/// Zero out every pixel within `tolerance` of the key color.
///
/// Runs before resizing so transparent pixels cannot bleed into opaque
/// neighbors during interpolation. The distance is the sum of per-channel
/// absolute differences.
pub(crate) fn apply_key_color(data: &mut [u8], key: u32, tolerance: u32) {
    let [key_r, key_g, key_b] = color::rgb_u32_to_u8(key);
    for px in data.chunks_exact_mut(4) {
        let d = px[0].abs_diff(key_r) as u32
            + px[1].abs_diff(key_g) as u32
            + px[2].abs_diff(key_b) as u32;
        if d <= tolerance {
            px.fill(0);
        }
    }
}

pub(crate) fn resample(
    src: &[u8],
    src_size: Size,
    out_size: Size,
    interp_method: InterpMethod,
) -> Vec<u8> {
    if src_size == out_size {
        return src.to_vec();
    }
    match interp_method {
        InterpMethod::NearestNeighbor => resize_nearest(src, src_size, out_size),
        InterpMethod::Average => resize_average(src, src_size, out_size),
    }
}

fn resize_nearest(src: &[u8], src_size: Size, out_size: Size) -> Vec<u8> {
    let src_w = src_size.width as usize;
    let src_h = src_size.height as usize;
    let out_w = out_size.width as usize;
    let out_h = out_size.height as usize;
    let src_stride = src_w * 4;
    let out_stride = out_w * 4;
    let mut out = vec![0u8; out_stride * out_h];
    for out_y in 0..out_h {
        let src_y = if out_h <= 1 {
            0
        } else {
            out_y * (src_h - 1) / (out_h - 1)
        };
        for out_x in 0..out_w {
            let src_x = if out_w <= 1 {
                0
            } else {
                out_x * (src_w - 1) / (out_w - 1)
            };
            let i_src = src_y * src_stride + src_x * 4;
            let i_dest = out_y * out_stride + out_x * 4;
            out[i_dest..i_dest + 4].copy_from_slice(&src[i_src..i_src + 4]);
        }
    }
    out
}

/// Two-tier box/linear resampler.
///
/// Each axis first linearly interpolates down (or up) to the nearest
/// `out * 2^k` size, then repeatedly halves with 2:1 box averaging. This
/// keeps box-filter quality for large downscales while staying O(n) per
/// axis.
fn resize_average(src: &[u8], src_size: Size, out_size: Size) -> Vec<u8> {
    let src_w = src_size.width as usize;
    let src_h = src_size.height as usize;
    let out_w = out_size.width as usize;
    let out_h = out_size.height as usize;
    let src_stride = src_w * 4;

    let mut pre_w = out_w;
    while pre_w * 2 <= src_w {
        pre_w *= 2;
    }
    let pre_stride = pre_w * 4;
    let mut pre = vec![0u8; pre_stride * src_h];

    // horizontal pass: fractional step, then power-of-two halving
    if pre_w == src_w {
        for y in 0..src_h {
            pre[y * pre_stride..y * pre_stride + src_stride]
                .copy_from_slice(&src[y * src_stride..(y + 1) * src_stride]);
        }
    } else {
        for y in 0..src_h {
            let row = y * src_stride;
            for dest_x in 0..pre_w {
                let (src_x, coeff) = frac_pos(dest_x, src_w, pre_w);
                let i0 = row + src_x * 4;
                let i1 = row + (src_x + 1).min(src_w - 1) * 4;
                let mixed = blend(pixel_at(src, i0), pixel_at(src, i1), coeff);
                put_pixel(&mut pre, y * pre_stride + dest_x * 4, mixed);
            }
        }
    }
    let mut cur_w = pre_w;
    while cur_w > out_w {
        cur_w /= 2;
        for y in 0..src_h {
            let row = y * pre_stride;
            for x in 0..cur_w {
                let i_src = row + x * 8;
                let mixed = blend(pixel_at(&pre, i_src), pixel_at(&pre, i_src + 4), 0.5);
                put_pixel(&mut pre, row + x * 4, mixed);
            }
        }
    }

    let mut post_h = out_h;
    while post_h * 2 <= src_h {
        post_h *= 2;
    }
    let post_stride = out_w * 4;
    let mut post = vec![0u8; post_stride * post_h];

    // vertical pass, same structure
    if post_h == src_h {
        for y in 0..src_h {
            post[y * post_stride..(y + 1) * post_stride]
                .copy_from_slice(&pre[y * pre_stride..y * pre_stride + post_stride]);
        }
    } else {
        for dest_y in 0..post_h {
            let (src_y, coeff) = frac_pos(dest_y, src_h, post_h);
            let i0_row = src_y * pre_stride;
            let i1_row = (src_y + 1).min(src_h - 1) * pre_stride;
            for x in 0..out_w {
                let mixed = blend(
                    pixel_at(&pre, i0_row + x * 4),
                    pixel_at(&pre, i1_row + x * 4),
                    coeff,
                );
                put_pixel(&mut post, dest_y * post_stride + x * 4, mixed);
            }
        }
    }
    let mut cur_h = post_h;
    while cur_h > out_h {
        cur_h /= 2;
        for y in 0..cur_h {
            let i_dest_row = y * post_stride;
            let i_src_row = y * post_stride * 2;
            for x in 0..out_w {
                let mixed = blend(
                    pixel_at(&post, i_src_row + x * 4),
                    pixel_at(&post, i_src_row + post_stride + x * 4),
                    0.5,
                );
                put_pixel(&mut post, i_dest_row + x * 4, mixed);
            }
        }
    }

    post.truncate(out_w * out_h * 4);
    post
}

/// Map a destination index onto a fractional source position, split into
/// an integer base and an interpolation coefficient toward the next sample.
fn frac_pos(dest: usize, src_len: usize, dest_len: usize) -> (usize, f32) {
    if src_len <= 1 || dest_len <= 1 {
        return ((src_len - 1) / 2, 0.0);
    }
    let frac = dest as f32 * (src_len - 1) as f32 / (dest_len - 1) as f32;
    let mut base = frac.floor() as usize;
    let mut coeff = frac - base as f32;
    if base >= src_len - 1 {
        base = src_len - 2;
        coeff = 1.0;
    }
    (base, coeff)
}

#[inline]
fn pixel_at(buf: &[u8], i: usize) -> [u8; 4] {
    [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
}

#[inline]
fn put_pixel(buf: &mut [u8], i: usize, px: [u8; 4]) {
    buf[i..i + 4].copy_from_slice(&px);
}

/// Alpha-weighted linear mix of two RGBA samples.
///
/// Color weights are scaled by each sample's alpha before mixing and
/// renormalized, so transparent samples do not drag colors toward black.
/// The output alpha is the plain linear mix of the input alphas.
fn blend(p0: [u8; 4], p1: [u8; 4], coeff1: f32) -> [u8; 4] {
    let mut c0 = 1.0 - coeff1;
    let mut c1 = coeff1;
    let a = p0[3] as f32 * c0 + p1[3] as f32 * c1;
    c0 *= p0[3] as f32 / 255.0;
    c1 *= p1[3] as f32 / 255.0;
    if c0 + c1 > 0.0 {
        let norm = 1.0 / (c0 + c1);
        c0 *= norm;
        c1 *= norm;
    }
    let mut out = [0u8; 4];
    for ch in 0..3 {
        let m = p0[ch] as f32 * c0 + p1[ch] as f32 * c1;
        out[ch] = m.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = a.round().clamp(0.0, 255.0) as u8;
    out
}

/// Convert an 8-bit RGBA buffer into the canonical float model.
pub(crate) fn normalize(data: &[u8], size: Size, color_space: ColorSpace) -> NormalizedImage {
    let mut img = NormalizedImage::new(size.width, size.height, color_space);
    for (i, px) in data.chunks_exact(4).enumerate() {
        match color_space {
            ColorSpace::Grayscale => {
                img.color[i] = color::luminance(
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                );
            }
            ColorSpace::Rgb => {
                img.color[i * 3] = px[0] as f32 / 255.0;
                img.color[i * 3 + 1] = px[1] as f32 / 255.0;
                img.color[i * 3 + 2] = px[2] as f32 / 255.0;
            }
        }
        img.alpha[i] = px[3] as f32 / 255.0;
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_crops_wide_trim() {
        // trim 100x50 against a square output: the wide axis shrinks to 50
        // and re-centers, shifting x by +25
        let layout = normalize_trim_rect(
            Rect::new(0, 0, 100, 50),
            Size::new(100, 100),
            ScalingMethod::Zoom,
        );
        assert_eq!(layout.rect, Rect::new(25, 0, 50, 50));
        assert_eq!(layout.dest_offset, Point::new(0, 0));
        assert_eq!(layout.dest_size, Size::new(50, 50));
    }

    #[test]
    fn test_fit_letterboxes_wide_trim() {
        // same shapes under Fit: the trim height grows and the content is
        // centered vertically
        let layout = normalize_trim_rect(
            Rect::new(0, 0, 100, 50),
            Size::new(100, 100),
            ScalingMethod::Fit,
        );
        assert_eq!(layout.rect, Rect::new(0, 0, 100, 100));
        assert_eq!(layout.dest_offset, Point::new(0, 25));
        assert_eq!(layout.dest_size, Size::new(100, 50));
    }

    #[test]
    fn test_stretch_leaves_rect_alone() {
        let rect = Rect::new(3, 4, 100, 50);
        let layout = normalize_trim_rect(rect, Size::new(64, 64), ScalingMethod::Stretch);
        assert_eq!(layout.rect, rect);
        assert_eq!(layout.dest_size, rect.size());
    }

    #[test]
    fn test_trim_out_of_bounds_stays_transparent() {
        // 2x2 opaque white source, trim extends one pixel left of it
        let src = [255u8; 2 * 2 * 4];
        let (out, rect) = trim(
            &src,
            Size::new(2, 2),
            Rect::new(-1, 0, 2, 2),
            Size::new(2, 2),
            ScalingMethod::Stretch,
        )
        .unwrap();
        assert_eq!(rect, Rect::new(-1, 0, 2, 2));
        assert_eq!(&out[..4], &[0, 0, 0, 0], "left column is outside");
        assert_eq!(&out[4..8], &[255, 255, 255, 255]);
    }

    #[test]
    fn test_trim_rejects_zero_sizes() {
        let src = [0u8; 4];
        let result = trim(
            &src,
            Size::new(1, 1),
            Rect::new(0, 0, 0, 1),
            Size::new(1, 1),
            ScalingMethod::Zoom,
        );
        assert!(matches!(
            result,
            Err(ConvertError::InvalidGeometry { context: "trim", .. })
        ));
    }

    #[test]
    fn test_key_color_zeroes_matches() {
        // key = pure red, tolerance covers the second pixel only
        let mut data = vec![
            250, 5, 0, 255, // off by 10
            0, 255, 0, 255, // far away
        ];
        apply_key_color(&mut data, 0x0000ff, 10);
        assert_eq!(&data[..4], &[0, 0, 0, 0]);
        assert_eq!(&data[4..], &[0, 255, 0, 255]);
    }

    #[test]
    fn test_resample_identity_copy() {
        let src: Vec<u8> = (0..16).collect();
        let out = resample(&src, Size::new(2, 2), Size::new(2, 2), InterpMethod::Average);
        assert_eq!(out, src, "identical sizes must be a plain copy");
    }

    #[test]
    fn test_average_halving_mixes_pairs() {
        // 2x1 opaque gray levels 100 and 200 halve to 150
        let src = [100, 100, 100, 255, 200, 200, 200, 255];
        let out = resize_average(&src, Size::new(2, 1), Size::new(1, 1));
        assert_eq!(out, vec![150, 150, 150, 255]);
    }

    #[test]
    fn test_blend_ignores_transparent_color() {
        // mixing opaque red with transparent green keeps the red hue,
        // only the alpha drops
        let red = [255, 0, 0, 255];
        let clear_green = [0, 255, 0, 0];
        let out = blend(red, clear_green, 0.5);
        assert_eq!(&out[..3], &[255, 0, 0]);
        assert_eq!(out[3], 128);
    }

    #[test]
    fn test_nearest_picks_endpoints() {
        let src = [10, 0, 0, 255, 20, 0, 0, 255, 30, 0, 0, 255];
        let out = resize_nearest(&src, Size::new(3, 1), Size::new(2, 1));
        assert_eq!(out[0], 10);
        assert_eq!(out[4], 30);
    }

    #[test]
    fn test_normalize_grayscale_uses_luminance() {
        let data = [255, 0, 0, 255];
        let img = normalize(&data, Size::new(1, 1), ColorSpace::Grayscale);
        assert!((img.color[0] - 0.299).abs() < 1e-6);
        assert!((img.alpha[0] - 1.0).abs() < 1e-6);
    }
}
