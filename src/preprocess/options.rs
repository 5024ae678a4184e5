//! Preprocessing configuration.

use serde::{Deserialize, Serialize};

use crate::color::HslRange;
use crate::geom::{Rect, Size};
use crate::image::ColorSpace;

/// A tone parameter that is either fixed or resolved automatically from the
/// image content. After a run the resolved value is reported back so hosts
/// can display it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarParam {
    pub value: f32,
    pub automatic: bool,
}

impl ScalarParam {
    pub fn fixed(value: f32) -> Self {
        Self {
            value,
            automatic: false,
        }
    }

    pub fn auto() -> Self {
        Self {
            value: 0.0,
            automatic: true,
        }
    }
}

/// What to do with the source alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlphaMode {
    /// Pass alpha through unchanged.
    Keep,
    /// Composite over a background color, then force alpha to 1.
    Fill,
    /// Snap alpha to exactly 0 or 1 against a threshold.
    Binarize,
    /// Zero out pixels close to a key color before resizing.
    SetKeyColor,
}

/// How the trim rectangle is reconciled with the output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScalingMethod {
    /// Crop the trim rectangle so the output is fully covered.
    Zoom,
    /// Letterbox so the whole trim rectangle stays visible.
    Fit,
    /// Free aspect distortion, no adjustment.
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InterpMethod {
    NearestNeighbor,
    /// Box averaging for power-of-two steps with a linear pass for the
    /// fractional remainder. Alpha-weighted.
    Average,
}

/// Optional HSL color space reduction applied at the end of preprocessing,
/// for displays that can only show a slice of the full gamut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CsrMode {
    None,
    /// Clamp each pixel into the range, desaturating far-off hues.
    Clip,
    /// Compress the whole gamut into the range.
    Fold,
}

/// Full preprocessing configuration.
///
/// Construct with [`new`](Self::new) and refine through the builder setters.
/// Defaults mirror the most common conversion: zoom scaling, box-average
/// interpolation, alpha kept, automatic tone resolution disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// Region of the source to convert. `None` means the whole image.
    pub trim_rect: Option<Rect>,
    pub out_size: Size,
    pub color_space: ColorSpace,
    pub scaling_method: ScalingMethod,
    pub interp_method: InterpMethod,

    pub alpha_mode: AlphaMode,
    /// Binarize threshold, compared against the 8-bit alpha value.
    pub alpha_thresh: u8,
    /// Background for [`AlphaMode::Fill`], packed `0x00BBGGRR`.
    pub back_color: u32,
    /// Key color for [`AlphaMode::SetKeyColor`], packed `0x00BBGGRR`.
    pub key_color: u32,
    /// Sum-of-absolute-differences tolerance for the key color match.
    pub key_tolerance: u32,

    /// Hue shift as a fraction of a full turn.
    pub hue: f32,
    /// Saturation gain.
    pub saturation: f32,
    /// Lightness gain.
    pub lightness: f32,

    pub gamma: ScalarParam,
    pub brightness: ScalarParam,
    pub contrast: ScalarParam,
    pub invert: bool,

    pub csr_mode: CsrMode,
    pub csr_hsl_range: HslRange,
    /// Hue distance at which clipping fully desaturates, as a fraction of
    /// a full turn.
    pub csr_hue_tolerance: f32,
}

impl PreprocessOptions {
    pub fn new(out_size: Size) -> Self {
        Self {
            trim_rect: None,
            out_size,
            color_space: ColorSpace::Rgb,
            scaling_method: ScalingMethod::Zoom,
            interp_method: InterpMethod::Average,
            alpha_mode: AlphaMode::Keep,
            alpha_thresh: 128,
            back_color: 0x000000,
            key_color: 0x000000,
            key_tolerance: 0,
            hue: 0.0,
            saturation: 1.0,
            lightness: 1.0,
            gamma: ScalarParam::fixed(1.0),
            brightness: ScalarParam::fixed(0.0),
            contrast: ScalarParam::fixed(1.0),
            invert: false,
            csr_mode: CsrMode::None,
            csr_hsl_range: HslRange::default(),
            csr_hue_tolerance: 60.0 / 360.0,
        }
    }

    #[inline]
    pub fn with_trim_rect(mut self, rect: Rect) -> Self {
        self.trim_rect = Some(rect);
        self
    }

    #[inline]
    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    #[inline]
    pub fn with_scaling_method(mut self, method: ScalingMethod) -> Self {
        self.scaling_method = method;
        self
    }

    #[inline]
    pub fn with_interp_method(mut self, method: InterpMethod) -> Self {
        self.interp_method = method;
        self
    }

    #[inline]
    pub fn with_alpha_mode(mut self, mode: AlphaMode) -> Self {
        self.alpha_mode = mode;
        self
    }

    #[inline]
    pub fn with_back_color(mut self, color: u32) -> Self {
        self.back_color = color;
        self
    }

    #[inline]
    pub fn with_key_color(mut self, color: u32, tolerance: u32) -> Self {
        self.key_color = color;
        self.key_tolerance = tolerance;
        self
    }

    #[inline]
    pub fn with_hsl(mut self, hue: f32, saturation: f32, lightness: f32) -> Self {
        self.hue = hue;
        self.saturation = saturation;
        self.lightness = lightness;
        self
    }

    #[inline]
    pub fn with_gamma(mut self, gamma: ScalarParam) -> Self {
        self.gamma = gamma;
        self
    }

    #[inline]
    pub fn with_brightness(mut self, brightness: ScalarParam) -> Self {
        self.brightness = brightness;
        self
    }

    #[inline]
    pub fn with_contrast(mut self, contrast: ScalarParam) -> Self {
        self.contrast = contrast;
        self
    }

    #[inline]
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    #[inline]
    pub fn with_csr(mut self, mode: CsrMode, range: HslRange) -> Self {
        self.csr_mode = mode;
        self.csr_hsl_range = range;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_identity_tone() {
        let options = PreprocessOptions::new(Size::new(128, 64));
        assert_eq!(options.gamma, ScalarParam::fixed(1.0));
        assert_eq!(options.brightness, ScalarParam::fixed(0.0));
        assert_eq!(options.contrast, ScalarParam::fixed(1.0));
        assert!(!options.invert);
        assert_eq!(options.csr_mode, CsrMode::None);
    }

    #[test]
    fn test_builder_chains() {
        let options = PreprocessOptions::new(Size::new(8, 8))
            .with_trim_rect(Rect::new(0, 0, 16, 16))
            .with_alpha_mode(AlphaMode::SetKeyColor)
            .with_key_color(0x00ff00, 12);
        assert_eq!(options.trim_rect, Some(Rect::new(0, 0, 16, 16)));
        assert_eq!(options.key_color, 0x00ff00);
        assert_eq!(options.key_tolerance, 12);
    }
}
