//! End-to-end conversion: raw RGBA bytes in, packed byte blobs out.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::encode::{self, EncodeArgs, PlaneOutput};
use crate::error::ConvertError;
use crate::geom::Size;
use crate::image::{PixelFormat, PixelFormatInfo, ReducedImage};
use crate::palette::{FixedPalette, Palette, RoundMethod};
use crate::preprocess::{PreprocessOptions, Preprocessor};
use crate::reduce::{self, ReduceOptions};

/// Everything a conversion run needs, serializable so hosts can persist
/// and replay configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertOptions {
    pub format: PixelFormat,
    pub preprocess: PreprocessOptions,
    pub reduce: ReduceOptions,
    pub encode: EncodeArgs,
    /// Rounding window for the default uniform palette.
    pub round_method: RoundMethod,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct ConvertOutput {
    /// One packed blob per configured plane.
    pub planes: Vec<PlaneOutput>,
    /// The code planes, kept for preview generation.
    pub reduced: ReducedImage,
    /// Resolved tone values, for hosts that display them.
    pub gamma: f32,
    pub brightness: f32,
    pub contrast: f32,
}

/// The whole pipeline behind one handle:
/// preprocess, reduce through a palette, encode.
///
/// A converter holds configuration only; [`convert`](Self::convert) is
/// reentrant and leaves no state behind.
#[derive(Debug, Clone)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    /// A converter for `format` with default settings everywhere else.
    /// The preprocessing color space follows the format.
    pub fn new(format: PixelFormat, out_size: Size) -> Self {
        let info = PixelFormatInfo::new(format);
        let preprocess =
            PreprocessOptions::new(out_size).with_color_space(info.color_space);
        Self {
            options: ConvertOptions {
                format,
                preprocess,
                reduce: ReduceOptions::default(),
                encode: EncodeArgs::default(),
                round_method: RoundMethod::Nearest,
            },
        }
    }

    pub fn from_options(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    #[inline]
    pub fn with_preprocess(mut self, preprocess: PreprocessOptions) -> Self {
        self.options.preprocess = preprocess;
        self
    }

    #[inline]
    pub fn with_reduce(mut self, reduce: ReduceOptions) -> Self {
        self.options.reduce = reduce;
        self
    }

    #[inline]
    pub fn with_encode(mut self, encode: EncodeArgs) -> Self {
        self.options.encode = encode;
        self
    }

    #[inline]
    pub fn with_round_method(mut self, round_method: RoundMethod) -> Self {
        self.options.round_method = round_method;
        self
    }

    /// Run the pipeline with the default uniform quantizer for the target
    /// format.
    ///
    /// Indexed formats carry no usable default palette and are rejected;
    /// supply one through [`convert_with_palette`](Self::convert_with_palette).
    pub fn convert(&self, src: &[u8], src_size: Size) -> Result<ConvertOutput, ConvertError> {
        let info = PixelFormatInfo::new(self.options.format);
        if info.is_indexed() {
            return Err(ConvertError::IndexedFormatNeedsPalette {
                format: info.to_string(),
            });
        }
        let palette = FixedPalette::for_format(&info, self.options.round_method)?;
        self.run(src, src_size, info, &palette)
    }

    /// Run the pipeline with an externally supplied palette, e.g. a fixed
    /// panel palette or a learned one.
    pub fn convert_with_palette(
        &self,
        src: &[u8],
        src_size: Size,
        palette: &dyn Palette,
    ) -> Result<ConvertOutput, ConvertError> {
        let info = PixelFormatInfo::new(self.options.format);
        self.run(src, src_size, info, palette)
    }

    fn run(
        &self,
        src: &[u8],
        src_size: Size,
        info: PixelFormatInfo,
        palette: &dyn Palette,
    ) -> Result<ConvertOutput, ConvertError> {
        let preprocessor = Preprocessor::new(self.options.preprocess.clone());
        let pre = preprocessor.process(src, src_size)?;
        let reduced = reduce::reduce(&pre.image, &info, palette, &self.options.reduce);
        let planes = encode::encode(&reduced, &self.options.encode)?;
        debug!(
            format = %info,
            num_planes = planes.len(),
            "Conversion finished"
        );
        Ok(ConvertOutput {
            planes,
            reduced,
            gamma: pre.gamma,
            brightness: pre.brightness,
            contrast: pre.contrast,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter_follows_format_color_space() {
        use crate::image::ColorSpace;
        let converter = Converter::new(PixelFormat::Bw, Size::new(8, 8));
        assert_eq!(
            converter.options().preprocess.color_space,
            ColorSpace::Grayscale
        );
        let converter = Converter::new(PixelFormat::Rgb565, Size::new(8, 8));
        assert_eq!(converter.options().preprocess.color_space, ColorSpace::Rgb);
    }

    #[test]
    fn test_end_to_end_bw() {
        // 8x1 image, left half black, right half white, no dithering
        let mut src = Vec::new();
        for x in 0..8 {
            let v = if x < 4 { 0 } else { 255 };
            src.extend_from_slice(&[v, v, v, 255]);
        }
        let converter = Converter::new(PixelFormat::Bw, Size::new(8, 1))
            .with_reduce(ReduceOptions::no_dither())
            .with_encode(EncodeArgs {
                alpha_first: false,
                color_descending: false,
                planes: vec![crate::encode::PlaneArgs {
                    pack_unit: crate::encode::PackUnit::Alignment,
                    far_pixel_first: true,
                    ..crate::encode::PlaneArgs::new("main")
                }],
            });
        let out = converter.convert(&src, Size::new(8, 1)).unwrap();
        assert_eq!(out.planes[0].blob.bytes, vec![0x0F]);
    }
}
