//! Geometric and tonal preprocessing: raw RGBA8 in,
//! [`NormalizedImage`](crate::image::NormalizedImage) out.

mod options;
mod preprocessor;
mod resize;

pub use options::{
    AlphaMode, CsrMode, InterpMethod, PreprocessOptions, ScalarParam, ScalingMethod,
};
pub use preprocessor::{PreprocessResult, Preprocessor};
pub use resize::MAX_OUTPUT_PIXELS;
