//! Image data model: pixel format descriptions and the normalized /
//! reduced image buffers passed between pipeline stages.

mod format;
mod normalized;
mod reduced;

pub use format::{ColorSpace, PixelFormat, PixelFormatInfo};
pub use normalized::NormalizedImage;
pub use reduced::ReducedImage;
