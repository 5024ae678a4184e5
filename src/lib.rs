//! imgarray: deterministic image-to-byte-array conversion for embedded
//! display drivers.
//!
//! The pipeline turns an already-decoded RGBA8 buffer into one or more
//! packed byte blobs, bit-exact to a declarative layout configuration:
//!
//! 1. [`preprocess`] trims, resizes and tone-corrects into a
//!    [`NormalizedImage`](image::NormalizedImage);
//! 2. [`reduce`] quantizes through a [`Palette`](palette::Palette), with
//!    optional serpentine error diffusion, into a
//!    [`ReducedImage`](image::ReducedImage);
//! 3. [`encode`] serializes the code planes under configurable channel
//!    order, pixel order, endianness, packing and alignment.
//!
//! # Quick Start
//!
//! The [`Converter`] builder drives the whole pipeline:
//!
//! ```
//! use imgarray::{Converter, PixelFormat, Size};
//!
//! let pixels = vec![255u8; 16 * 16 * 4]; // opaque white RGBA
//! let converter = Converter::new(PixelFormat::Bw, Size::new(16, 16));
//! let out = converter.convert(&pixels, Size::new(16, 16)).unwrap();
//! assert!(out.planes[0].blob.bytes.iter().all(|&b| b == 0x01));
//! ```
//!
//! The stages are also usable on their own; see [`preprocess::Preprocessor`],
//! [`reduce::reduce`] and [`encode::encode`].
//!
//! No stage performs I/O or holds global state; every run is a pure
//! function from input buffers and configuration to fresh output buffers.

pub mod color;
mod convert;
pub mod encode;
mod error;
mod geom;
pub mod image;
pub mod palette;
pub mod preprocess;
pub mod reduce;

pub use convert::{ConvertOptions, ConvertOutput, Converter};
pub use error::ConvertError;
pub use geom::{Point, Rect, Size};
pub use image::PixelFormat;
