//! Unified error type for the conversion pipeline.
//!
//! Every stage validates its own preconditions and fails fast; a failed
//! stage returns no partial output and downstream stages are never invoked
//! with a known-invalid upstream result.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Non-positive width or height in source, trim, or output sizing.
    #[error("{context} size must be positive, got {width}x{height}")]
    InvalidGeometry {
        context: &'static str,
        width: i64,
        height: i64,
    },

    /// Requested output exceeds the pixel budget.
    #[error("requested output {width}x{height} exceeds the budget of {max_pixels} pixels")]
    OutputTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    /// Source buffer length does not match the declared dimensions.
    #[error("source buffer holds {got} bytes, expected {expected} for {width}x{height} RGBA")]
    SourceBufferMismatch {
        got: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    /// A color space implies a channel count the palette does not handle.
    #[error("unsupported channel count {got} for {context}")]
    InvalidChannelCount {
        context: &'static str,
        got: usize,
    },

    /// A channel bit depth outside the supported range.
    #[error("channel bit depth must be between 1 and 8, got {got}")]
    InvalidBitDepth { got: u8 },

    /// The default uniform quantizer cannot serve an indexed format.
    #[error("indexed format {format} requires an explicit palette")]
    IndexedFormatNeedsPalette { format: String },

    /// ALIGNMENT packing cannot fit even a single pixel in one aligned unit.
    #[error("a {pixel_bits}-bit pixel does not fit the {boundary}-bit alignment boundary")]
    PixelOverflowsAlignment { pixel_bits: u32, boundary: u32 },

    /// A plane ended up with no bit fields assigned.
    #[error("plane {id:?} has no bit fields assigned")]
    EmptyFieldList { id: String },
}
