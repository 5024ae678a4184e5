//! Declarative byte/bit layout configuration and the field placement
//! rules derived from it.

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::image::PixelFormatInfo;

/// How many pixels or channels share one aligned group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackUnit {
    /// One channel per aligned lane.
    Unpacked,
    /// One pixel per aligned unit.
    Pixel,
    /// Multiple whole pixels share one alignment-boundary-sized unit.
    Alignment,
}

/// Bit width to which a lane, pixel or fragment is padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignBoundary {
    Nibble,
    Byte1,
    Byte2,
    Byte3,
    Byte4,
}

impl AlignBoundary {
    pub fn bits(self) -> u32 {
        match self {
            AlignBoundary::Nibble => 4,
            AlignBoundary::Byte1 => 8,
            AlignBoundary::Byte2 => 16,
            AlignBoundary::Byte3 => 24,
            AlignBoundary::Byte4 => 32,
        }
    }
}

/// How a plane reads the reduced code planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaneType {
    /// Emit the channel codes themselves.
    Direct,
    /// Emit a 1-bit flag per pixel: does the index code equal a given
    /// value. Used for per-color planes of multi-color e-paper panels.
    IndexMatch,
}

/// Layout configuration for one output plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneArgs {
    pub id: String,
    pub plane_type: PlaneType,
    /// Index code matched by [`PlaneType::IndexMatch`].
    pub index_match_value: u8,
    /// Invert the match flag.
    pub post_invert: bool,
    /// Place the last pixel of a fragment in the highest bit slot.
    pub far_pixel_first: bool,
    pub big_endian: bool,
    pub pack_unit: PackUnit,
    /// Pack the pixels of a fragment vertically instead of horizontally.
    pub vert_pack: bool,
    pub align_boundary: AlignBoundary,
    /// Pad toward the low bits, keeping the payload in the high bits.
    pub align_left: bool,
    /// Walk the fragment grid column-major instead of row-major.
    pub vert_addr: bool,
}

impl Default for PlaneArgs {
    fn default() -> Self {
        Self {
            id: String::new(),
            plane_type: PlaneType::Direct,
            index_match_value: 0,
            post_invert: false,
            far_pixel_first: false,
            big_endian: false,
            pack_unit: PackUnit::Pixel,
            vert_pack: false,
            align_boundary: AlignBoundary::Byte1,
            align_left: false,
            vert_addr: false,
        }
    }
}

impl PlaneArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn index_match(id: impl Into<String>, value: u8) -> Self {
        Self {
            id: id.into(),
            plane_type: PlaneType::IndexMatch,
            index_match_value: value,
            ..Self::default()
        }
    }
}

/// Full encoder configuration: global channel ordering plus one layout per
/// output plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeArgs {
    /// Place the alpha field before the color fields.
    pub alpha_first: bool,
    /// Place the color fields in descending channel order (BGR instead of
    /// RGB).
    pub color_descending: bool,
    pub planes: Vec<PlaneArgs>,
}

impl Default for EncodeArgs {
    fn default() -> Self {
        Self {
            alpha_first: false,
            color_descending: false,
            planes: vec![PlaneArgs::default()],
        }
    }
}

/// One bit field inside a pixel or fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Index into [`crate::image::ReducedImage::data`].
    pub src_channel: usize,
    /// Bit offset within the pixel slot.
    pub pos: u32,
    pub width: u32,
}

/// The geometry derived for one plane before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaneLayout {
    pub fields: Vec<FieldLayout>,
    /// Bits per pixel slot, padding included.
    pub pixel_stride: u32,
    pub pixels_per_frag: u32,
    pub bytes_per_frag: u32,
    /// Whether any padding was actually introduced.
    pub align_required: bool,
}

fn int_ceil(value: u32, step: u32) -> u32 {
    value.div_ceil(step) * step
}

/// Build the ordered field list for a plane.
///
/// Direct planes carry one field per code channel, with the alpha field
/// first or last per `alpha_first` and color fields ascending or descending
/// per `color_descending`; indexed formats collapse the colors into a
/// single index field. Index-match planes carry exactly one 1-bit field.
fn assign_fields(format: &PixelFormatInfo, args: &EncodeArgs, plane: &PlaneArgs) -> Vec<FieldLayout> {
    let mut fields = Vec::new();

    if plane.plane_type == PlaneType::IndexMatch {
        fields.push(FieldLayout {
            src_channel: 0,
            pos: 0,
            width: 1,
        });
        return fields;
    }

    let alpha_field = format.has_alpha().then(|| FieldLayout {
        src_channel: format.alpha_plane_index(),
        pos: 0,
        width: format.alpha_bits as u32,
    });

    if let (Some(field), true) = (alpha_field, args.alpha_first) {
        fields.push(field);
    }
    if format.is_indexed() {
        fields.push(FieldLayout {
            src_channel: 0,
            pos: 0,
            width: format.index_bits as u32,
        });
    } else {
        let num_col = format.num_color_channels();
        for ch in 0..num_col {
            let src_channel = if args.color_descending {
                num_col - 1 - ch
            } else {
                ch
            };
            fields.push(FieldLayout {
                src_channel,
                pos: 0,
                width: format.color_bits[src_channel] as u32,
            });
        }
    }
    if let (Some(field), false) = (alpha_field, args.alpha_first) {
        fields.push(field);
    }

    fields
}

/// Place the fields of one plane and derive the fragment geometry.
pub(crate) fn compute_layout(
    format: &PixelFormatInfo,
    args: &EncodeArgs,
    plane: &PlaneArgs,
) -> Result<PlaneLayout, ConvertError> {
    let mut fields = assign_fields(format, args, plane);
    if fields.is_empty() {
        return Err(ConvertError::EmptyFieldList {
            id: plane.id.clone(),
        });
    }

    let boundary = plane.align_boundary.bits();
    let mut align_required = false;
    let pixel_stride;
    let pixels_per_frag;
    let bytes_per_frag;

    match plane.pack_unit {
        PackUnit::Unpacked => {
            // every channel gets a lane wide enough for the widest one
            let max_ch_bits = fields.iter().map(|f| f.width).max().unwrap_or(0);
            let ch_stride = int_ceil(max_ch_bits, boundary);
            for (ch, field) in fields.iter_mut().enumerate() {
                field.pos = ch as u32 * ch_stride;
                align_required |= ch_stride != field.width;
                if plane.align_left {
                    field.pos += ch_stride - field.width;
                }
            }
            pixel_stride = ch_stride * fields.len() as u32;
            bytes_per_frag = pixel_stride.div_ceil(8);
            pixels_per_frag = 1;
        }
        PackUnit::Pixel | PackUnit::Alignment => {
            let mut pix_bits = 0;
            for field in fields.iter_mut() {
                field.pos = pix_bits;
                pix_bits += field.width;
            }

            if plane.pack_unit == PackUnit::Pixel {
                pixel_stride = int_ceil(pix_bits, boundary);
                pixels_per_frag = (8 / pixel_stride).max(1);
                bytes_per_frag = pixel_stride.div_ceil(8);
                align_required = pixel_stride != pix_bits;
                if plane.align_left {
                    for field in fields.iter_mut() {
                        field.pos += pixel_stride - pix_bits;
                    }
                }
            } else {
                if pix_bits > boundary {
                    return Err(ConvertError::PixelOverflowsAlignment {
                        pixel_bits: pix_bits,
                        boundary,
                    });
                }
                pixel_stride = pix_bits;
                pixels_per_frag = boundary / pix_bits;
                let frag_bits = pix_bits * pixels_per_frag;
                let frag_stride = int_ceil(frag_bits, boundary);
                bytes_per_frag = frag_stride.div_ceil(8);
                align_required = frag_stride != frag_bits;
                if plane.align_left {
                    for field in fields.iter_mut() {
                        field.pos += frag_stride - frag_bits;
                    }
                }
            }
        }
    }

    Ok(PlaneLayout {
        fields,
        pixel_stride,
        pixels_per_frag,
        bytes_per_frag,
        align_required,
    })
}
