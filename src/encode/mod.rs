//! Bit-field packing: serialize a [`ReducedImage`] into one byte blob per
//! configured plane.
//!
//! [`ReducedImage`]: crate::image::ReducedImage

mod layout;

use std::fmt::Write as _;

use tracing::debug;

use crate::error::ConvertError;
use crate::image::ReducedImage;

use layout::PlaneLayout;
pub use layout::{AlignBoundary, EncodeArgs, FieldLayout, PackUnit, PlaneArgs, PlaneType};

/// A packed byte buffer plus a human-readable description of its layout.
/// The comment is metadata only and is never parsed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayBlob {
    pub name: String,
    pub bytes: Vec<u8>,
    pub comment: String,
}

/// The serialized result for one plane: the derived geometry (kept so
/// hosts can describe or validate the layout) and the byte blob itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneOutput {
    pub fields: Vec<FieldLayout>,
    pub pixel_stride: u32,
    pub pixels_per_frag: u32,
    pub bytes_per_frag: u32,
    pub align_required: bool,
    pub blob: ArrayBlob,
}

/// Serialize the reduced image into one blob per plane.
///
/// Planes are laid out and serialized independently over the same input;
/// multi-plane configurations are used for controllers that take separate
/// per-color buffers.
pub fn encode(src: &ReducedImage, args: &EncodeArgs) -> Result<Vec<PlaneOutput>, ConvertError> {
    let mut outputs = Vec::with_capacity(args.planes.len());
    for plane in &args.planes {
        let layout = layout::compute_layout(&src.format, args, plane)?;
        debug!(
            plane = %plane.id,
            pixel_stride = layout.pixel_stride,
            pixels_per_frag = layout.pixels_per_frag,
            bytes_per_frag = layout.bytes_per_frag,
            "Serializing plane"
        );
        let bytes = serialize_plane(src, plane, &layout);
        let comment = build_comment(src, plane, &layout, bytes.len());
        outputs.push(PlaneOutput {
            fields: layout.fields,
            pixel_stride: layout.pixel_stride,
            pixels_per_frag: layout.pixels_per_frag,
            bytes_per_frag: layout.bytes_per_frag,
            align_required: layout.align_required,
            blob: ArrayBlob {
                name: plane.id.clone(),
                bytes,
                comment,
            },
        });
    }
    Ok(outputs)
}

fn serialize_plane(src: &ReducedImage, plane: &PlaneArgs, layout: &PlaneLayout) -> Vec<u8> {
    let width = src.width as usize;
    let height = src.height as usize;
    let (frag_width, frag_height) = if plane.vert_pack {
        (1usize, layout.pixels_per_frag as usize)
    } else {
        (layout.pixels_per_frag as usize, 1usize)
    };
    let frag_size = frag_width * frag_height;
    let cols = width.div_ceil(frag_width);
    let rows = height.div_ceil(frag_height);
    let num_frags = cols * rows;
    let bytes_per_frag = layout.bytes_per_frag as usize;

    let mut out = Vec::with_capacity(num_frags * bytes_per_frag);

    for i_frag in 0..num_frags {
        let (x_coarse, y_coarse) = if plane.vert_addr {
            (frag_width * (i_frag / rows), frag_height * (i_frag % rows))
        } else {
            (frag_width * (i_frag % cols), frag_height * (i_frag / cols))
        };

        // the widest possible fragment is four unpacked channels on a
        // 32-bit boundary, 128 bits
        let mut frag_data: u128 = 0;
        for i_src in 0..frag_size {
            let i_dest = if plane.far_pixel_first {
                frag_size - 1 - i_src
            } else {
                i_src
            };
            let x = x_coarse + i_src % frag_width;
            let y = y_coarse + i_src / frag_width;
            if x >= width || y >= height {
                // partial fragments at the edges leave their slots zero
                continue;
            }
            let pix_offset = layout.pixel_stride * i_dest as u32;
            let i_pix = y * width + x;

            match plane.plane_type {
                PlaneType::Direct => {
                    for field in &layout.fields {
                        let ch_data = src.data[field.src_channel][i_pix] as u128;
                        frag_data |= ch_data << (pix_offset + field.pos);
                    }
                }
                PlaneType::IndexMatch => {
                    let ch_data = src.data[0][i_pix];
                    let matched = (ch_data == plane.index_match_value) != plane.post_invert;
                    if matched {
                        frag_data |= 1u128 << (pix_offset + layout.fields[0].pos);
                    }
                }
            }
        }

        let frag_bits = bytes_per_frag as u32 * 8;
        for j in 0..bytes_per_frag {
            let shift = if plane.big_endian {
                frag_bits - 8 * (j as u32 + 1)
            } else {
                8 * j as u32
            };
            out.push((frag_data >> shift) as u8);
        }
    }

    out
}

fn build_comment(
    src: &ReducedImage,
    plane: &PlaneArgs,
    layout: &PlaneLayout,
    num_bytes: usize,
) -> String {
    let mut buff = String::new();
    let _ = writeln!(buff, "{}x{}px, {}", src.width, src.height, src.format);
    if plane.plane_type == PlaneType::IndexMatch {
        let _ = write!(buff, "Plane {:?}, color index={}", plane.id, plane.index_match_value);
        if plane.post_invert {
            buff.push_str(", Inverted");
        }
        buff.push('\n');
    }
    if layout.fields.len() > 1 {
        let order: Vec<&str> = layout
            .fields
            .iter()
            .map(|f| src.format.channel_name(f.src_channel))
            .collect();
        let _ = write!(buff, "{}, ", order.join(":"));
    }
    if layout.pixels_per_frag > 1 {
        let _ = write!(
            buff,
            "{} First, {} Packing, ",
            if plane.far_pixel_first { "MSB" } else { "LSB" },
            if plane.vert_pack { "Vertical" } else { "Horizontal" },
        );
    }
    if layout.bytes_per_frag > 1 {
        let _ = write!(
            buff,
            "{} Endian, ",
            if plane.big_endian { "Big" } else { "Little" }
        );
    }
    let _ = writeln!(
        buff,
        "{} Addressing",
        if plane.vert_addr { "Vertical" } else { "Horizontal" }
    );
    let _ = writeln!(buff, "{} Bytes", num_bytes);
    buff
}
