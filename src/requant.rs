//! Vertex re-quantization onto the 8-bit frame lattice.
//!
//! Packed DKM v2 positions carry 11/10/11 bits per axis. They are widened to
//! a common 16-bit intermediate and then rounded down to 8 bits; the frame
//! scale absorbs the change of range so that `lattice * scale` stays close to
//! `raw * file_scale`. The extra precision is discarded.

use crate::model_types::TriVertex;

pub const LATTICE_MAX: u32 = 0xFF;
pub const WIDE_MAX: u32 = 0xFFFF;

/// Largest raw value per axis of a packed position word.
pub const PACKED_AXIS_MAX: [u32; 3] = [0x7FF, 0x3FF, 0x7FF];

/// Splits a packed position word into its x, y and z fields.
pub fn unpack_packed_position(word: u32) -> [u32; 3] {
    [(word >> 21) & 0x7FF, (word >> 11) & 0x3FF, word & 0x7FF]
}

pub fn widen_to_u16(value: u32, max: u32) -> u32 {
    value.min(max) * WIDE_MAX / max
}

pub fn lattice_from_u16(wide: u32) -> u8 {
    ((wide.min(WIDE_MAX) * LATTICE_MAX + WIDE_MAX / 2) / WIDE_MAX) as u8
}

/// Re-quantizes one packed vertex.
pub fn packed_to_lattice(word: u32, light_normal: u8) -> TriVertex {
    let raw = unpack_packed_position(word);
    let mut v = [0u8; 3];
    for axis in 0..3 {
        v[axis] = lattice_from_u16(widen_to_u16(raw[axis], PACKED_AXIS_MAX[axis]));
    }
    TriVertex { v, light_normal }
}

/// Frame scale to store for a packed frame whose file scale is `scale`.
pub fn packed_scale(scale: [f32; 3]) -> [f32; 3] {
    let mut out = scale;
    for axis in 0..3 {
        out[axis] *= PACKED_AXIS_MAX[axis] as f32 / LATTICE_MAX as f32;
    }
    out
}
