//! Records stored inside a model arena, plus the intermediate mesh used for export.

use bytemuck::{Pod, Zeroable};

pub const MAX_SKINNAME: usize = 64;
pub const FRAME_NAME_LEN: usize = 16;

/// scale + translate + name
pub const FRAME_HEADER_SIZE: usize = std::mem::size_of::<FrameHeader>();
pub const TRIVERTEX_SIZE: usize = std::mem::size_of::<TriVertex>();

pub type SkinName = [u8; MAX_SKINNAME];

/// Normalized descriptor at offset 0 of an alias model arena.
///
/// Offsets are relative to the arena base. Region order never changes:
/// mesh nodes, skins, texture coordinates, triangles, commands, frames,
/// then the optional 8-bit image atlas.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ModelHeader {
    pub skin_width: u32,
    pub skin_height: u32,
    pub frame_size: u32,

    pub num_meshes: u32,
    pub num_skins: u32,
    pub num_xyz: u32,
    pub num_st: u32,
    pub num_tris: u32,
    pub num_glcmds: u32,
    pub num_frames: u32,
    pub num_imgbit: u32,

    pub ofs_meshes: u32,
    pub ofs_skins: u32,
    pub ofs_st: u32,
    pub ofs_tris: u32,
    pub ofs_glcmds: u32,
    pub ofs_frames: u32,
    pub ofs_imgbit: u32,
    pub ofs_end: u32,
    pub reserved: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MeshNode {
    pub start: u32,
    pub count: u32,
}

/// Texture coordinate in skin pixels.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct StVert {
    pub s: i16,
    pub t: i16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Triangle {
    pub index_xyz: [u16; 3],
    pub index_st: [u16; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct FrameHeader {
    pub scale: [f32; 3],
    pub translate: [f32; 3],
    pub name: [u8; FRAME_NAME_LEN],
}

/// One lattice vertex: 8 bits per axis plus the light normal index.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TriVertex {
    pub v: [u8; 3],
    pub light_normal: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SpriteHeader {
    pub num_frames: u32,
    pub ofs_frames: u32,
    pub ofs_end: u32,
    pub reserved: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct SpriteFrame {
    pub width: i32,
    pub height: i32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub name: SkinName,
}

impl Default for SpriteFrame {
    fn default() -> Self {
        Self::zeroed()
    }
}

pub const fn frame_size(num_xyz: usize) -> usize {
    FRAME_HEADER_SIZE + num_xyz * TRIVERTEX_SIZE
}

impl FrameHeader {
    /// Model-space position of a lattice vertex.
    pub fn position(&self, vertex: &TriVertex) -> [f32; 3] {
        [
            f32::from(vertex.v[0]) * self.scale[0] + self.translate[0],
            f32::from(vertex.v[1]) * self.scale[1] + self.translate[1],
            f32::from(vertex.v[2]) * self.scale[2] + self.translate[2],
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntermediateVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct IntermediateMesh {
    pub vertices: Vec<IntermediateVertex>,
    pub faces: Vec<[u32; 3]>,
}
