//! Region fills shared by the alias-model decoders.

use crate::arena::Arena;
use crate::endian::{declared_region, name_bytes, read_le_i16, region};
use crate::error::{corrupt, LoadError, Result};
use crate::layout::{AliasCounts, LayoutPlan};
use crate::model_types::{
    FrameHeader, MeshNode, ModelHeader, SkinName, StVert, TriVertex, Triangle, FRAME_HEADER_SIZE,
    MAX_SKINNAME, TRIVERTEX_SIZE,
};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Reads `N` consecutive header words.
pub fn header_words<const N: usize>(data: &[u8], what: &'static str) -> Result<[i32; N]> {
    let bytes = region(data, 0, N * 4, what)?;
    let mut cursor = Cursor::new(bytes);
    let mut words = [0i32; N];
    for word in &mut words {
        *word = cursor.read_i32::<LittleEndian>()?;
    }
    Ok(words)
}

pub fn word_f32(word: i32) -> f32 {
    f32::from_bits(word as u32)
}

pub fn check_ident(found: i32, expected: u32) -> Result<()> {
    if found as u32 != expected {
        return Err(LoadError::BadIdent { found: found as u32, expected });
    }
    Ok(())
}

pub fn check_version(found: i32, expected: i32) -> Result<()> {
    if found != expected {
        return Err(LoadError::VersionMismatch { found, expected });
    }
    Ok(())
}

/// Source slice `[offset, offset + count * record)` of a header-addressed table.
pub fn table<'a>(
    data: &'a [u8],
    offset: i32,
    count: u32,
    record: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    let len = (count as usize)
        .checked_mul(record)
        .ok_or_else(|| corrupt(format!("{what} table size overflows")))?;
    declared_region(data, offset, len, what)
}

/// Everything from `offset` to the end of `data`.
pub fn tail<'a>(data: &'a [u8], offset: i32, what: &'static str) -> Result<&'a [u8]> {
    let start = usize::try_from(offset).map_err(|_| corrupt(format!("negative {what} offset")))?;
    data.get(start..)
        .ok_or(LoadError::TruncatedInput { what, needed: start, available: data.len() })
}

/// Plans and commits the arena for validated counts.
pub fn allocate(counts: &AliasCounts) -> Result<(Arena, ModelHeader)> {
    let plan = LayoutPlan::alias(counts)?;
    let arena = plan.allocate()?;
    Ok((arena, *plan.header()))
}

pub fn fill_single_mesh(arena: &mut Arena, header: &ModelHeader) -> Result<()> {
    let nodes = arena.view_mut::<MeshNode>(header.ofs_meshes as usize, 1)?;
    nodes[0] = MeshNode { start: 0, count: header.num_glcmds };
    Ok(())
}

pub fn fill_skin_names(arena: &mut Arena, header: &ModelHeader, src: &[u8]) -> Result<()> {
    let names = arena.view_mut::<SkinName>(header.ofs_skins as usize, header.num_skins as usize)?;
    for (name, raw) in names.iter_mut().zip(src.chunks_exact(MAX_SKINNAME)) {
        name.copy_from_slice(raw);
    }
    Ok(())
}

pub fn fill_st(arena: &mut Arena, header: &ModelHeader, src: &[u8]) -> Result<()> {
    let st = arena.view_mut::<StVert>(header.ofs_st as usize, header.num_st as usize)?;
    for (out, raw) in st.iter_mut().zip(src.chunks_exact(4)) {
        *out = StVert {
            s: read_le_i16([raw[0], raw[1]]),
            t: read_le_i16([raw[2], raw[3]]),
        };
    }
    Ok(())
}

fn checked_corner(value: i16, limit: u32, what: &str, tri: usize) -> Result<u16> {
    let index = value as u16;
    if value < 0 || u32::from(index) >= limit {
        return Err(corrupt(format!(
            "triangle {tri} {what} index {value} outside 0..{limit}"
        )));
    }
    Ok(index)
}

/// Copies triangles stored as `index_xyz[3], index_st[3]` shorts, each
/// record starting `skip` bytes in.
pub fn fill_triangles(
    arena: &mut Arena,
    header: &ModelHeader,
    src: &[u8],
    record: usize,
    skip: usize,
) -> Result<()> {
    let (num_xyz, num_st) = (header.num_xyz, header.num_st);
    let tris = arena.view_mut::<Triangle>(header.ofs_tris as usize, header.num_tris as usize)?;
    for (i, (out, raw)) in tris.iter_mut().zip(src.chunks_exact(record)).enumerate() {
        let mut cursor = Cursor::new(&raw[skip..]);
        for corner in 0..3 {
            out.index_xyz[corner] =
                checked_corner(cursor.read_i16::<LittleEndian>()?, num_xyz, "vertex", i)?;
        }
        for corner in 0..3 {
            out.index_st[corner] =
                checked_corner(cursor.read_i16::<LittleEndian>()?, num_st, "texcoord", i)?;
        }
    }
    Ok(())
}

/// Reads a stored frame header, adding `translate` to the stored translate.
pub fn read_frame_header(raw: &[u8], translate: [f32; 3]) -> Result<FrameHeader> {
    let mut cursor = Cursor::new(raw);
    let mut header = FrameHeader::default();
    for axis in 0..3 {
        header.scale[axis] = cursor.read_f32::<LittleEndian>()?;
    }
    for axis in 0..3 {
        header.translate[axis] = cursor.read_f32::<LittleEndian>()? + translate[axis];
    }
    header.name = name_bytes(&mut cursor)?;
    Ok(header)
}

pub fn write_frame(
    arena: &mut Arena,
    header: &ModelHeader,
    index: usize,
    frame: &FrameHeader,
    vertices: impl Iterator<Item = TriVertex>,
) -> Result<()> {
    let offset = header.ofs_frames as usize + index * header.frame_size as usize;
    let num_xyz = header.num_xyz as usize;
    let bytes = arena.slice_mut(offset, header.frame_size as usize)?;
    let (head, verts) = bytes.split_at_mut(FRAME_HEADER_SIZE);
    head.copy_from_slice(bytemuck::bytes_of(frame));
    let verts: &mut [TriVertex] = bytemuck::try_cast_slice_mut(verts)
        .map_err(|_| corrupt("frame vertices misaligned"))?;
    for (out, vertex) in verts.iter_mut().take(num_xyz).zip(vertices) {
        *out = vertex;
    }
    Ok(())
}

/// Copies frames with 8-bit vertices: `frame_stride` bytes per source frame.
pub fn fill_byte_frames(
    arena: &mut Arena,
    header: &ModelHeader,
    src: &[u8],
    frame_stride: usize,
    translate: [f32; 3],
) -> Result<()> {
    let num_xyz = header.num_xyz as usize;
    for index in 0..header.num_frames as usize {
        let raw = region(src, index * frame_stride, frame_stride, "frame")?;
        let frame = read_frame_header(raw, translate)?;
        let verts = region(raw, FRAME_HEADER_SIZE, num_xyz * TRIVERTEX_SIZE, "frame vertices")?;
        let vertices = verts.chunks_exact(TRIVERTEX_SIZE).map(|v| TriVertex {
            v: [v[0], v[1], v[2]],
            light_normal: v[3],
        });
        write_frame(arena, header, index, &frame, vertices)?;
    }
    Ok(())
}

pub fn commands_mut<'a>(arena: &'a mut Arena, header: &ModelHeader) -> Result<&'a mut [i32]> {
    arena.view_mut::<i32>(header.ofs_glcmds as usize, header.num_glcmds as usize)
}
