use super::common::{
    allocate, check_ident, check_version, commands_mut, fill_single_mesh, header_words, word_f32,
    write_frame,
};
use super::{ModelDecoder, ModelFormat, MDL_IDENT};
use crate::commands::CommandWriter;
use crate::config::LoaderLimits;
use crate::endian::encode_name;
use crate::error::{corrupt, truncated, LoadError, Result};
use crate::layout::{AliasCounts, DeclaredCounts};
use crate::model::{LoadedModel, ModelKind};
use crate::model_types::{
    FrameHeader, SkinName, StVert, TriVertex, Triangle, FRAME_NAME_LEN, TRIVERTEX_SIZE,
};
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::{Cursor, Read};

pub const MDL_VERSION: i32 = 6;
pub const MDL_HEADER_SIZE: usize = 84;
pub const MDL_SKIN_BITS: u32 = 8;

const TEXCOORD_SIZE: usize = 12;
const TRIANGLE_SIZE: usize = 16;
// type, bbox min, bbox max, name
const FRAME_PREFIX_SIZE: usize = 4 + 2 * TRIVERTEX_SIZE + FRAME_NAME_LEN;

/// `.mdl` models with an embedded 8-bit skin atlas.
pub struct MdlDecoder;

struct MdlHeader {
    ident: i32,
    version: i32,
    scale: [f32; 3],
    translate: [f32; 3],
    num_skins: i32,
    skin_width: i32,
    skin_height: i32,
    num_xyz: i32,
    num_tris: i32,
    num_frames: i32,
}

impl MdlHeader {
    fn parse(data: &[u8]) -> Result<Self> {
        let w: [i32; MDL_HEADER_SIZE / 4] = header_words(data, "mdl header")?;
        // bounding radius, eye position, sync type, flags and size are unused
        Ok(Self {
            ident: w[0],
            version: w[1],
            scale: [word_f32(w[2]), word_f32(w[3]), word_f32(w[4])],
            translate: [word_f32(w[5]), word_f32(w[6]), word_f32(w[7])],
            num_skins: w[12],
            skin_width: w[13],
            skin_height: w[14],
            num_xyz: w[15],
            num_tris: w[16],
            num_frames: w[17],
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct TexCoord {
    onseam: bool,
    s: i32,
    t: i32,
}

#[derive(Debug, Clone, Copy)]
struct Face {
    front: bool,
    vertex: [i32; 3],
}

fn skin_extent(value: i32, what: &'static str, limits: &LoaderLimits) -> Result<()> {
    let max = i64::from(limits.max_skin_dimension);
    if value < 1 || i64::from(value) > max {
        return Err(LoadError::LimitExceeded { what, value: i64::from(value), min: 1, max });
    }
    Ok(())
}

fn body_size(counts: &AliasCounts) -> Option<usize> {
    let pixels = counts.skin_width as usize * counts.skin_height as usize;
    let skins = (4 + pixels).checked_mul(counts.num_skins as usize)?;
    let texcoords = TEXCOORD_SIZE * counts.num_xyz as usize;
    let tris = TRIANGLE_SIZE * counts.num_tris as usize;
    let frames = (FRAME_PREFIX_SIZE + TRIVERTEX_SIZE * counts.num_xyz as usize)
        .checked_mul(counts.num_frames as usize)?;
    skins.checked_add(texcoords)?.checked_add(tris)?.checked_add(frames)
}

/// Texture coordinate for one triangle corner, normalized to `[0, 1]`.
///
/// Back-facing triangles sample seam vertices from the right half of the skin.
pub fn seam_adjusted_st(
    s: i32,
    t: i32,
    onseam: bool,
    facesfront: bool,
    skin_width: u32,
    skin_height: u32,
) -> (f32, f32) {
    let mut s = s as f32;
    let t = t as f32;
    if !facesfront && onseam {
        s += skin_width as f32 * 0.5;
    }
    (
        (s + 0.5) / skin_width as f32,
        (t + 0.5) / skin_height as f32,
    )
}

impl ModelDecoder for MdlDecoder {
    fn format(&self) -> ModelFormat {
        ModelFormat::Mdl
    }

    fn decode(&self, name: &str, data: &[u8], limits: &LoaderLimits) -> Result<LoadedModel> {
        let pin = MdlHeader::parse(data)?;
        check_ident(pin.ident, MDL_IDENT)?;
        check_version(pin.version, MDL_VERSION)?;

        skin_extent(pin.skin_width, "skin width", limits)?;
        skin_extent(pin.skin_height, "skin height", limits)?;

        let mut counts = AliasCounts::validate(
            &DeclaredCounts {
                skin_width: pin.skin_width,
                skin_height: pin.skin_height,
                num_meshes: 1,
                num_skins: pin.num_skins,
                num_xyz: pin.num_xyz,
                num_st: pin.num_xyz,
                num_tris: pin.num_tris,
                // one 3-vertex batch per triangle plus the terminator
                num_glcmds: pin.num_tris.saturating_mul(10).saturating_add(1),
                num_frames: pin.num_frames,
            },
            limits,
        )?;
        counts.inline_skin_bits = MDL_SKIN_BITS;

        let body = &data[MDL_HEADER_SIZE..];
        let needed = body_size(&counts).ok_or_else(|| corrupt("mdl body size overflows"))?;
        if needed > body.len() {
            return Err(truncated("mdl body", MDL_HEADER_SIZE + needed, data.len()));
        }

        let (mut arena, header) = allocate(&counts)?;
        let mut cursor = Cursor::new(body);
        let pixels = counts.skin_width as usize * counts.skin_height as usize;

        for index in 0..header.num_skins as usize {
            let skin_type = cursor.read_i32::<LittleEndian>()?;
            if skin_type != 0 {
                return Err(LoadError::UnsupportedVariant(format!("skin type {skin_type}")));
            }
            let atlas = arena.slice_mut(header.ofs_imgbit as usize + index * pixels, pixels)?;
            cursor.read_exact(atlas)?;

            let names =
                arena.view_mut::<SkinName>(header.ofs_skins as usize, header.num_skins as usize)?;
            names[index] = encode_name(&format!("{name}#{index}.tga"));
        }

        let mut texcoords = Vec::with_capacity(header.num_st as usize);
        for _ in 0..header.num_st {
            texcoords.push(TexCoord {
                onseam: cursor.read_i32::<LittleEndian>()? != 0,
                s: cursor.read_i32::<LittleEndian>()?,
                t: cursor.read_i32::<LittleEndian>()?,
            });
        }
        let st = arena.view_mut::<StVert>(header.ofs_st as usize, header.num_st as usize)?;
        for (i, (out, tc)) in st.iter_mut().zip(&texcoords).enumerate() {
            let (Ok(s), Ok(t)) = (i16::try_from(tc.s), i16::try_from(tc.t)) else {
                return Err(corrupt(format!("texcoord {i} ({}, {}) out of range", tc.s, tc.t)));
            };
            *out = StVert { s, t };
        }

        let mut faces = Vec::with_capacity(header.num_tris as usize);
        for i in 0..header.num_tris {
            let front = cursor.read_i32::<LittleEndian>()? != 0;
            let mut vertex = [0i32; 3];
            for corner in &mut vertex {
                *corner = cursor.read_i32::<LittleEndian>()?;
                if *corner < 0 || *corner as u32 >= header.num_xyz {
                    return Err(corrupt(format!(
                        "triangle {i} vertex index {corner} outside 0..{}",
                        header.num_xyz
                    )));
                }
            }
            faces.push(Face { front, vertex });
        }
        let tris = arena.view_mut::<Triangle>(header.ofs_tris as usize, header.num_tris as usize)?;
        for (out, face) in tris.iter_mut().zip(&faces) {
            let index = face.vertex.map(|v| v as u16);
            *out = Triangle { index_xyz: index, index_st: index };
        }

        fill_single_mesh(&mut arena, &header)?;
        let mut writer = CommandWriter::new(commands_mut(&mut arena, &header)?);
        for face in &faces {
            if !writer.begin_batch(3) {
                break;
            }
            for &index in &face.vertex {
                let tc = texcoords[index as usize];
                let (s, t) = seam_adjusted_st(
                    tc.s,
                    tc.t,
                    tc.onseam,
                    face.front,
                    header.skin_width,
                    header.skin_height,
                );
                writer.push_vertex(s, t, index);
            }
        }
        writer.finish();

        for index in 0..header.num_frames as usize {
            let frame_type = cursor.read_i32::<LittleEndian>()?;
            if frame_type != 0 {
                return Err(LoadError::UnsupportedVariant(format!("frame type {frame_type}")));
            }
            let mut bbox = [0u8; 2 * TRIVERTEX_SIZE];
            cursor.read_exact(&mut bbox)?;

            let mut frame = FrameHeader {
                scale: pin.scale,
                translate: pin.translate,
                ..FrameHeader::default()
            };
            cursor.read_exact(&mut frame.name)?;

            let mut verts = vec![0u8; header.num_xyz as usize * TRIVERTEX_SIZE];
            cursor.read_exact(&mut verts)?;
            let vertices = verts.chunks_exact(TRIVERTEX_SIZE).map(|v| TriVertex {
                v: [v[0], v[1], v[2]],
                light_normal: v[3],
            });
            write_frame(&mut arena, &header, index, &frame, vertices)?;
        }

        debug!(
            "{name}: mdl with {} skins of {}x{}, {} frames",
            header.num_skins, header.skin_width, header.skin_height, header.num_frames
        );
        Ok(LoadedModel::new(
            name,
            ModelFormat::Mdl,
            ModelKind::Alias,
            arena,
            limits.skin_slots(header.num_skins),
        ))
    }
}
