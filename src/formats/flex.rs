//! Chunked `.fm` models.
//!
//! A file is a sequence of `{name[32], version, size}` chunk headers each
//! followed by `size` bytes. The `header` chunk comes first and fixes every
//! count; the arena is committed right after it and later chunks fill their
//! regions in whatever order they appear.

use super::common::{
    allocate, commands_mut, fill_byte_frames, fill_single_mesh, fill_skin_names, fill_st,
    fill_triangles,
};
use super::{ModelDecoder, ModelFormat};
use crate::arena::Arena;
use crate::commands::copy_commands;
use crate::config::LoaderLimits;
use crate::endian::{decode_name, read_le_i32, read_le_u16, region};
use crate::error::{corrupt, truncated, LoadError, Result};
use crate::layout::{AliasCounts, DeclaredCounts};
use crate::model::{LoadedModel, ModelKind};
use crate::model_types::{MeshNode, ModelHeader, MAX_SKINNAME};
use log::{debug, warn};

pub const CHUNK_NAME_LEN: usize = 32;
pub const CHUNK_HEADER_SIZE: usize = CHUNK_NAME_LEN + 8;
pub const FM_HEADER_SIZE: usize = 40;
const MESH_NODE_SIZE: usize = 516;
const MESH_NODE_OPAQUE: usize = 512;

const SKIPPED_CHUNKS: [&str; 5] =
    ["normals", "short frames", "comp data", "skeleton", "references"];

/// Data chunks that fill a region, in the order they are reported when missing.
const DATA_CHUNKS: [&str; 6] = ["skin", "st coord", "tris", "frames", "glcmds", "mesh nodes"];

pub struct FlexDecoder;

struct Chunk<'a> {
    name: String,
    version: i32,
    data: &'a [u8],
}

impl Chunk<'_> {
    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    fn expect_version(&self, expected: i32) -> Result<()> {
        if self.version != expected {
            return Err(LoadError::InvalidVersion {
                chunk: self.name.clone(),
                found: self.version,
                expected,
            });
        }
        Ok(())
    }

    fn expect_size(&self, expected: usize) -> Result<()> {
        if self.data.len() != expected {
            return Err(LoadError::InvalidSize {
                chunk: self.name.clone(),
                found: self.data.len(),
                expected,
            });
        }
        Ok(())
    }
}

fn next_chunk<'a>(data: &'a [u8], pos: usize) -> Result<Chunk<'a>> {
    let head = region(data, pos, CHUNK_HEADER_SIZE, "chunk header")?;
    let word = |at: usize| read_le_i32([head[at], head[at + 1], head[at + 2], head[at + 3]]);
    let version = word(CHUNK_NAME_LEN);
    let size = word(CHUNK_NAME_LEN + 4);
    let start = pos + CHUNK_HEADER_SIZE;
    let len = usize::try_from(size).map_err(|_| truncated("chunk", 0, data.len()))?;
    Ok(Chunk {
        name: decode_name(&head[..CHUNK_NAME_LEN]),
        version,
        data: region(data, start, len, "chunk")?,
    })
}

/// State committed once the header chunk has been read.
struct FlexModel {
    arena: Arena,
    header: ModelHeader,
    frame_stride: usize,
    declared_nodes: u32,
    seen: Vec<&'static str>,
}

fn read_header(chunk: &Chunk<'_>, remaining: usize, limits: &LoaderLimits) -> Result<FlexModel> {
    chunk.expect_version(2)?;
    if chunk.data.len() < FM_HEADER_SIZE {
        return Err(LoadError::InvalidSize {
            chunk: chunk.name.clone(),
            found: chunk.data.len(),
            expected: FM_HEADER_SIZE,
        });
    }
    let w: Vec<i32> = chunk.data[..FM_HEADER_SIZE]
        .chunks_exact(4)
        .map(|b| read_le_i32([b[0], b[1], b[2], b[3]]))
        .collect();
    let (frame_size, num_xyz, num_mesh_nodes) = (w[2], w[4], w[9]);

    let minimum_frame = 40 + 4 * i64::from(num_xyz);
    if i64::from(frame_size) < minimum_frame {
        return Err(corrupt(format!(
            "incorrect framesize {frame_size} (at least {minimum_frame})"
        )));
    }

    let counts = AliasCounts::validate(
        &DeclaredCounts {
            skin_width: w[0],
            skin_height: w[1],
            num_meshes: num_mesh_nodes.max(1),
            num_skins: w[3],
            num_xyz,
            num_st: w[5],
            num_tris: w[6],
            num_glcmds: w[7],
            num_frames: w[8],
        },
        limits,
    )?;

    let frame_stride = frame_size as usize;
    let regions: [(&'static str, u32, usize); 6] = [
        ("skin", counts.num_skins, MAX_SKINNAME),
        ("st coord", counts.num_st, 4),
        ("tris", counts.num_tris, 12),
        ("frames", counts.num_frames, frame_stride),
        ("glcmds", counts.num_glcmds, 4),
        ("mesh nodes", num_mesh_nodes.max(0) as u32, MESH_NODE_SIZE),
    ];
    for (what, count, record) in regions {
        match (count as usize).checked_mul(record) {
            Some(needed) if needed <= remaining => {}
            _ => return Err(truncated(what, (count as usize).saturating_mul(record), remaining)),
        }
    }

    let (mut arena, header) = allocate(&counts)?;
    let declared_nodes = num_mesh_nodes.max(0) as u32;
    if declared_nodes == 0 {
        fill_single_mesh(&mut arena, &header)?;
    }
    Ok(FlexModel {
        arena,
        header,
        frame_stride,
        declared_nodes,
        seen: Vec::new(),
    })
}

impl FlexModel {
    fn fill(&mut self, name: &str, chunk: &Chunk<'_>) -> Result<()> {
        let header = self.header;
        let arena = &mut self.arena;
        let kind = DATA_CHUNKS.into_iter().find(|known| chunk.is(known));

        match kind {
            Some("skin") => {
                chunk.expect_version(1)?;
                chunk.expect_size(header.num_skins as usize * MAX_SKINNAME)?;
                fill_skin_names(arena, &header, chunk.data)?;
            }
            Some("st coord") => {
                chunk.expect_version(1)?;
                chunk.expect_size(header.num_st as usize * 4)?;
                fill_st(arena, &header, chunk.data)?;
            }
            Some("tris") => {
                chunk.expect_version(1)?;
                chunk.expect_size(header.num_tris as usize * 12)?;
                fill_triangles(arena, &header, chunk.data, 12, 0)?;
            }
            Some("frames") => {
                chunk.expect_version(1)?;
                let needed = header.num_frames as usize * self.frame_stride;
                if chunk.data.len() < needed {
                    return Err(LoadError::InvalidSize {
                        chunk: chunk.name.clone(),
                        found: chunk.data.len(),
                        expected: needed,
                    });
                }
                fill_byte_frames(arena, &header, chunk.data, self.frame_stride, [0.0; 3])?;
            }
            Some("glcmds") => {
                chunk.expect_version(1)?;
                chunk.expect_size(header.num_glcmds as usize * 4)?;
                copy_commands(name, chunk.data, commands_mut(arena, &header)?, header.num_xyz)?;
            }
            Some("mesh nodes") => {
                chunk.expect_version(3)?;
                chunk.expect_size(self.declared_nodes as usize * MESH_NODE_SIZE)?;
                if self.declared_nodes > 0 {
                    let (ofs, count) = (header.ofs_meshes as usize, header.num_meshes as usize);
                    let nodes = arena.view_mut::<MeshNode>(ofs, count)?;
                    for (i, (node, raw)) in nodes
                        .iter_mut()
                        .zip(chunk.data.chunks_exact(MESH_NODE_SIZE))
                        .enumerate()
                    {
                        let tail = &raw[MESH_NODE_OPAQUE..];
                        let start = u32::from(read_le_u16([tail[0], tail[1]]));
                        let count = u32::from(read_le_u16([tail[2], tail[3]]));
                        if start + count > header.num_glcmds {
                            return Err(corrupt(format!(
                                "mesh node {i} covers {start}+{count} of {} commands",
                                header.num_glcmds
                            )));
                        }
                        *node = MeshNode { start, count };
                    }
                }
            }
            _ => {
                if SKIPPED_CHUNKS.iter().any(|skip| chunk.is(skip)) {
                    return Ok(());
                }
                return Err(LoadError::UnknownChunk(chunk.name.clone()));
            }
        }

        if let Some(kind) = kind {
            self.seen.push(kind);
        }
        Ok(())
    }
}

impl ModelDecoder for FlexDecoder {
    fn format(&self) -> ModelFormat {
        ModelFormat::Flex
    }

    fn decode(&self, name: &str, data: &[u8], limits: &LoaderLimits) -> Result<LoadedModel> {
        let mut model: Option<FlexModel> = None;
        let mut pos = 0;

        while pos < data.len() {
            let chunk = next_chunk(data, pos)?;
            pos += CHUNK_HEADER_SIZE + chunk.data.len();

            if chunk.is("header") {
                if model.is_some() {
                    return Err(corrupt("second header chunk"));
                }
                model = Some(read_header(&chunk, data.len() - pos, limits)?);
                continue;
            }
            match model.as_mut() {
                Some(model) => model.fill(name, &chunk)?,
                None => return Err(LoadError::MissingHeader(chunk.name)),
            }
        }

        let model = model.ok_or_else(|| truncated("chunk header", CHUNK_HEADER_SIZE, data.len()))?;
        for kind in DATA_CHUNKS {
            let optional = kind == "mesh nodes" && model.declared_nodes == 0;
            if !optional && !model.seen.contains(&kind) {
                warn!("{name}: no {kind} chunk, region left empty");
            }
        }

        debug!(
            "{name}: fm with {} mesh nodes, {} verts, {} frames",
            model.header.num_meshes, model.header.num_xyz, model.header.num_frames
        );
        Ok(LoadedModel::new(
            name,
            ModelFormat::Flex,
            ModelKind::Alias,
            model.arena,
            limits.skin_slots(model.header.num_skins),
        ))
    }
}
