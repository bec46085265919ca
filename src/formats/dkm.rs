use super::common::{
    allocate, check_ident, commands_mut, fill_byte_frames, fill_single_mesh, fill_skin_names,
    fill_st, fill_triangles, header_words, read_frame_header, table, tail, word_f32, write_frame,
};
use super::{ModelDecoder, ModelFormat, DKM_IDENT};
use crate::arena::Arena;
use crate::commands::remap_packed_commands;
use crate::config::LoaderLimits;
use crate::endian::{read_le_u32, region};
use crate::error::{corrupt, truncated, LoadError, Result};
use crate::layout::{AliasCounts, DeclaredCounts};
use crate::model::{LoadedModel, ModelKind};
use crate::model_types::{ModelHeader, FRAME_HEADER_SIZE, MAX_SKINNAME, TRIVERTEX_SIZE};
use crate::requant::{packed_scale, packed_to_lattice};
use log::debug;

pub const DKM1_VERSION: i32 = 1;
pub const DKM2_VERSION: i32 = 2;
pub const DKM_HEADER_SIZE: usize = 80;
pub const DKM_SKIN_SIZE: i32 = 256;

const DKM_TRIANGLE_SIZE: usize = 16;
const PACKED_VERTEX_SIZE: usize = 5;

/// `.dkm` models, sub-versions 1 (byte vertices) and 2 (packed 32-bit positions).
pub struct DkmDecoder;

struct DkmHeader {
    ident: i32,
    version: i32,
    translate: [f32; 3],
    frame_size: i32,
    num_skins: i32,
    num_xyz: i32,
    num_st: i32,
    num_tris: i32,
    num_glcmds: i32,
    num_frames: i32,
    ofs_skins: i32,
    ofs_st: i32,
    ofs_tris: i32,
    ofs_frames: i32,
    ofs_glcmds: i32,
    ofs_end: i32,
}

impl DkmHeader {
    fn parse(data: &[u8]) -> Result<Self> {
        let w: [i32; DKM_HEADER_SIZE / 4] = header_words(data, "dkm header")?;
        // w[12] and w[18] hold the surface count and offset, unused here
        Ok(Self {
            ident: w[0],
            version: w[1],
            translate: [word_f32(w[2]), word_f32(w[3]), word_f32(w[4])],
            frame_size: w[5],
            num_skins: w[6],
            num_xyz: w[7],
            num_st: w[8],
            num_tris: w[9],
            num_glcmds: w[10],
            num_frames: w[11],
            ofs_skins: w[13],
            ofs_st: w[14],
            ofs_tris: w[15],
            ofs_frames: w[16],
            ofs_glcmds: w[17],
            ofs_end: w[19],
        })
    }

    fn vertex_size(&self) -> usize {
        if self.version == DKM2_VERSION {
            PACKED_VERTEX_SIZE
        } else {
            TRIVERTEX_SIZE
        }
    }
}

/// Re-quantizes packed frames onto the byte lattice.
fn fill_packed_frames(
    arena: &mut Arena,
    header: &ModelHeader,
    src: &[u8],
    frame_stride: usize,
    translate: [f32; 3],
) -> Result<()> {
    let num_xyz = header.num_xyz as usize;
    for index in 0..header.num_frames as usize {
        let raw = region(src, index * frame_stride, frame_stride, "frame")?;
        let mut frame = read_frame_header(raw, translate)?;
        frame.scale = packed_scale(frame.scale);
        let verts = region(raw, FRAME_HEADER_SIZE, num_xyz * PACKED_VERTEX_SIZE, "frame vertices")?;
        let vertices = verts.chunks_exact(PACKED_VERTEX_SIZE).map(|v| {
            packed_to_lattice(read_le_u32([v[0], v[1], v[2], v[3]]), v[4])
        });
        write_frame(arena, header, index, &frame, vertices)?;
    }
    Ok(())
}

impl ModelDecoder for DkmDecoder {
    fn format(&self) -> ModelFormat {
        ModelFormat::Dkm
    }

    fn decode(&self, name: &str, data: &[u8], limits: &LoaderLimits) -> Result<LoadedModel> {
        let pin = DkmHeader::parse(data)?;
        check_ident(pin.ident, DKM_IDENT)?;
        if pin.version != DKM1_VERSION && pin.version != DKM2_VERSION {
            return Err(LoadError::VersionMismatch { found: pin.version, expected: DKM2_VERSION });
        }
        if pin.ofs_end < 0 || pin.ofs_end as usize > data.len() {
            return Err(truncated("dkm body", pin.ofs_end.max(0) as usize, data.len()));
        }

        let minimum_frame = 40 + pin.vertex_size() as i64 * i64::from(pin.num_xyz);
        if i64::from(pin.frame_size) < minimum_frame {
            return Err(corrupt(format!(
                "incorrect framesize {} (at least {minimum_frame})",
                pin.frame_size
            )));
        }

        let counts = AliasCounts::validate(
            &DeclaredCounts {
                skin_width: DKM_SKIN_SIZE,
                skin_height: DKM_SKIN_SIZE,
                num_meshes: 1,
                num_skins: pin.num_skins,
                num_xyz: pin.num_xyz,
                num_st: pin.num_st,
                num_tris: pin.num_tris,
                num_glcmds: pin.num_glcmds,
                num_frames: pin.num_frames,
            },
            limits,
        )?;

        let body = &data[..pin.ofs_end as usize];
        let stride = pin.frame_size as usize;
        let skins = table(body, pin.ofs_skins, counts.num_skins, MAX_SKINNAME, "dkm skins")?;
        let st = table(body, pin.ofs_st, counts.num_st, 4, "dkm st")?;
        let tris = table(body, pin.ofs_tris, counts.num_tris, DKM_TRIANGLE_SIZE, "dkm triangles")?;
        let frames = table(body, pin.ofs_frames, counts.num_frames, stride, "dkm frames")?;
        let cmds = tail(body, pin.ofs_glcmds, "dkm commands")?;

        let (mut arena, header) = allocate(&counts)?;
        fill_single_mesh(&mut arena, &header)?;
        fill_skin_names(&mut arena, &header, skins)?;
        fill_st(&mut arena, &header, st)?;
        remap_packed_commands(name, cmds, commands_mut(&mut arena, &header)?, header.num_xyz)?;
        if pin.version == DKM1_VERSION {
            fill_byte_frames(&mut arena, &header, frames, stride, pin.translate)?;
        } else {
            fill_packed_frames(&mut arena, &header, frames, stride, pin.translate)?;
        }
        fill_triangles(&mut arena, &header, tris, DKM_TRIANGLE_SIZE, 4)?;

        debug!(
            "{name}: dkm v{} with {} verts, {} frames",
            pin.version, header.num_xyz, header.num_frames
        );
        Ok(LoadedModel::new(
            name,
            ModelFormat::Dkm,
            ModelKind::Alias,
            arena,
            limits.skin_slots(header.num_skins),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{BatchKind, CommandBatches};
    use crate::fixtures::DkmBuilder;

    fn decode(data: &[u8]) -> Result<LoadedModel> {
        DkmDecoder.decode("models/dk/tris.dkm", data, &LoaderLimits::default())
    }

    #[test]
    fn v1_frames_keep_bytes_and_add_header_translate() {
        let data = DkmBuilder::new(1).build();
        let model = decode(&data).unwrap();
        let alias = model.alias().unwrap();
        assert_eq!(alias.header().skin_width, 256);
        assert_eq!(alias.header().skin_height, 256);

        let frame = alias.frame(0).unwrap();
        assert_eq!(frame.header.translate, [1.0 + 100.0, 2.0 + 200.0, 3.0 + 300.0]);
        assert_eq!(frame.header.scale, [1.0, 1.0, 1.0]);
        assert_eq!(frame.vertices[2].v, [20, 40, 60]);
    }

    #[test]
    fn v2_frames_are_requantized() {
        let data = DkmBuilder::new(2).build();
        let model = decode(&data).unwrap();
        let frame = model.alias().unwrap().frame(0).unwrap();
        assert_eq!(frame.header.translate, [101.0, 202.0, 303.0]);
        assert!((frame.header.scale[0] - 0x7FF as f32 / 255.0).abs() < 1e-4);
        assert!((frame.header.scale[1] - 0x3FF as f32 / 255.0).abs() < 1e-4);
        assert_eq!(frame.vertices[1].v, [255, 255, 255]);
        assert_eq!(frame.vertices[0].v, [0, 0, 0]);
        assert_eq!(frame.vertices[1].light_normal, 5);
    }

    #[test]
    fn command_triples_are_permuted() {
        let data = DkmBuilder::new(1).build();
        let model = decode(&data).unwrap();
        let commands = model.alias().unwrap().commands().unwrap();
        let batch = CommandBatches::new(commands).next().unwrap();
        assert_eq!(batch.kind, BatchKind::Strip);
        let vertices: Vec<_> = batch.vertices().collect();
        assert_eq!(vertices[0].index, 2);
        assert_eq!(vertices[0].s, 0.25);
        assert_eq!(vertices[0].t, 0.75);
        assert_eq!(*commands.last().unwrap(), 0);
    }

    #[test]
    fn undersized_command_count_truncates_the_stream() {
        let data = DkmBuilder::new(1).num_glcmds(12).build();
        let model = decode(&data).unwrap();
        let commands = model.alias().unwrap().commands().unwrap();
        assert_eq!(commands.len(), 12);
        assert_eq!(commands[0], 3);
        assert_eq!(CommandBatches::new(commands).count(), 1);
        assert!(commands[10..].iter().all(|&w| w == 0));
    }

    #[test]
    fn ident_version_and_framesize_are_checked() {
        let data = DkmBuilder::new(3).build();
        assert!(matches!(decode(&data), Err(LoadError::VersionMismatch { found: 3, .. })));

        let data = DkmBuilder::new(2).frame_size(40 + 4 * 3).build();
        assert!(matches!(decode(&data), Err(LoadError::CorruptHeader(_))));

        let mut data = DkmBuilder::new(1).build();
        data[0] = b'X';
        assert!(matches!(decode(&data), Err(LoadError::BadIdent { .. })));
    }

    #[test]
    fn declared_end_past_the_buffer_is_truncation() {
        let data = DkmBuilder::new(1).build();
        assert!(matches!(
            decode(&data[..data.len() - 4]),
            Err(LoadError::TruncatedInput { what: "dkm body", .. })
        ));
    }

    #[test]
    fn out_of_range_triangle_index_is_corrupt() {
        let data = DkmBuilder::new(1).triangle([0, 1, 3], [2, 1, 0]).build();
        assert!(matches!(decode(&data), Err(LoadError::CorruptHeader(_))));

        let data = DkmBuilder::new(2).triangle([0, 1, 2], [0, 1, -1]).build();
        assert!(matches!(decode(&data), Err(LoadError::CorruptHeader(_))));
    }

    #[test]
    fn v2_framesize_of_exactly_five_bytes_per_vertex_is_accepted() {
        let data = DkmBuilder::new(2).frame_size(40 + 5 * 3).build();
        let model = decode(&data).unwrap();
        let header = model.alias().unwrap().header();
        assert_eq!(header.frame_size, 40 + 4 * 3);

        let data = DkmBuilder::new(2).frame_size(40 + 5 * 3 - 1).build();
        assert!(matches!(decode(&data), Err(LoadError::CorruptHeader(_))));
    }

    #[test]
    fn triangle_prefix_is_skipped() {
        let data = DkmBuilder::new(1).build();
        let model = decode(&data).unwrap();
        let tris = model.alias().unwrap().triangles().unwrap();
        assert_eq!(tris[0].index_xyz, [0, 1, 2]);
        assert_eq!(tris[0].index_st, [2, 1, 0]);
    }
}
