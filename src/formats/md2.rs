use super::common::{
    allocate, check_ident, check_version, commands_mut, fill_byte_frames, fill_single_mesh,
    fill_skin_names, fill_st, fill_triangles, header_words, table, tail,
};
use super::{ModelDecoder, ModelFormat, MD2_IDENT};
use crate::commands::copy_commands;
use crate::config::LoaderLimits;
use crate::error::{corrupt, truncated, Result};
use crate::layout::{AliasCounts, DeclaredCounts};
use crate::model::{LoadedModel, ModelKind};
use crate::model_types::{frame_size, MAX_SKINNAME};
use log::debug;

pub const MD2_VERSION: i32 = 8;
pub const MD2_HEADER_SIZE: usize = 68;
const MD2_TRIANGLE_SIZE: usize = 12;

/// `.md2` fixed-frame models.
pub struct Md2Decoder;

struct Md2Header {
    ident: i32,
    version: i32,
    skin_width: i32,
    skin_height: i32,
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

impl Md2Header {
    fn parse(data: &[u8]) -> Result<Self> {
        let w: [i32; MD2_HEADER_SIZE / 4] = header_words(data, "md2 header")?;
        Ok(Self {
            ident: w[0],
            version: w[1],
            skin_width: w[2],
            skin_height: w[3],
            frame_size: w[4],
            num_skins: w[5],
            num_xyz: w[6],
            num_st: w[7],
            num_tris: w[8],
            num_glcmds: w[9],
            num_frames: w[10],
            ofs_skins: w[11],
            ofs_st: w[12],
            ofs_tris: w[13],
            ofs_frames: w[14],
            ofs_glcmds: w[15],
            ofs_end: w[16],
        })
    }
}

impl ModelDecoder for Md2Decoder {
    fn format(&self) -> ModelFormat {
        ModelFormat::Md2
    }

    fn decode(&self, name: &str, data: &[u8], limits: &LoaderLimits) -> Result<LoadedModel> {
        let pin = Md2Header::parse(data)?;
        check_ident(pin.ident, MD2_IDENT)?;
        check_version(pin.version, MD2_VERSION)?;

        if pin.ofs_end < 0 || pin.ofs_end as usize > data.len() {
            return Err(truncated("md2 body", pin.ofs_end.max(0) as usize, data.len()));
        }
        if pin.num_skins < 0 {
            return Err(corrupt(format!("incorrect skins count {}", pin.num_skins)));
        }
        let expected_frame = 40 + 4 * i64::from(pin.num_xyz);
        if i64::from(pin.frame_size) != expected_frame {
            return Err(corrupt(format!(
                "incorrect framesize {} (should be {expected_frame})",
                pin.frame_size
            )));
        }

        let counts = AliasCounts::validate(
            &DeclaredCounts {
                skin_width: pin.skin_width,
                skin_height: pin.skin_height,
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
        let skins = table(body, pin.ofs_skins, counts.num_skins, MAX_SKINNAME, "md2 skins")?;
        let st = table(body, pin.ofs_st, counts.num_st, 4, "md2 st")?;
        let tris = table(body, pin.ofs_tris, counts.num_tris, MD2_TRIANGLE_SIZE, "md2 triangles")?;
        let stride = frame_size(counts.num_xyz as usize);
        let frames = table(body, pin.ofs_frames, counts.num_frames, stride, "md2 frames")?;
        table(body, pin.ofs_glcmds, counts.num_glcmds, 4, "md2 commands")?;
        let cmds = tail(body, pin.ofs_glcmds, "md2 commands")?;

        let (mut arena, header) = allocate(&counts)?;
        fill_single_mesh(&mut arena, &header)?;
        fill_skin_names(&mut arena, &header, skins)?;
        fill_st(&mut arena, &header, st)?;
        fill_triangles(&mut arena, &header, tris, MD2_TRIANGLE_SIZE, 0)?;
        fill_byte_frames(&mut arena, &header, frames, stride, [0.0; 3])?;
        copy_commands(name, cmds, commands_mut(&mut arena, &header)?, header.num_xyz)?;

        debug!(
            "{name}: md2 with {} verts, {} tris, {} frames",
            header.num_xyz, header.num_tris, header.num_frames
        );
        Ok(LoadedModel::new(
            name,
            ModelFormat::Md2,
            ModelKind::Alias,
            arena,
            limits.skin_slots(header.num_skins),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Md2Builder;
    use crate::LoadError;

    fn decode(data: &[u8]) -> Result<LoadedModel> {
        Md2Decoder.decode("models/test/tris.md2", data, &LoaderLimits::default())
    }

    #[test]
    fn small_model_gets_one_mesh_node_and_lattice_vertices() {
        let data = Md2Builder::quad().build();
        let model = decode(&data).unwrap();
        let alias = model.alias().unwrap();
        let header = alias.header();

        assert_eq!(header.num_xyz, 4);
        assert_eq!(header.num_tris, 2);
        assert_eq!(header.num_frames, 1);
        assert_eq!(header.num_skins, 0);
        assert_eq!(header.frame_size, 40 + 4 * 4);
        assert_eq!(
            alias.mesh_nodes().unwrap(),
            &[crate::model_types::MeshNode { start: 0, count: header.num_glcmds }]
        );

        let frame = alias.frame(0).unwrap();
        assert_eq!(frame.name(), "stand01");
        assert_eq!(frame.vertices.len(), 4);
        assert_eq!(frame.vertices[2].v, [255, 255, 0]);
        assert_eq!(frame.position(2).unwrap(), [255.0 * 0.5 - 10.0, 255.0 * 0.5 - 10.0, 0.0]);

        let tris = alias.triangles().unwrap();
        assert!(tris.iter().all(|t| t.index_xyz.iter().all(|&i| u32::from(i) < header.num_xyz)));
        assert!(tris.iter().all(|t| t.index_st.iter().all(|&i| u32::from(i) < header.num_st)));
        assert_eq!(model.skins().len(), 32);
    }

    #[test]
    fn decoding_twice_is_byte_identical() {
        let data = Md2Builder::quad().skins(&["models/test/skin.pcx"]).build();
        let first = decode(&data).unwrap();
        let second = decode(&data).unwrap();
        assert_eq!(first.arena().bytes(), second.arena().bytes());
        assert_eq!(first.alias().unwrap().skin_name(0).unwrap(), "models/test/skin.pcx");
    }

    #[test]
    fn skin_count_past_the_table_minimum_is_accepted() {
        let names: Vec<String> = (0..33).map(|i| format!("models/test/skin{i}.pcx")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let model = decode(&Md2Builder::quad().skins(&names).build()).unwrap();
        let alias = model.alias().unwrap();
        assert_eq!(alias.header().num_skins, 33);
        assert_eq!(alias.skin_name(32).unwrap(), "models/test/skin32.pcx");
        assert_eq!(model.skins().len(), 33);
    }

    #[test]
    fn commands_are_copied_and_terminated() {
        let data = Md2Builder::quad().build();
        let model = decode(&data).unwrap();
        let commands = model.alias().unwrap().commands().unwrap();
        assert_eq!(commands[0], -4);
        assert_eq!(*commands.last().unwrap(), 0);
    }

    #[test]
    fn altered_version_is_rejected() {
        let data = Md2Builder::quad().version(7).build();
        assert!(matches!(
            decode(&data),
            Err(LoadError::VersionMismatch { found: 7, expected: 8 })
        ));
    }

    #[test]
    fn header_problems_are_reported() {
        let short = Md2Builder::quad().build();
        assert!(matches!(
            decode(&short[..40]),
            Err(LoadError::TruncatedInput { .. })
        ));

        let bad_frame = Md2Builder::quad().frame_size(60).build();
        assert!(matches!(decode(&bad_frame), Err(LoadError::CorruptHeader(_))));

        let no_frames = Md2Builder::quad().frames(0).build();
        assert!(matches!(
            decode(&no_frames),
            Err(LoadError::LimitExceeded { what: "frame", .. })
        ));

        let mut cut = Md2Builder::quad().build();
        cut.truncate(cut.len() - 8);
        assert!(matches!(decode(&cut), Err(LoadError::TruncatedInput { .. })));
    }

    #[test]
    fn out_of_range_triangle_index_is_corrupt() {
        let data = Md2Builder::quad().triangle(1, [0, 1, 9], [0, 1, 2]).build();
        assert!(matches!(decode(&data), Err(LoadError::CorruptHeader(_))));
    }
}
