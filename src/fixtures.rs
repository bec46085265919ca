//! Writers for small, valid model files used by the tests.

use crate::endian::encode_name;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

fn put_i32s(writer: &mut Vec<u8>, words: &[i32]) {
    for &word in words {
        writer.write_i32::<LittleEndian>(word).unwrap();
    }
}

fn put_f32s(writer: &mut Vec<u8>, values: &[f32]) {
    for &value in values {
        writer.write_f32::<LittleEndian>(value).unwrap();
    }
}

fn put_name<const N: usize>(writer: &mut Vec<u8>, name: &str) {
    let field: [u8; N] = encode_name(name);
    writer.write_all(&field).unwrap();
}

fn put_triple(writer: &mut Vec<u8>, s: f32, t: f32, index: i32) {
    put_f32s(writer, &[s, t]);
    put_i32s(writer, &[index]);
}

/// A unit quad in one frame, drawn as a single fan.
pub struct Md2Builder {
    version: i32,
    frame_size: Option<i32>,
    num_frames: i32,
    skins: Vec<String>,
    triangles: Vec<([i16; 3], [i16; 3])>,
}

impl Md2Builder {
    pub fn quad() -> Self {
        Self {
            version: 8,
            frame_size: None,
            num_frames: 1,
            skins: Vec::new(),
            triangles: vec![([0, 1, 2], [0, 1, 2]), ([0, 2, 3], [0, 2, 3])],
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn frame_size(mut self, frame_size: i32) -> Self {
        self.frame_size = Some(frame_size);
        self
    }

    pub fn frames(mut self, num_frames: i32) -> Self {
        self.num_frames = num_frames;
        self
    }

    pub fn skins(mut self, names: &[&str]) -> Self {
        self.skins = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn triangle(mut self, index: usize, xyz: [i16; 3], st: [i16; 3]) -> Self {
        self.triangles[index] = (xyz, st);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        const NUM_XYZ: i32 = 4;
        const NUM_GLCMDS: i32 = 14;
        let frame_size = 40 + 4 * NUM_XYZ;
        let frames_written = self.num_frames.max(0);

        let ofs_skins = 68;
        let ofs_st = ofs_skins + 64 * self.skins.len() as i32;
        let ofs_tris = ofs_st + 4 * NUM_XYZ;
        let ofs_frames = ofs_tris + 12 * self.triangles.len() as i32;
        let ofs_glcmds = ofs_frames + frame_size * frames_written;
        let ofs_end = ofs_glcmds + 4 * NUM_GLCMDS;

        let mut writer = Vec::new();
        writer.write_all(b"IDP2").unwrap();
        put_i32s(
            &mut writer,
            &[
                self.version,
                64,
                64,
                self.frame_size.unwrap_or(frame_size),
                self.skins.len() as i32,
                NUM_XYZ,
                NUM_XYZ,
                self.triangles.len() as i32,
                NUM_GLCMDS,
                self.num_frames,
                ofs_skins,
                ofs_st,
                ofs_tris,
                ofs_frames,
                ofs_glcmds,
                ofs_end,
            ],
        );

        for skin in &self.skins {
            put_name::<64>(&mut writer, skin);
        }
        for (s, t) in [(0i16, 0i16), (63, 0), (63, 63), (0, 63)] {
            writer.write_i16::<LittleEndian>(s).unwrap();
            writer.write_i16::<LittleEndian>(t).unwrap();
        }
        for (xyz, st) in &self.triangles {
            for &i in xyz.iter().chain(st) {
                writer.write_i16::<LittleEndian>(i).unwrap();
            }
        }
        for _ in 0..frames_written {
            put_f32s(&mut writer, &[0.5, 0.5, 1.0, -10.0, -10.0, 0.0]);
            put_name::<16>(&mut writer, "stand01");
            for v in [[0u8, 0, 0], [255, 0, 0], [255, 255, 0], [0, 255, 0]] {
                writer.write_all(&v).unwrap();
                writer.write_u8(0).unwrap();
            }
        }

        put_i32s(&mut writer, &[-4]);
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        for (i, (s, t)) in corners.into_iter().enumerate() {
            put_triple(&mut writer, s, t, i as i32);
        }
        put_i32s(&mut writer, &[0]);

        assert_eq!(writer.len(), ofs_end as usize);
        writer
    }
}

/// One triangle with 8x4 skins; skin `i` is filled with `i + 1`.
pub struct MdlBuilder {
    version: i32,
    skin_size: (i32, i32),
    num_skins: i32,
    skin_type: i32,
    frame_type: i32,
    back_facing_seam: bool,
    texcoords: [(i32, i32); 3],
}

impl MdlBuilder {
    pub fn triangle() -> Self {
        Self {
            version: 6,
            skin_size: (8, 4),
            num_skins: 1,
            skin_type: 0,
            frame_type: 0,
            back_facing_seam: false,
            texcoords: [(0, 0), (7, 0), (0, 3)],
        }
    }

    pub fn texcoord(mut self, index: usize, s: i32, t: i32) -> Self {
        self.texcoords[index] = (s, t);
        self
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn skins(mut self, count: i32) -> Self {
        self.num_skins = count;
        self
    }

    pub fn skin_size(mut self, width: i32, height: i32) -> Self {
        self.skin_size = (width, height);
        self
    }

    pub fn skin_type(mut self, skin_type: i32) -> Self {
        self.skin_type = skin_type;
        self
    }

    pub fn frame_type(mut self, frame_type: i32) -> Self {
        self.frame_type = frame_type;
        self
    }

    pub fn back_facing_seam(mut self) -> Self {
        self.back_facing_seam = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let (width, height) = self.skin_size;
        let mut writer = Vec::new();
        writer.write_all(b"IDPO").unwrap();
        put_i32s(&mut writer, &[self.version]);
        put_f32s(&mut writer, &[1.0, 2.0, 0.5, -4.0, 0.0, 8.0, 30.0, 0.0, 0.0, 22.0]);
        put_i32s(&mut writer, &[self.num_skins, width, height, 3, 1, 1, 0, 0]);
        put_f32s(&mut writer, &[24.0]);

        for i in 0..self.num_skins {
            put_i32s(&mut writer, &[self.skin_type]);
            writer.extend(std::iter::repeat_n(i as u8 + 1, (width * height) as usize));
        }

        for (i, &(s, t)) in self.texcoords.iter().enumerate() {
            let onseam = i == 0 && self.back_facing_seam;
            put_i32s(&mut writer, &[i32::from(onseam), s, t]);
        }
        put_i32s(&mut writer, &[i32::from(!self.back_facing_seam), 0, 1, 2]);

        put_i32s(&mut writer, &[self.frame_type]);
        writer.write_all(&[0, 0, 0, 0, 30, 30, 30, 0]).unwrap();
        put_name::<16>(&mut writer, "frame1");
        for v in [[0u8, 0, 0, 1], [10, 20, 30, 2], [30, 0, 0, 3]] {
            writer.write_all(&v).unwrap();
        }
        writer
    }
}

/// Three vertices, one triangle, two command batches and one frame.
pub struct DkmBuilder {
    version: i32,
    frame_size: Option<i32>,
    num_glcmds: i32,
    triangle: ([i16; 3], [i16; 3]),
}

impl DkmBuilder {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            frame_size: None,
            num_glcmds: 21,
            triangle: ([0, 1, 2], [2, 1, 0]),
        }
    }

    pub fn triangle(mut self, xyz: [i16; 3], st: [i16; 3]) -> Self {
        self.triangle = (xyz, st);
        self
    }

    pub fn frame_size(mut self, frame_size: i32) -> Self {
        self.frame_size = Some(frame_size);
        self
    }

    pub fn num_glcmds(mut self, num_glcmds: i32) -> Self {
        self.num_glcmds = num_glcmds;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        const NUM_XYZ: i32 = 3;
        let vertex_size = if self.version == 2 { 5 } else { 4 };
        let frame_size = 40 + vertex_size * NUM_XYZ;

        let mut cmds = Vec::new();
        put_i32s(&mut cmds, &[3, 0, 0]);
        for (index, s, t) in [(2, 0.25f32, 0.75f32), (0, 0.0, 0.0), (1, 1.0, 0.0)] {
            put_i32s(&mut cmds, &[index]);
            put_f32s(&mut cmds, &[s, t]);
        }
        put_i32s(&mut cmds, &[-3, 1, 0]);
        for (index, s, t) in [(0, 0.0f32, 0.0f32), (1, 1.0, 0.0), (2, 0.5, 1.0)] {
            put_i32s(&mut cmds, &[index]);
            put_f32s(&mut cmds, &[s, t]);
        }
        put_i32s(&mut cmds, &[0]);

        let ofs_skins = 80;
        let ofs_st = ofs_skins + 64;
        let ofs_tris = ofs_st + 4 * NUM_XYZ;
        let ofs_frames = ofs_tris + 16;
        let ofs_glcmds = ofs_frames + frame_size;
        let ofs_end = ofs_glcmds + cmds.len() as i32;

        let mut writer = Vec::new();
        writer.write_all(b"DKMD").unwrap();
        put_i32s(&mut writer, &[self.version]);
        put_f32s(&mut writer, &[100.0, 200.0, 300.0]);
        put_i32s(
            &mut writer,
            &[
                self.frame_size.unwrap_or(frame_size),
                1,
                NUM_XYZ,
                NUM_XYZ,
                1,
                self.num_glcmds,
                1,
                0,
                ofs_skins,
                ofs_st,
                ofs_tris,
                ofs_frames,
                ofs_glcmds,
                0,
                ofs_end,
            ],
        );

        put_name::<64>(&mut writer, "models/dk/skin.wal");
        for (s, t) in [(0i16, 0i16), (255, 0), (0, 255)] {
            writer.write_i16::<LittleEndian>(s).unwrap();
            writer.write_i16::<LittleEndian>(t).unwrap();
        }
        let (xyz, st) = self.triangle;
        for i in [7i16, 9].iter().chain(&xyz).chain(&st) {
            writer.write_i16::<LittleEndian>(*i).unwrap();
        }

        put_f32s(&mut writer, &[1.0, 1.0, 1.0, 1.0, 2.0, 3.0]);
        put_name::<16>(&mut writer, "run1");
        if self.version == 2 {
            for (word, normal) in [(0u32, 0u8), (u32::MAX, 5), (0x0010_0801, 9)] {
                writer.write_u32::<LittleEndian>(word).unwrap();
                writer.write_u8(normal).unwrap();
            }
        } else {
            for v in [[0u8, 0, 0, 0], [10, 10, 10, 1], [20, 40, 60, 2]] {
                writer.write_all(&v).unwrap();
            }
        }

        writer.extend_from_slice(&cmds);
        assert_eq!(writer.len(), ofs_end as usize);
        writer
    }
}

/// Chunked model with one triangle, one frame, two command batches split
/// across two mesh nodes.
pub struct FlexBuilder {
    upper_case: bool,
    skin_first: bool,
    header_twice: bool,
    mesh_nodes: bool,
    num_frames: i32,
    nodes: [(u16, u16); 2],
    extra: Vec<(String, i32, Vec<u8>)>,
}

impl FlexBuilder {
    pub fn standard() -> Self {
        Self {
            upper_case: false,
            skin_first: false,
            header_twice: false,
            mesh_nodes: true,
            num_frames: 1,
            nodes: [(0, 11), (11, 10)],
            extra: Vec::new(),
        }
    }

    pub fn upper_case(mut self) -> Self {
        self.upper_case = true;
        self
    }

    pub fn skin_first(mut self) -> Self {
        self.skin_first = true;
        self
    }

    pub fn header_twice(mut self) -> Self {
        self.header_twice = true;
        self
    }

    pub fn without_mesh_nodes(mut self) -> Self {
        self.mesh_nodes = false;
        self
    }

    pub fn frames(mut self, num_frames: i32) -> Self {
        self.num_frames = num_frames;
        self
    }

    pub fn mesh_node(mut self, index: usize, start: u16, count: u16) -> Self {
        self.nodes[index] = (start, count);
        self
    }

    pub fn with_chunk(mut self, name: &str, version: i32, data: &[u8]) -> Self {
        self.extra.push((name.to_string(), version, data.to_vec()));
        self
    }

    fn chunk(&self, writer: &mut Vec<u8>, name: &str, version: i32, data: &[u8]) {
        let name = if self.upper_case { name.to_ascii_uppercase() } else { name.to_string() };
        put_name::<32>(writer, &name);
        put_i32s(writer, &[version, data.len() as i32]);
        writer.write_all(data).unwrap();
    }

    pub fn build(&self) -> Vec<u8> {
        const NUM_XYZ: i32 = 3;
        let mut header = Vec::new();
        let nodes = if self.mesh_nodes { 2 } else { 0 };
        put_i32s(
            &mut header,
            &[64, 64, 40 + 4 * NUM_XYZ, 1, NUM_XYZ, NUM_XYZ, 1, 21, self.num_frames, nodes],
        );

        let mut skin = Vec::new();
        put_name::<64>(&mut skin, "models/fm/skin.m8");

        let mut st = Vec::new();
        for v in [0i16, 0, 63, 0, 0, 63] {
            st.write_i16::<LittleEndian>(v).unwrap();
        }

        let mut tris = Vec::new();
        for v in [0i16, 1, 2, 0, 1, 2] {
            tris.write_i16::<LittleEndian>(v).unwrap();
        }

        let mut frames = Vec::new();
        put_f32s(&mut frames, &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        put_name::<16>(&mut frames, "idle1");
        frames.write_all(&[0, 0, 0, 0, 64, 0, 0, 0, 0, 64, 0, 0]).unwrap();

        let mut glcmds = Vec::new();
        put_i32s(&mut glcmds, &[3]);
        for (s, t, i) in [(0.0, 0.0, 0), (1.0, 0.0, 1), (0.0, 1.0, 2)] {
            put_triple(&mut glcmds, s, t, i);
        }
        put_i32s(&mut glcmds, &[-3]);
        for (s, t, i) in [(0.0, 0.0, 2), (1.0, 0.0, 1), (0.0, 1.0, 0)] {
            put_triple(&mut glcmds, s, t, i);
        }
        put_i32s(&mut glcmds, &[0]);

        let mut mesh = Vec::new();
        for (start, count) in self.nodes {
            mesh.extend(std::iter::repeat_n(0u8, 512));
            mesh.write_u16::<LittleEndian>(start).unwrap();
            mesh.write_u16::<LittleEndian>(count).unwrap();
        }

        let mut writer = Vec::new();
        if self.skin_first {
            self.chunk(&mut writer, "skin", 1, &skin);
        }
        self.chunk(&mut writer, "header", 2, &header);
        if !self.skin_first {
            self.chunk(&mut writer, "skin", 1, &skin);
        }
        self.chunk(&mut writer, "st coord", 1, &st);
        self.chunk(&mut writer, "tris", 1, &tris);
        self.chunk(&mut writer, "frames", 1, &frames);
        self.chunk(&mut writer, "glcmds", 1, &glcmds);
        if self.mesh_nodes {
            self.chunk(&mut writer, "mesh nodes", 3, &mesh);
        }
        if self.header_twice {
            self.chunk(&mut writer, "header", 2, &header);
        }
        for (name, version, data) in &self.extra {
            self.chunk(&mut writer, name, *version, data);
        }
        writer
    }
}

/// Sprite whose frames are 32x32 with the origin at the centre.
pub fn sp2(names: &[&str]) -> Vec<u8> {
    let mut writer = Vec::new();
    writer.write_all(b"IDS2").unwrap();
    put_i32s(&mut writer, &[2, names.len() as i32]);
    for name in names {
        put_i32s(&mut writer, &[32, 32, 16, 16]);
        put_name::<64>(&mut writer, name);
    }
    writer
}
