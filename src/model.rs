use crate::arena::Arena;
use crate::endian::decode_name;
use crate::error::{corrupt, Result};
use crate::formats::ModelFormat;
use crate::model_types::{
    FrameHeader, MeshNode, ModelHeader, SkinName, SpriteFrame, SpriteHeader, StVert, TriVertex,
    Triangle, FRAME_HEADER_SIZE,
};
use crate::skins::ImageHandle;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Alias,
    Sprite,
}

/// A decoded model: one arena plus the per-skin image slots.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    name: String,
    format: ModelFormat,
    kind: ModelKind,
    arena: Arena,
    pub(crate) skins: Vec<Option<ImageHandle>>,
}

impl LoadedModel {
    pub(crate) fn new(
        name: &str,
        format: ModelFormat,
        kind: ModelKind,
        arena: Arena,
        skin_slots: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            format,
            kind,
            arena,
            skins: vec![None; skin_slots],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn skins(&self) -> &[Option<ImageHandle>] {
        &self.skins
    }

    pub fn alias(&self) -> Option<AliasModel<'_>> {
        match self.kind {
            ModelKind::Alias => AliasModel::new(&self.arena).ok(),
            ModelKind::Sprite => None,
        }
    }

    pub fn sprite(&self) -> Option<SpriteModel<'_>> {
        match self.kind {
            ModelKind::Sprite => SpriteModel::new(&self.arena).ok(),
            ModelKind::Alias => None,
        }
    }

    pub fn num_frames(&self) -> usize {
        if let Some(alias) = self.alias() {
            alias.header().num_frames as usize
        } else if let Some(sprite) = self.sprite() {
            sprite.header().num_frames as usize
        } else {
            0
        }
    }

    pub fn summary(&self) -> ModelSummary {
        let mut summary = ModelSummary {
            name: self.name.clone(),
            format: self.format,
            kind: self.kind,
            arena_bytes: self.arena.budget(),
            frames: self.num_frames(),
            ..ModelSummary::default()
        };
        if let Some(alias) = self.alias() {
            let header = alias.header();
            summary.skin_size = Some([header.skin_width, header.skin_height]);
            summary.vertices = header.num_xyz as usize;
            summary.triangles = header.num_tris as usize;
            summary.commands = header.num_glcmds as usize;
            summary.meshes = header.num_meshes as usize;
            summary.skins = (0..header.num_skins as usize)
                .filter_map(|i| alias.skin_name(i))
                .collect();
            summary.frame_names = (0..header.num_frames as usize)
                .filter_map(|i| alias.frame(i).ok().map(|f| f.name()))
                .collect();
        }
        if let Some(sprite) = self.sprite() {
            summary.skins = sprite.frames().iter().map(|f| decode_name(&f.name)).collect();
        }
        summary.bound_skins = self.skins.iter().flatten().count();
        summary
    }
}

/// Flat description printed by the cli `info` command.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub format: ModelFormat,
    pub kind: ModelKind,
    pub arena_bytes: usize,
    pub skin_size: Option<[u32; 2]>,
    pub vertices: usize,
    pub triangles: usize,
    pub commands: usize,
    pub meshes: usize,
    pub frames: usize,
    pub frame_names: Vec<String>,
    pub skins: Vec<String>,
    pub bound_skins: usize,
}

impl Default for ModelSummary {
    fn default() -> Self {
        Self {
            name: String::new(),
            format: ModelFormat::Md2,
            kind: ModelKind::Alias,
            arena_bytes: 0,
            skin_size: None,
            vertices: 0,
            triangles: 0,
            commands: 0,
            meshes: 0,
            frames: 0,
            frame_names: Vec::new(),
            skins: Vec::new(),
            bound_skins: 0,
        }
    }
}

/// Typed read access to an alias model arena.
#[derive(Debug, Clone, Copy)]
pub struct AliasModel<'a> {
    arena: &'a Arena,
    header: &'a ModelHeader,
}

pub struct Frame<'a> {
    pub header: &'a FrameHeader,
    pub vertices: &'a [TriVertex],
}

impl Frame<'_> {
    pub fn name(&self) -> String {
        decode_name(&self.header.name)
    }

    pub fn position(&self, index: usize) -> Option<[f32; 3]> {
        self.vertices.get(index).map(|v| self.header.position(v))
    }
}

impl<'a> AliasModel<'a> {
    pub fn new(arena: &'a Arena) -> Result<Self> {
        let header = arena.get::<ModelHeader>(0)?;
        if header.ofs_end as usize > arena.used() {
            return Err(corrupt(format!(
                "descriptor ends at {} past arena of {} bytes",
                header.ofs_end,
                arena.used()
            )));
        }
        Ok(Self { arena, header })
    }

    pub fn header(&self) -> &'a ModelHeader {
        self.header
    }

    pub fn mesh_nodes(&self) -> Result<&'a [MeshNode]> {
        self.arena
            .view(self.header.ofs_meshes as usize, self.header.num_meshes as usize)
    }

    pub fn skin_names(&self) -> Result<&'a [SkinName]> {
        self.arena
            .view(self.header.ofs_skins as usize, self.header.num_skins as usize)
    }

    pub fn skin_name(&self, index: usize) -> Option<String> {
        self.skin_names().ok()?.get(index).map(|raw| decode_name(raw))
    }

    pub fn st(&self) -> Result<&'a [StVert]> {
        self.arena.view(self.header.ofs_st as usize, self.header.num_st as usize)
    }

    pub fn triangles(&self) -> Result<&'a [Triangle]> {
        self.arena
            .view(self.header.ofs_tris as usize, self.header.num_tris as usize)
    }

    pub fn commands(&self) -> Result<&'a [i32]> {
        self.arena
            .view(self.header.ofs_glcmds as usize, self.header.num_glcmds as usize)
    }

    /// Commands belonging to one mesh node.
    pub fn mesh_commands(&self, node: &MeshNode) -> Result<&'a [i32]> {
        let commands = self.commands()?;
        let start = node.start as usize;
        let end = start.saturating_add(node.count as usize);
        commands.get(start..end).ok_or_else(|| {
            corrupt(format!("mesh node {start}+{} outside {} commands", node.count, commands.len()))
        })
    }

    pub fn frame(&self, index: usize) -> Result<Frame<'a>> {
        if index >= self.header.num_frames as usize {
            return Err(corrupt(format!(
                "frame {index} outside 0..{}",
                self.header.num_frames
            )));
        }
        let offset = self.header.ofs_frames as usize + index * self.header.frame_size as usize;
        let header = self.arena.get::<FrameHeader>(offset)?;
        let vertices = self
            .arena
            .view(offset + FRAME_HEADER_SIZE, self.header.num_xyz as usize)?;
        Ok(Frame { header, vertices })
    }

    pub fn has_inline_skins(&self) -> bool {
        self.header.num_imgbit > 0 && self.header.ofs_imgbit > 0
    }

    pub fn inline_skin_len(&self) -> usize {
        self.header.skin_width as usize * self.header.skin_height as usize
            * self.header.num_imgbit as usize
            / 8
    }

    /// Pixels of skin `index` from the inline atlas.
    pub fn inline_skin(&self, index: usize) -> Result<Option<&'a [u8]>> {
        if !self.has_inline_skins() || index >= self.header.num_skins as usize {
            return Ok(None);
        }
        let len = self.inline_skin_len();
        let offset = self.header.ofs_imgbit as usize + index * len;
        self.arena.slice(offset, len).map(Some)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpriteModel<'a> {
    header: &'a SpriteHeader,
    frames: &'a [SpriteFrame],
}

impl<'a> SpriteModel<'a> {
    pub fn new(arena: &'a Arena) -> Result<Self> {
        let header = arena.get::<SpriteHeader>(0)?;
        let frames = arena.view(header.ofs_frames as usize, header.num_frames as usize)?;
        Ok(Self { header, frames })
    }

    pub fn header(&self) -> &'a SpriteHeader {
        self.header
    }

    pub fn frames(&self) -> &'a [SpriteFrame] {
        self.frames
    }

    pub fn frame_name(&self, index: usize) -> Option<String> {
        self.frames.get(index).map(|f| decode_name(&f.name))
    }
}
