//! Size planning for the normalized layout.
//!
//! A decoder first turns header fields into validated [`AliasCounts`], then
//! builds a [`LayoutPlan`] from them. Only a finished plan can allocate an
//! arena, so no byte is committed before every count has been checked.

use crate::arena::{align_up, Arena};
use crate::config::LoaderLimits;
use crate::error::{corrupt, LoadError, Result};
use crate::model_types::{
    frame_size, MeshNode, ModelHeader, SkinName, SpriteFrame, SpriteHeader, StVert, Triangle,
};
use std::mem::size_of;

/// Counts exactly as a file header declares them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredCounts {
    pub skin_width: i32,
    pub skin_height: i32,
    pub num_meshes: i32,
    pub num_skins: i32,
    pub num_xyz: i32,
    pub num_st: i32,
    pub num_tris: i32,
    pub num_glcmds: i32,
    pub num_frames: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AliasCounts {
    pub skin_width: u32,
    pub skin_height: u32,
    pub num_meshes: u32,
    pub num_skins: u32,
    pub num_xyz: u32,
    pub num_st: u32,
    pub num_tris: u32,
    pub num_glcmds: u32,
    pub num_frames: u32,
    /// Bit depth of an inline skin atlas, 0 when the skins live elsewhere.
    pub inline_skin_bits: u32,
}

fn within(what: &'static str, value: i32, min: i64, max: i64) -> Result<u32> {
    let wide = i64::from(value);
    if wide < min || wide > max {
        return Err(LoadError::LimitExceeded { what, value: wide, min, max });
    }
    Ok(value as u32)
}

impl AliasCounts {
    /// Checks declared counts against the configured limits.
    pub fn validate(declared: &DeclaredCounts, limits: &LoaderLimits) -> Result<Self> {
        if declared.num_skins < 0 {
            return Err(corrupt(format!("negative skin count {}", declared.num_skins)));
        }
        if declared.skin_width < 0 || declared.skin_height < 0 {
            return Err(corrupt(format!(
                "negative skin size {}x{}",
                declared.skin_width, declared.skin_height
            )));
        }

        let unbounded = i64::from(i32::MAX);
        Ok(Self {
            skin_width: declared.skin_width as u32,
            skin_height: within(
                "skin height",
                declared.skin_height,
                0,
                i64::from(limits.max_skin_dimension),
            )?,
            num_meshes: within("mesh node", declared.num_meshes, 1, unbounded)?,
            num_skins: declared.num_skins as u32,
            num_xyz: within("vertex", declared.num_xyz, 1, i64::from(limits.max_verts))?,
            num_st: within("texture coordinate", declared.num_st, 1, unbounded)?,
            num_tris: within("triangle", declared.num_tris, 1, i64::from(limits.max_tris))?,
            num_glcmds: within("draw command", declared.num_glcmds, 1, unbounded)?,
            num_frames: within("frame", declared.num_frames, 1, i64::from(limits.max_frames))?,
            inline_skin_bits: 0,
        })
    }

    pub fn frame_size(&self) -> usize {
        frame_size(self.num_xyz as usize)
    }

    pub fn inline_skin_bytes(&self) -> usize {
        self.skin_width as usize * self.skin_height as usize * self.inline_skin_bits as usize / 8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Alias,
    Sprite,
}

/// Byte layout of one arena, computed purely from counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    kind: PlanKind,
    header: ModelHeader,
    sprite: SpriteHeader,
    regions: Vec<usize>,
    total: usize,
}

struct Cumulative {
    sizes: Vec<usize>,
    offset: usize,
}

impl Cumulative {
    fn new() -> Self {
        Self { sizes: Vec::new(), offset: 0 }
    }

    fn push(&mut self, count: usize, record: usize) -> Result<u32> {
        let size = count
            .checked_mul(record)
            .map(align_up)
            .ok_or_else(|| corrupt("region size overflows"))?;
        let offset = self.offset;
        self.offset = offset
            .checked_add(size)
            .filter(|&end| end <= u32::MAX as usize)
            .ok_or_else(|| corrupt("model layout exceeds 4 GiB"))?;
        self.sizes.push(size);
        Ok(offset as u32)
    }
}

impl LayoutPlan {
    pub fn alias(counts: &AliasCounts) -> Result<Self> {
        let mut layout = Cumulative::new();
        layout.push(1, size_of::<ModelHeader>())?;

        let mut header = ModelHeader {
            skin_width: counts.skin_width,
            skin_height: counts.skin_height,
            frame_size: counts.frame_size() as u32,
            num_meshes: counts.num_meshes,
            num_skins: counts.num_skins,
            num_xyz: counts.num_xyz,
            num_st: counts.num_st,
            num_tris: counts.num_tris,
            num_glcmds: counts.num_glcmds,
            num_frames: counts.num_frames,
            num_imgbit: counts.inline_skin_bits,
            ..ModelHeader::default()
        };

        header.ofs_meshes = layout.push(counts.num_meshes as usize, size_of::<MeshNode>())?;
        header.ofs_skins = layout.push(counts.num_skins as usize, size_of::<SkinName>())?;
        header.ofs_st = layout.push(counts.num_st as usize, size_of::<StVert>())?;
        header.ofs_tris = layout.push(counts.num_tris as usize, size_of::<Triangle>())?;
        header.ofs_glcmds = layout.push(counts.num_glcmds as usize, size_of::<i32>())?;
        header.ofs_frames = layout.push(counts.num_frames as usize, counts.frame_size())?;
        if counts.inline_skin_bits > 0 {
            header.ofs_imgbit = layout.push(counts.num_skins as usize, counts.inline_skin_bytes())?;
        }
        header.ofs_end = layout.offset as u32;

        Ok(Self {
            kind: PlanKind::Alias,
            header,
            sprite: SpriteHeader::default(),
            total: layout.offset,
            regions: layout.sizes,
        })
    }

    pub fn sprite(num_frames: u32) -> Result<Self> {
        let mut layout = Cumulative::new();
        layout.push(1, size_of::<SpriteHeader>())?;
        let ofs_frames = layout.push(num_frames as usize, size_of::<SpriteFrame>())?;
        let sprite = SpriteHeader {
            num_frames,
            ofs_frames,
            ofs_end: layout.offset as u32,
            reserved: 0,
        };

        Ok(Self {
            kind: PlanKind::Sprite,
            header: ModelHeader::default(),
            sprite,
            total: layout.offset,
            regions: layout.sizes,
        })
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn header(&self) -> &ModelHeader {
        &self.header
    }

    pub fn sprite_header(&self) -> &SpriteHeader {
        &self.sprite
    }

    /// Total committed bytes.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Commits the arena and writes the descriptor at offset 0.
    ///
    /// Every region is carved here, in plan order, so later fills only ever
    /// address space that the budget already covers.
    pub fn allocate(&self) -> Result<Arena> {
        let mut arena = Arena::with_budget(self.total);
        for &size in &self.regions {
            arena.allocate_region(size)?;
        }
        match self.kind {
            PlanKind::Alias => *arena.get_mut::<ModelHeader>(0)? = self.header,
            PlanKind::Sprite => *arena.get_mut::<SpriteHeader>(0)? = self.sprite,
        }
        Ok(arena)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> AliasCounts {
        AliasCounts {
            skin_width: 8,
            skin_height: 4,
            num_meshes: 1,
            num_skins: 2,
            num_xyz: 4,
            num_st: 5,
            num_tris: 2,
            num_glcmds: 21,
            num_frames: 3,
            inline_skin_bits: 0,
        }
    }

    #[test]
    fn offsets_accumulate_in_fixed_region_order() {
        let plan = LayoutPlan::alias(&counts()).unwrap();
        let header = plan.header();
        assert_eq!(header.ofs_meshes, 80);
        assert_eq!(header.ofs_skins, 88);
        assert_eq!(header.ofs_st, 88 + 128);
        assert_eq!(header.ofs_tris, 216 + 20);
        assert_eq!(header.ofs_glcmds, 236 + 24);
        assert_eq!(header.ofs_frames, 260 + 84);
        assert_eq!(header.frame_size, 56);
        assert_eq!(header.ofs_end, 344 + 168);
        assert_eq!(header.ofs_imgbit, 0);
        assert_eq!(plan.total(), 512);
    }

    #[test]
    fn inline_atlas_is_planned_last() {
        let mut counts = counts();
        counts.inline_skin_bits = 8;
        let plan = LayoutPlan::alias(&counts).unwrap();
        assert_eq!(plan.header().ofs_imgbit, 512);
        assert_eq!(plan.header().ofs_end, 512 + 2 * 32);
        assert_eq!(plan.header().num_imgbit, 8);
    }

    #[test]
    fn allocate_writes_descriptor_and_commits_everything() {
        let plan = LayoutPlan::alias(&counts()).unwrap();
        let arena = plan.allocate().unwrap();
        assert_eq!(arena.budget(), plan.total());
        assert_eq!(arena.used(), plan.total());
        assert_eq!(arena.get::<ModelHeader>(0).unwrap(), plan.header());
    }

    #[test]
    fn sprite_plan_has_header_and_frames() {
        let plan = LayoutPlan::sprite(5).unwrap();
        assert_eq!(plan.sprite_header().ofs_frames, 16);
        assert_eq!(plan.sprite_header().ofs_end, 16 + 5 * 80);
        let arena = plan.allocate().unwrap();
        assert_eq!(arena.get::<SpriteHeader>(0).unwrap().num_frames, 5);
    }

    #[test]
    fn validation_reports_each_limit() {
        let limits = LoaderLimits::default();
        let declared = DeclaredCounts {
            skin_width: 64,
            skin_height: 64,
            num_meshes: 1,
            num_skins: 1,
            num_xyz: 4,
            num_st: 4,
            num_tris: 2,
            num_glcmds: 21,
            num_frames: 1,
        };
        assert!(AliasCounts::validate(&declared, &limits).is_ok());

        let no_verts = DeclaredCounts { num_xyz: 0, ..declared };
        assert!(matches!(
            AliasCounts::validate(&no_verts, &limits),
            Err(LoadError::LimitExceeded { what: "vertex", value: 0, .. })
        ));

        let too_many = DeclaredCounts { num_xyz: limits.max_verts as i32 + 1, ..declared };
        assert!(matches!(
            AliasCounts::validate(&too_many, &limits),
            Err(LoadError::LimitExceeded { what: "vertex", .. })
        ));

        let tall = DeclaredCounts { skin_height: 4096, ..declared };
        assert!(matches!(
            AliasCounts::validate(&tall, &limits),
            Err(LoadError::LimitExceeded { what: "skin height", .. })
        ));

        let negative = DeclaredCounts { num_skins: -1, ..declared };
        assert!(matches!(
            AliasCounts::validate(&negative, &limits),
            Err(LoadError::CorruptHeader(_))
        ));

        let many_skins = DeclaredCounts { num_skins: limits.max_skins as i32 + 1, ..declared };
        assert_eq!(AliasCounts::validate(&many_skins, &limits).unwrap().num_skins, 33);

        let no_frames = DeclaredCounts { num_frames: 0, ..declared };
        assert!(matches!(
            AliasCounts::validate(&no_frames, &limits),
            Err(LoadError::LimitExceeded { what: "frame", .. })
        ));
    }
}
