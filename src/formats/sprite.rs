use super::common::{check_ident, check_version, header_words};
use super::{ModelDecoder, ModelFormat, SPRITE_IDENT};
use crate::config::LoaderLimits;
use crate::endian::{name_bytes, region};
use crate::error::{corrupt, Result};
use crate::layout::LayoutPlan;
use crate::model::{LoadedModel, ModelKind};
use crate::model_types::{SpriteFrame, SpriteHeader};
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::Cursor;
use std::mem::size_of;

pub const SPRITE_VERSION: i32 = 2;
pub const SPRITE_HEADER_SIZE: usize = 12;

/// `.sp2` flipbook sprites.
pub struct SpriteDecoder;

impl ModelDecoder for SpriteDecoder {
    fn format(&self) -> ModelFormat {
        ModelFormat::Sprite
    }

    fn decode(&self, name: &str, data: &[u8], limits: &LoaderLimits) -> Result<LoadedModel> {
        let [ident, version, num_frames] = header_words::<3>(data, "sprite header")?;
        check_ident(ident, SPRITE_IDENT)?;
        check_version(version, SPRITE_VERSION)?;

        if num_frames < 0 {
            return Err(corrupt(format!("negative sprite frame count {num_frames}")));
        }
        let num_frames = num_frames as u32;
        let src = region(
            data,
            SPRITE_HEADER_SIZE,
            num_frames as usize * size_of::<SpriteFrame>(),
            "sprite frames",
        )?;

        let plan = LayoutPlan::sprite(num_frames)?;
        let mut arena = plan.allocate()?;
        let header: SpriteHeader = *plan.sprite_header();
        let frames =
            arena.view_mut::<SpriteFrame>(header.ofs_frames as usize, num_frames as usize)?;

        let mut cursor = Cursor::new(src);
        for frame in frames.iter_mut() {
            frame.width = cursor.read_i32::<LittleEndian>()?;
            frame.height = cursor.read_i32::<LittleEndian>()?;
            frame.origin_x = cursor.read_i32::<LittleEndian>()?;
            frame.origin_y = cursor.read_i32::<LittleEndian>()?;
            frame.name = name_bytes(&mut cursor)?;
        }

        debug!("{name}: sprite with {num_frames} frames");
        Ok(LoadedModel::new(
            name,
            ModelFormat::Sprite,
            ModelKind::Sprite,
            arena,
            limits.skin_slots(num_frames),
        ))
    }
}
