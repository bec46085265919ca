//! Format detection and the per-format decoders.

mod common;
pub mod dkm;
pub mod flex;
pub mod md2;
pub mod mdl;
pub mod sprite;

use crate::config::LoaderLimits;
use crate::endian::tag_at;
use crate::error::{LoadError, Result};
use crate::model::LoadedModel;
use serde::Serialize;
use std::fmt;

pub const FLEX_TAG: u32 = u32::from_le_bytes(*b"head");
pub const DKM_IDENT: u32 = u32::from_le_bytes(*b"DKMD");
pub const MD2_IDENT: u32 = u32::from_le_bytes(*b"IDP2");
pub const MDL_IDENT: u32 = u32::from_le_bytes(*b"IDPO");
pub const SPRITE_IDENT: u32 = u32::from_le_bytes(*b"IDS2");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Flex,
    Dkm,
    Md2,
    Mdl,
    Sprite,
}

impl ModelFormat {
    /// Picks a format from the first four bytes of a file.
    pub fn detect(data: &[u8]) -> Result<Self> {
        match tag_at(data)? {
            FLEX_TAG => Ok(Self::Flex),
            DKM_IDENT => Ok(Self::Dkm),
            MD2_IDENT => Ok(Self::Md2),
            MDL_IDENT => Ok(Self::Mdl),
            SPRITE_IDENT => Ok(Self::Sprite),
            tag => Err(LoadError::UnknownFormat { tag }),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Flex => "fm",
            Self::Dkm => "dkm",
            Self::Md2 => "md2",
            Self::Mdl => "mdl",
            Self::Sprite => "sp2",
        }
    }

    pub fn decoder(self) -> &'static dyn ModelDecoder {
        match self {
            Self::Flex => &flex::FlexDecoder,
            Self::Dkm => &dkm::DkmDecoder,
            Self::Md2 => &md2::Md2Decoder,
            Self::Mdl => &mdl::MdlDecoder,
            Self::Sprite => &sprite::SpriteDecoder,
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One on-disk format. Decoders validate everything up front, commit a
/// single arena, then fill it; a failed decode leaves nothing behind.
pub trait ModelDecoder: Sync {
    fn format(&self) -> ModelFormat;

    fn decode(&self, name: &str, data: &[u8], limits: &LoaderLimits) -> Result<LoadedModel>;
}

/// Detects the format of `data` and decodes it.
pub fn decode_model(name: &str, data: &[u8], limits: &LoaderLimits) -> Result<LoadedModel> {
    ModelFormat::detect(data)?.decoder().decode(name, data, limits)
}
