use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const MAX_VERTS: u32 = 2048;
pub const MAX_TRIANGLES: u32 = 4096;
pub const MAX_FRAMES: u32 = 512;
pub const MAX_SKINS: u32 = 32;
pub const MAX_SKIN_DIMENSION: u32 = 480;

/// Upper bounds applied to every declared count before anything is allocated.
///
/// Missing keys in a limits file fall back to the legacy engine constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderLimits {
    pub max_verts: u32,
    pub max_tris: u32,
    pub max_frames: u32,
    /// Minimum skin side-table length. Skin counts themselves are not capped.
    pub max_skins: u32,
    pub max_skin_dimension: u32,
}

impl Default for LoaderLimits {
    fn default() -> Self {
        Self {
            max_verts: MAX_VERTS,
            max_tris: MAX_TRIANGLES,
            max_frames: MAX_FRAMES,
            max_skins: MAX_SKINS,
            max_skin_dimension: MAX_SKIN_DIMENSION,
        }
    }
}

impl LoaderLimits {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Reads a JSON limits file. Parse failures surface as `InvalidData` i/o errors.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }

    /// Skins side-table length for a model declaring `num_skins`.
    pub fn skin_slots(&self, num_skins: u32) -> usize {
        num_skins.max(self.max_skins) as usize
    }
}
