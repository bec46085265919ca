//! Loader for legacy alias models (`.md2`, `.mdl`, `.dkm`, `.fm`) and
//! `.sp2` sprites.
//!
//! Every format is decoded into one contiguous arena holding a fixed
//! descriptor followed by its tables, so callers read one layout no matter
//! which file it came from.

pub mod arena;
pub mod commands;
pub mod config;
pub mod endian;
pub mod error;
pub mod export;
pub mod files;
pub mod formats;
pub mod layout;
pub mod loader;
pub mod model;
pub mod model_types;
pub mod registry;
pub mod requant;
pub mod skins;

#[cfg(test)]
mod fixtures;

pub use config::LoaderLimits;
pub use error::{LoadError, Result};
pub use files::{locate_model, DirectorySource, FileSource};
pub use formats::{decode_model, ModelDecoder, ModelFormat};
pub use loader::ModelLoader;
pub use model::{AliasModel, LoadedModel, ModelKind, ModelSummary, SpriteModel};
pub use registry::Registry;
pub use skins::{DirectoryImages, ImageData, ImageDecode, ImageHandle, ImageLookup, ImageUsage};
