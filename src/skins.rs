//! Binding skin and sprite-frame names to images.
//!
//! The loader never touches image files itself. A caller hands in an
//! [`ImageLookup`] that resolves names, and optionally an [`ImageDecode`]
//! that accepts raw 8-bit pixels from models carrying their own atlas.

use crate::endian::{decode_name, encode_name};
use crate::model::LoadedModel;
use crate::model_types::MAX_SKINNAME;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageUsage {
    Skin,
    Sprite,
}

/// Raw pixels handed to an [`ImageDecode`] implementation.
#[derive(Debug, Clone, Copy)]
pub struct ImageData<'a> {
    pub name: &'a str,
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub usage: ImageUsage,
    pub bits: u32,
}

pub trait ImageLookup {
    fn find_image(&self, name: &str, usage: ImageUsage) -> Option<ImageHandle>;
}

pub trait ImageDecode {
    fn load_image(&mut self, image: &ImageData<'_>) -> Option<ImageHandle>;
}

/// Prefix tried for sprite frames whose names lack a directory.
pub const SPRITE_PREFIX: &str = "sprites/";

impl LoadedModel {
    /// Resolves every skin slot and returns the number of frames.
    ///
    /// Unresolved names leave their slot empty; binding itself never fails.
    pub fn bind_skins(
        &mut self,
        lookup: &dyn ImageLookup,
        mut decoder: Option<&mut dyn ImageDecode>,
    ) -> usize {
        let bindings = if let Some(sprite) = self.sprite() {
            sprite
                .frames()
                .iter()
                .map(|frame| {
                    let name = decode_name(&frame.name);
                    lookup.find_image(&name, ImageUsage::Sprite).or_else(|| {
                        let prefixed: [u8; MAX_SKINNAME] =
                            encode_name(&format!("{SPRITE_PREFIX}{name}"));
                        lookup.find_image(&decode_name(&prefixed), ImageUsage::Sprite)
                    })
                })
                .collect::<Vec<_>>()
        } else if let Some(alias) = self.alias() {
            let header = alias.header();
            let mut bound = Vec::with_capacity(header.num_skins as usize);
            for index in 0..header.num_skins as usize {
                let name = alias.skin_name(index).unwrap_or_default();
                let pixels = alias.inline_skin(index).ok().flatten();
                let handle = match (pixels, decoder.as_deref_mut()) {
                    (Some(pixels), Some(decoder)) => decoder.load_image(&ImageData {
                        name: &name,
                        pixels,
                        width: header.skin_width,
                        height: header.skin_height,
                        stride: header.skin_width,
                        usage: ImageUsage::Skin,
                        bits: header.num_imgbit,
                    }),
                    _ => lookup.find_image(&name, ImageUsage::Skin),
                };
                bound.push(handle);
            }
            bound
        } else {
            Vec::new()
        };

        let missing = bindings.iter().filter(|h| h.is_none()).count();
        if missing > 0 {
            warn!("{}: {missing} of {} images not found", self.name(), bindings.len());
        }
        for (slot, handle) in self.skins.iter_mut().zip(bindings) {
            *slot = handle;
        }
        debug!("{}: bound {} images", self.name(), self.skins.iter().flatten().count());
        self.num_frames()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Keeps decoded skins in memory, tightly packed.
#[derive(Debug, Default)]
pub struct MemoryImages {
    images: Vec<DecodedImage>,
}

impl MemoryImages {
    pub fn images(&self) -> &[DecodedImage] {
        &self.images
    }

    pub fn get(&self, handle: ImageHandle) -> Option<&DecodedImage> {
        self.images.get((handle.0 as usize).checked_sub(1)?)
    }
}

impl ImageDecode for MemoryImages {
    fn load_image(&mut self, image: &ImageData<'_>) -> Option<ImageHandle> {
        let row = (image.width * image.bits / 8) as usize;
        let stride = (image.stride * image.bits / 8) as usize;
        if stride < row {
            warn!("{}: stride {} shorter than width {}", image.name, image.stride, image.width);
            return None;
        }
        let pixels: Vec<u8> = image
            .pixels
            .chunks(stride.max(1))
            .take(image.height as usize)
            .filter(|r| r.len() >= row)
            .flat_map(|r| &r[..row])
            .copied()
            .collect();
        if pixels.len() != row * image.height as usize {
            let expected = row * image.height as usize;
            warn!("{}: {} pixel bytes, expected {expected}", image.name, pixels.len());
            return None;
        }
        self.images.push(DecodedImage {
            name: image.name.to_string(),
            width: image.width,
            height: image.height,
            pixels,
        });
        Some(ImageHandle(self.images.len() as u32))
    }
}

/// Resolves image names against files under a root directory.
///
/// Names without an extension are tried as `.png`, `.tga`, `.pcx` and
/// `.wal` in that order. Each distinct path gets a stable handle.
#[derive(Debug, Default)]
pub struct DirectoryImages {
    root: PathBuf,
    handles: std::cell::RefCell<HashMap<PathBuf, ImageHandle>>,
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "tga", "pcx", "wal"];

impl DirectoryImages {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            handles: Default::default(),
        }
    }

    pub fn path_of(&self, handle: ImageHandle) -> Option<PathBuf> {
        self.handles
            .borrow()
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(path, _)| path.clone())
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let base = self.root.join(name);
        if Path::new(name).extension().is_some() {
            let mut candidates = vec![base.clone()];
            candidates.extend(IMAGE_EXTENSIONS.iter().map(|ext| base.with_extension(ext)));
            candidates
        } else {
            IMAGE_EXTENSIONS.iter().map(|ext| base.with_extension(ext)).collect()
        }
    }
}

impl ImageLookup for DirectoryImages {
    fn find_image(&self, name: &str, _usage: ImageUsage) -> Option<ImageHandle> {
        let path = self.candidates(name).into_iter().find(|p| p.is_file())?;
        let mut handles = self.handles.borrow_mut();
        let next = ImageHandle(handles.len() as u32 + 1);
        Some(*handles.entry(path).or_insert(next))
    }
}
