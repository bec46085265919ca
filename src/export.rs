//! Turning decoded models into files other tools read: OBJ meshes and PNG skins.

use crate::commands::CommandBatches;
use crate::error::{LoadError, Result};
use crate::model::LoadedModel;
use crate::model_types::{IntermediateMesh, IntermediateVertex};
use crate::skins::{ImageData, ImageDecode, ImageHandle};
use image::{GrayImage, RgbImage};
use log::{debug, warn};
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::{Path, PathBuf};

pub const PALETTE_SIZE: usize = 768;

/// Flattens one frame's command stream into an indexed triangle list.
///
/// Each command vertex becomes its own mesh vertex, since the same position
/// can carry different texture coordinates in different batches.
pub fn frame_to_mesh(model: &LoadedModel, frame: usize) -> Result<IntermediateMesh> {
    let alias = model.alias().ok_or_else(|| {
        LoadError::UnsupportedVariant(format!("{} has no geometry", model.name()))
    })?;
    let frame = alias.frame(frame)?;

    let mut mesh = IntermediateMesh::default();
    for batch in CommandBatches::new(alias.commands()?) {
        let base = mesh.vertices.len() as u32;
        for vertex in batch.vertices() {
            let pos = frame.position(vertex.index as usize).ok_or_else(|| {
                LoadError::CorruptHeader(format!("command vertex {} has no position", vertex.index))
            })?;
            mesh.vertices.push(IntermediateVertex { pos, uv: [vertex.s, vertex.t] });
        }
        mesh.faces.extend(
            batch
                .triangles()
                .into_iter()
                .map(|[a, b, c]| [base + a as u32, base + b as u32, base + c as u32]),
        );
    }
    Ok(mesh)
}

pub fn mesh_to_obj_bytes(mesh: &IntermediateMesh) -> Result<Vec<u8>> {
    let mut output = String::new();

    for vertex in &mesh.vertices {
        fmt_ok(writeln!(
            &mut output,
            "v {:.6} {:.6} {:.6}",
            vertex.pos[0],
            vertex.pos[1],
            vertex.pos[2]
        ))?;
    }

    for vertex in &mesh.vertices {
        fmt_ok(writeln!(
            &mut output,
            "vt {:.6} {:.6}",
            vertex.uv[0],
            1.0 - vertex.uv[1]
        ))?;
    }

    for face in &mesh.faces {
        fmt_ok(writeln!(
            &mut output,
            "f {}/{} {}/{} {}/{}",
            face[0] + 1,
            face[0] + 1,
            face[1] + 1,
            face[1] + 1,
            face[2] + 1,
            face[2] + 1
        ))?;
    }

    Ok(output.into_bytes())
}

fn fmt_ok(result: fmt::Result) -> Result<()> {
    result.map_err(|_| LoadError::Io(std::io::Error::other("failed to format OBJ output")))
}

/// Writes 8-bit skins handed over by [`LoadedModel::bind_skins`] as PNG files.
///
/// Without a palette the indices are written as grayscale.
#[derive(Debug)]
pub struct PngSkinWriter {
    dir: PathBuf,
    palette: Option<Vec<u8>>,
    written: Vec<PathBuf>,
}

impl PngSkinWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), palette: None, written: Vec::new() }
    }

    /// Uses the first 768 bytes of `palette` as 256 RGB triples.
    pub fn with_palette(mut self, palette: &[u8]) -> Result<Self> {
        let table = palette.get(..PALETTE_SIZE).ok_or(LoadError::TruncatedInput {
            what: "palette",
            needed: PALETTE_SIZE,
            available: palette.len(),
        })?;
        self.palette = Some(table.to_vec());
        Ok(self)
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// `progs/ogre.mdl#0.tga` becomes `<dir>/ogre.mdl_0.png`.
    fn output_path(&self, name: &str) -> PathBuf {
        let file = name.rsplit('/').next().unwrap_or(name).replace('#', "_");
        self.dir.join(Path::new(&file).with_extension("png"))
    }

    fn write(&self, image: &ImageData<'_>, path: &Path) -> Result<()> {
        if image.bits != 8 {
            return Err(LoadError::UnsupportedVariant(format!("{}-bit skin", image.bits)));
        }
        let (width, height, stride) =
            (image.width as usize, image.height as usize, image.stride as usize);
        let needed = stride * height.saturating_sub(1) + width;
        if stride < width || image.pixels.len() < needed {
            return Err(LoadError::TruncatedInput {
                what: "skin pixels",
                needed,
                available: image.pixels.len(),
            });
        }
        let indices = image
            .pixels
            .chunks(stride)
            .take(height)
            .flat_map(|row| &row[..width]);

        let result = match &self.palette {
            Some(palette) => {
                let rgb: Vec<u8> = indices
                    .flat_map(|&i| {
                        let at = usize::from(i) * 3;
                        [palette[at], palette[at + 1], palette[at + 2]]
                    })
                    .collect();
                RgbImage::from_raw(image.width, image.height, rgb).map(|img| img.save(path))
            }
            None => {
                let gray: Vec<u8> = indices.copied().collect();
                GrayImage::from_raw(image.width, image.height, gray).map(|img| img.save(path))
            }
        };
        match result {
            Some(saved) => saved.map_err(|e| LoadError::Io(std::io::Error::other(e))),
            None => Err(LoadError::TruncatedInput {
                what: "skin pixels",
                needed: width * height,
                available: image.pixels.len(),
            }),
        }
    }
}

impl ImageDecode for PngSkinWriter {
    fn load_image(&mut self, image: &ImageData<'_>) -> Option<ImageHandle> {
        let path = self.output_path(image.name);
        let written = fs::create_dir_all(&self.dir)
            .map_err(LoadError::from)
            .and_then(|_| self.write(image, &path));
        if let Err(e) = written {
            warn!("{}: {e}", image.name);
            return None;
        }
        debug!("{}: wrote {}", image.name, path.display());
        self.written.push(path);
        Some(ImageHandle(self.written.len() as u32))
    }
}
