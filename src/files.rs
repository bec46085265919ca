//! Finding model files by their game path.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions tried for alias models, in priority order.
pub const MODEL_EXTENSIONS: [&str; 4] = ["fm", "dkm", "md2", "mdl"];

/// Old model paths that shipped under a different directory.
const RENAMED_MODELS: [(&str, &str); 4] = [
    ("models/monsters/soldierh/tris", "models/monsters/soldier/tris"),
    ("models/monsters/gladb/tris", "models/monsters/gladiatr/tris"),
    ("models/monsters/boss5/tris", "models/monsters/boss1/tris"),
    ("models/monsters/bitch2/tris", "models/monsters/bitch/tris"),
];

pub trait FileSource {
    /// Whole-file read; `None` when the file is missing or unreadable.
    fn read(&self, path: &str) -> Option<Vec<u8>>;
}

/// Reads game paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSource for DirectorySource {
    fn read(&self, path: &str) -> Option<Vec<u8>> {
        fs::read(self.root.join(path)).ok()
    }
}

/// A located file: the path that matched and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    pub path: String,
    pub data: Vec<u8>,
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    let file_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = file_start + dot;
            (&name[..dot], Some(&name[dot + 1..]))
        }
        _ => (name, None),
    }
}

fn read_non_empty(source: &dyn FileSource, path: &str) -> Option<LocatedFile> {
    let data = source.read(path).filter(|data| !data.is_empty())?;
    Some(LocatedFile { path: path.to_string(), data })
}

fn find_with_extension(source: &dyn FileSource, name: &str) -> Option<LocatedFile> {
    let (stem, extension) = split_extension(name);
    let is_model = extension.is_none_or(|ext| {
        MODEL_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext))
    });

    if is_model {
        for ext in MODEL_EXTENSIONS {
            if let Some(found) = read_non_empty(source, &format!("{stem}.{ext}")) {
                return Some(found);
            }
        }
    }
    read_non_empty(source, name)
}

/// Finds the file backing a model name.
///
/// Alias models are looked up under every known extension, then the name is
/// tried as given, then under its legacy rename.
pub fn locate_model(source: &dyn FileSource, name: &str) -> Option<LocatedFile> {
    if let Some(found) = find_with_extension(source, name) {
        return Some(found);
    }

    let (stem, _) = split_extension(name);
    let (_, renamed) = RENAMED_MODELS
        .iter()
        .find(|(old, _)| old.eq_ignore_ascii_case(stem))?;
    debug!("{name}: trying legacy path {renamed}");
    find_with_extension(source, renamed)
}
