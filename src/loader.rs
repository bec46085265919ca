use crate::config::LoaderLimits;
use crate::error::Result;
use crate::files::{locate_model, FileSource};
use crate::formats::decode_model;
use crate::model::LoadedModel;
use log::{debug, warn};
use std::io;

/// Decodes model files under one set of limits, logging the outcome.
#[derive(Debug, Clone, Default)]
pub struct ModelLoader {
    pub limits: LoaderLimits,
}

impl ModelLoader {
    pub fn new(limits: LoaderLimits) -> Self {
        Self { limits }
    }

    pub fn load(&self, name: &str, data: &[u8]) -> Result<LoadedModel> {
        match decode_model(name, data, &self.limits) {
            Ok(model) => {
                let summary = model.summary();
                debug!(
                    "{name}: loaded {} model, {} frames, {} arena bytes",
                    summary.format, summary.frames, summary.arena_bytes
                );
                Ok(model)
            }
            Err(error) => {
                warn!("{name}: {error}");
                Err(error)
            }
        }
    }

    /// Locates `name` through `files` and decodes it.
    pub fn load_from(&self, files: &dyn FileSource, name: &str) -> Result<LoadedModel> {
        let Some(found) = locate_model(files, name) else {
            warn!("{name}: not found");
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("{name} not found")).into());
        };
        self.load(name, &found.data)
    }
}
