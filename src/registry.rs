//! Resident models across registration passes.
//!
//! A pass starts with [`Registry::begin_registration`]. Every model touched
//! by [`Registry::register`] during the pass is stamped with the current
//! generation; [`Registry::end_registration`] drops the rest.

use crate::error::{LoadError, Result};
use crate::files::FileSource;
use crate::loader::ModelLoader;
use crate::model::LoadedModel;
use crate::skins::{ImageDecode, ImageLookup};
use log::debug;
use serde::Serialize;

pub const MAX_MODELS: usize = 512;

#[derive(Debug)]
struct RegistryEntry {
    model: LoadedModel,
    generation: u32,
}

/// One row of [`Registry::entries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryListing {
    pub name: String,
    pub arena_bytes: usize,
    pub in_use: bool,
}

#[derive(Debug)]
pub struct Registry {
    loader: ModelLoader,
    slots: Vec<Option<RegistryEntry>>,
    generation: u32,
}

impl Registry {
    pub fn new(loader: ModelLoader, capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { loader, slots, generation: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn begin_registration(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        debug!("registration pass {}", self.generation);
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|e| e.model.name() == name))
    }

    /// Returns the resident model for `name`, loading it into a free slot if needed.
    ///
    /// Skins are re-resolved either way, since the image set may have changed
    /// since the previous pass. Inline skin atlases go to `decoder` when given.
    pub fn register(
        &mut self,
        name: &str,
        files: &dyn FileSource,
        images: &dyn ImageLookup,
        decoder: Option<&mut dyn ImageDecode>,
    ) -> Result<&LoadedModel> {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                let free = self
                    .slots
                    .iter()
                    .position(Option::is_none)
                    .ok_or(LoadError::RegistryFull(self.slots.len()))?;
                let model = self.loader.load_from(files, name)?;
                self.slots[free] = Some(RegistryEntry { model, generation: self.generation });
                free
            }
        };

        let generation = self.generation;
        let entry = self.slots[index]
            .as_mut()
            .ok_or(LoadError::RegistryFull(index))?;
        entry.generation = generation;
        entry.model.bind_skins(images, decoder);
        Ok(&entry.model)
    }

    pub fn find(&self, name: &str) -> Option<&LoadedModel> {
        self.position(name)
            .and_then(|i| self.slots[i].as_ref())
            .map(|e| &e.model)
    }

    /// Frees every model not registered during the current pass.
    pub fn end_registration(&mut self) -> usize {
        let generation = self.generation;
        let mut evicted = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|e| e.generation != generation) {
                if let Some(entry) = slot.take() {
                    debug!("{}: evicted", entry.model.name());
                }
                evicted += 1;
            }
        }
        evicted
    }

    pub fn entries(&self) -> Vec<RegistryListing> {
        self.slots
            .iter()
            .flatten()
            .map(|e| RegistryListing {
                name: e.model.name().to_string(),
                arena_bytes: e.model.arena().budget(),
                in_use: e.generation == self.generation,
            })
            .collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.slots.iter().flatten().map(|e| e.model.arena().budget()).sum()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(ModelLoader::default(), MAX_MODELS)
    }
}
