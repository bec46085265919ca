//! Single-allocation storage for one loaded model.
//!
//! The arena is sized once from a committed byte budget and never grows.
//! Regions are carved front to back at 4-byte granularity, and typed views
//! are checked against the committed bound before they are handed out.

use crate::error::{LoadError, Result};
use bytemuck::Pod;

pub const REGION_ALIGN: usize = 4;

pub const fn align_up(size: usize) -> usize {
    (size + REGION_ALIGN - 1) & !(REGION_ALIGN - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub len: usize,
}

impl Region {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Arena {
    // u32 backing keeps every carved region 4-byte aligned for the typed views
    words: Vec<u32>,
    budget: usize,
    cursor: usize,
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("budget", &self.budget)
            .field("used", &self.cursor)
            .finish()
    }
}

impl Arena {
    /// Commits a zeroed block of `budget` bytes (rounded up to the region alignment).
    pub fn with_budget(budget: usize) -> Self {
        let budget = align_up(budget);
        Self {
            words: vec![0; budget / REGION_ALIGN],
            budget,
            cursor: 0,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Carves the next `size` bytes. Fails rather than growing past the budget.
    pub fn allocate_region(&mut self, size: usize) -> Result<Region> {
        let len = align_up(size);
        let offset = self.cursor;
        let end = offset.checked_add(len).filter(|&end| end <= self.budget).ok_or(
            LoadError::ArenaBounds {
                offset,
                len,
                bound: self.budget,
            },
        )?;
        self.cursor = end;
        Ok(Region { offset, len })
    }

    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    fn checked_range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let bounds = LoadError::ArenaBounds {
            offset,
            len,
            bound: self.cursor,
        };
        match offset.checked_add(len) {
            Some(end) if end <= self.cursor => Ok(offset..end),
            _ => Err(bounds),
        }
    }

    /// Raw bytes of an already carved range.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.checked_range(offset, len)?;
        Ok(&self.bytes()[range])
    }

    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let range = self.checked_range(offset, len)?;
        Ok(&mut self.bytes_mut()[range])
    }

    /// `count` records of `T` starting at `offset`.
    pub fn view<T: Pod>(&self, offset: usize, count: usize) -> Result<&[T]> {
        let len = count
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(LoadError::ArenaBounds { offset, len: usize::MAX, bound: self.cursor })?;
        let bytes = self.slice(offset, len)?;
        bytemuck::try_cast_slice(bytes).map_err(|_| LoadError::ArenaBounds {
            offset,
            len,
            bound: self.cursor,
        })
    }

    pub fn view_mut<T: Pod>(&mut self, offset: usize, count: usize) -> Result<&mut [T]> {
        let bound = self.cursor;
        let len = count
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(LoadError::ArenaBounds { offset, len: usize::MAX, bound })?;
        let bytes = self.slice_mut(offset, len)?;
        bytemuck::try_cast_slice_mut(bytes)
            .map_err(|_| LoadError::ArenaBounds { offset, len, bound })
    }

    pub fn get<T: Pod>(&self, offset: usize) -> Result<&T> {
        Ok(&self.view::<T>(offset, 1)?[0])
    }

    pub fn get_mut<T: Pod>(&mut self, offset: usize) -> Result<&mut T> {
        Ok(&mut self.view_mut::<T>(offset, 1)?[0])
    }
}
