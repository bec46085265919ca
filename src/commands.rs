//! Draw command streams.
//!
//! A stream is a run of batches, each a signed vertex count (positive for a
//! strip, negative for a fan) followed by that many `(s, t, index)` triples,
//! closed by a single zero word. Output is always written into a fixed
//! region of `num_glcmds` words; batches that would not fit are dropped
//! whole and the tail is zero filled.

use crate::endian::{next_f32, next_word};
use crate::error::{corrupt, Result};
use log::warn;
use std::io::Cursor;

/// Words per emitted vertex: `s`, `t`, vertex index.
pub const WORDS_PER_VERTEX: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSummary {
    /// Words written, including the terminator.
    pub words: usize,
    pub batches: usize,
    pub truncated: bool,
}

pub struct CommandWriter<'a> {
    out: &'a mut [i32],
    pos: usize,
    batches: usize,
    truncated: bool,
}

impl<'a> CommandWriter<'a> {
    pub fn new(out: &'a mut [i32]) -> Self {
        Self { out, pos: 0, batches: 0, truncated: false }
    }

    /// Opens a batch of `count` vertices if it fits with room left for the terminator.
    pub fn begin_batch(&mut self, count: i32) -> bool {
        let needed = 1 + WORDS_PER_VERTEX * count.unsigned_abs() as usize;
        if self.truncated || self.pos + needed + 1 > self.out.len() {
            self.truncated = true;
            return false;
        }
        self.out[self.pos] = count;
        self.pos += 1;
        self.batches += 1;
        true
    }

    /// Appends one vertex to the open batch. Ignored once the stream is truncated.
    pub fn push_vertex(&mut self, s: f32, t: f32, index: i32) {
        if self.truncated {
            return;
        }
        if let Some(slot) = self.out.get_mut(self.pos..self.pos + WORDS_PER_VERTEX) {
            slot[0] = s.to_bits() as i32;
            slot[1] = t.to_bits() as i32;
            slot[2] = index;
            self.pos += WORDS_PER_VERTEX;
        }
    }

    /// Writes the terminator and zeroes the remainder of the region.
    pub fn finish(self) -> CommandSummary {
        let Self { out, pos, batches, truncated } = self;
        for word in out.iter_mut().skip(pos) {
            *word = 0;
        }
        CommandSummary {
            words: (pos + 1).min(out.len()),
            batches,
            truncated,
        }
    }
}

fn checked_index(index: i32, num_xyz: u32) -> Result<i32> {
    if index < 0 || index as u32 >= num_xyz {
        return Err(corrupt(format!(
            "draw command vertex {index} outside 0..{num_xyz}"
        )));
    }
    Ok(index)
}

fn report(name: &str, summary: &CommandSummary, capacity: usize) {
    if summary.truncated {
        warn!(
            "{name}: draw commands do not fit {capacity} words, kept {} batches",
            summary.batches
        );
    }
}

/// Copies a stream stored as `count, (s, t, index)*` batches.
pub fn copy_commands(
    name: &str,
    source: &[u8],
    out: &mut [i32],
    num_xyz: u32,
) -> Result<CommandSummary> {
    let capacity = out.len();
    let mut cursor = Cursor::new(source);
    let mut writer = CommandWriter::new(out);

    loop {
        let count = next_word(&mut cursor, "draw commands")?;
        if count == 0 || !writer.begin_batch(count) {
            break;
        }
        for _ in 0..count.unsigned_abs() {
            let s = next_f32(&mut cursor, "draw commands")?;
            let t = next_f32(&mut cursor, "draw commands")?;
            let index = checked_index(next_word(&mut cursor, "draw commands")?, num_xyz)?;
            writer.push_vertex(s, t, index);
        }
    }

    let summary = writer.finish();
    report(name, &summary, capacity);
    Ok(summary)
}

/// Copies a packed-model stream: `count, surface, skin, (index, s, t)*`.
///
/// Triples are rotated into the common `(s, t, index)` order and the
/// surface/skin words are dropped.
pub fn remap_packed_commands(
    name: &str,
    source: &[u8],
    out: &mut [i32],
    num_xyz: u32,
) -> Result<CommandSummary> {
    let capacity = out.len();
    let mut cursor = Cursor::new(source);
    let mut writer = CommandWriter::new(out);

    loop {
        let count = next_word(&mut cursor, "draw commands")?;
        if count == 0 || !writer.begin_batch(count) {
            break;
        }
        let _surface = next_word(&mut cursor, "draw commands")?;
        let _skin = next_word(&mut cursor, "draw commands")?;
        for _ in 0..count.unsigned_abs() {
            let index = checked_index(next_word(&mut cursor, "draw commands")?, num_xyz)?;
            let s = next_f32(&mut cursor, "draw commands")?;
            let t = next_f32(&mut cursor, "draw commands")?;
            writer.push_vertex(s, t, index);
        }
    }

    let summary = writer.finish();
    report(name, &summary, capacity);
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandVertex {
    pub s: f32,
    pub t: f32,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Strip,
    Fan,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandBatch<'a> {
    pub kind: BatchKind,
    words: &'a [i32],
}

impl CommandBatch<'_> {
    pub fn len(&self) -> usize {
        self.words.len() / WORDS_PER_VERTEX
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = CommandVertex> + '_ {
        self.words.chunks_exact(WORDS_PER_VERTEX).map(|w| CommandVertex {
            s: f32::from_bits(w[0] as u32),
            t: f32::from_bits(w[1] as u32),
            index: w[2] as u32,
        })
    }

    /// Triangle corner lists in stream order, with strip winding alternated.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        let n = self.len();
        let mut out = Vec::with_capacity(n.saturating_sub(2));
        for i in 2..n {
            match self.kind {
                BatchKind::Fan => out.push([0, i - 1, i]),
                BatchKind::Strip if i % 2 == 0 => out.push([i - 2, i - 1, i]),
                BatchKind::Strip => out.push([i - 1, i - 2, i]),
            }
        }
        out
    }
}

/// Walks an already normalized stream batch by batch.
pub struct CommandBatches<'a> {
    words: &'a [i32],
}

impl<'a> CommandBatches<'a> {
    pub fn new(words: &'a [i32]) -> Self {
        Self { words }
    }
}

impl<'a> Iterator for CommandBatches<'a> {
    type Item = CommandBatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&count, rest) = self.words.split_first()?;
        if count == 0 {
            self.words = &[];
            return None;
        }
        let len = count.unsigned_abs() as usize * WORDS_PER_VERTEX;
        if len > rest.len() {
            self.words = &[];
            return None;
        }
        let (words, rest) = rest.split_at(len);
        self.words = rest;
        let kind = if count < 0 { BatchKind::Fan } else { BatchKind::Strip };
        Some(CommandBatch { kind, words })
    }
}
