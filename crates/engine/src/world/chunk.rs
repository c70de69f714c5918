use rayon::prelude::*;

use super::block::{self, Block};
use super::position::LocalBlockPos;
use super::section::ChunkSection;

/// Number of stacked sections in one column.
pub const SECTIONS_PER_COLUMN: usize = 16;
/// One biome id per (x, z) surface cell.
pub const BIOME_AREA: usize = 256;
/// Biome id of plains.
pub const DEFAULT_BIOME: u8 = 1;

/// A column of up to 16 chunk sections plus a 16x16 biome grid.
///
/// Sections are attached on demand and never detached; the populated-section
/// bitmask is derived from which slots are attached.
#[derive(Clone)]
pub struct ChunkColumn {
    sections: [Option<ChunkSection>; SECTIONS_PER_COLUMN],
    biomes: Box<[u8; BIOME_AREA]>,
}

impl ChunkColumn {
    pub fn new() -> Self {
        Self {
            sections: Default::default(),
            biomes: Box::new([DEFAULT_BIOME; BIOME_AREA]),
        }
    }

    pub fn section(&self, section_y: usize) -> Option<&ChunkSection> {
        self.sections.get(section_y)?.as_ref()
    }

    /// The section at `section_y`, attaching an all-air one if the slot is empty.
    ///
    /// Panics if `section_y >= 16`.
    pub fn section_mut(&mut self, section_y: usize) -> &mut ChunkSection {
        self.sections[section_y].get_or_insert_with(ChunkSection::new)
    }

    pub fn set_section(&mut self, section_y: usize, section: ChunkSection) {
        self.sections[section_y] = Some(section);
    }

    pub fn get_block(&self, pos: LocalBlockPos) -> Block {
        match self.section(pos.section_index()) {
            Some(section) => section.get_block(pos.x, pos.section_local_y(), pos.z),
            None => block::AIR,
        }
    }

    /// Setting air into an absent section leaves the slot empty.
    pub fn set_block(&mut self, pos: LocalBlockPos, block: Block) {
        let section_y = pos.section_index();
        if block.is_air() && self.sections[section_y].is_none() {
            return;
        }
        self.section_mut(section_y)
            .set_block(pos.x, pos.section_local_y(), pos.z, block);
    }

    pub fn set_biome(&mut self, x: u8, z: u8, biome: u8) {
        self.biomes[(z as usize & 0xF) * 16 + (x as usize & 0xF)] = biome;
    }

    pub fn get_biome(&self, x: u8, z: u8) -> u8 {
        self.biomes[(z as usize & 0xF) * 16 + (x as usize & 0xF)]
    }

    pub fn section_bitmask(&self) -> u16 {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .fold(0, |mask, (y, _)| mask | (1 << y))
    }

    pub fn section_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_some()).count()
    }

    /// Encode all present sections bottom-up, followed by the biome grid when
    /// `include_biomes` is set. Returns the populated-section bitmask and the
    /// payload; the caller frames it with the column position.
    pub fn encode(&self, include_biomes: bool, is_overworld: bool) -> (u16, Vec<u8>) {
        let encoded: Vec<Vec<u8>> = self.sections[..]
            .par_iter()
            .filter_map(|slot| slot.as_ref().map(|s| s.encode(is_overworld)))
            .collect();

        let mut payload = Vec::with_capacity(
            encoded.iter().map(Vec::len).sum::<usize>() + BIOME_AREA,
        );
        for section in encoded {
            payload.extend_from_slice(&section);
        }
        if include_biomes {
            payload.extend_from_slice(&self.biomes[..]);
        }

        (self.section_bitmask(), payload)
    }
}

impl Default for ChunkColumn {
    fn default() -> Self {
        Self::new()
    }
}
