use std::collections::HashMap;

use super::block::{self, Block};
use super::wire;

/// Number of blocks along each axis of a chunk section.
pub const SECTION_SIZE: usize = 16;
/// Total block count in one section.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
/// Bits per block when the section is encoded against the global palette.
pub const DIRECT_BITS: u8 = 13;

/// Most entries a section palette can hold; cell indices are `u16`.
pub const MAX_PALETTE_LEN: usize = 1 << 16;

/// Bits per block for a palette of `len` entries.
///
/// This staircase is part of the wire format and must not be replaced by
/// `ceil(log2(len))`.
pub const fn bits_for_palette(len: usize) -> u8 {
    match len {
        0..=16 => 4,
        17..=32 => 5,
        33..=64 => 6,
        65..=128 => 7,
        129..=256 => 8,
        _ => DIRECT_BITS,
    }
}

/// A 16x16x16 cube of blocks with a local palette.
///
/// Cells hold indices into `palette`, which only ever grows. Index 0 is
/// always air, so a fresh section is all air.
#[derive(Clone, Debug)]
pub struct ChunkSection {
    palette: Vec<Block>,
    lookup: HashMap<Block, u16>,
    cells: Box<[u16; SECTION_VOLUME]>,
}

impl ChunkSection {
    pub fn new() -> Self {
        Self {
            palette: vec![block::AIR],
            lookup: HashMap::from([(block::AIR, 0)]),
            cells: Box::new([0; SECTION_VOLUME]),
        }
    }

    pub fn new_filled(block: Block) -> Self {
        let mut section = Self::new();
        section.fill(block);
        section
    }

    #[inline]
    const fn index(x: u8, y: u8, z: u8) -> usize {
        ((y as usize * SECTION_SIZE) + z as usize) * SECTION_SIZE + x as usize
    }

    fn palette_index(&mut self, block: Block) -> u16 {
        if let Some(&index) = self.lookup.get(&block) {
            return index;
        }
        assert!(
            self.palette.len() < MAX_PALETTE_LEN,
            "section palette is full ({MAX_PALETTE_LEN} entries)"
        );
        let index = self.palette.len() as u16;
        self.palette.push(block);
        self.lookup.insert(block, index);
        index
    }

    pub fn set_block(&mut self, x: u8, y: u8, z: u8, block: Block) {
        let index = self.palette_index(block);
        self.cells[Self::index(x, y, z)] = index;
    }

    #[inline]
    pub fn get_block(&self, x: u8, y: u8, z: u8) -> Block {
        self.palette[self.cells[Self::index(x, y, z)] as usize]
    }

    pub fn fill(&mut self, block: Block) {
        let index = self.palette_index(block);
        self.cells.fill(index);
    }

    pub fn palette(&self) -> &[Block] {
        &self.palette
    }

    pub fn bits_per_block(&self) -> u8 {
        bits_for_palette(self.palette.len())
    }

    /// True when every cell is air.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&i| i == 0)
    }

    /// Iterate cells in wire order (`((y * 16) + z) * 16 + x`).
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.cells.iter().map(|&i| self.palette[i as usize])
    }

    /// Serialize the section.
    ///
    /// Layout: bits-per-block byte, palette (VarInt length + composite ids, or
    /// length 0 in direct mode), VarInt word count, `64 * bits` big-endian
    /// longs, then 2048 bytes of block light and, in the overworld only,
    /// 2048 bytes of sky light.
    pub fn encode(&self, is_overworld: bool) -> Vec<u8> {
        let bits = self.bits_per_block();
        let word_count = 64 * bits as usize;
        let light_len = SECTION_VOLUME / 2;
        let mut buf = Vec::with_capacity(
            16 + self.palette.len() * 2 + word_count * 8 + light_len * 2,
        );

        buf.push(bits);
        let words = if bits < 9 {
            wire::write_varint(&mut buf, self.palette.len() as i32);
            for block in &self.palette {
                wire::write_varint(&mut buf, block.composite_id() as i32);
            }
            wire::pack_words(self.cells.iter().map(|&i| i as u64), bits, word_count)
        } else {
            wire::write_varint(&mut buf, 0);
            wire::pack_words(
                self.blocks().map(|b| b.composite_id() as u64),
                bits,
                word_count,
            )
        };

        wire::write_varint(&mut buf, word_count as i32);
        wire::write_words(&mut buf, &words);

        wire::write_nibble_pairs(&mut buf, self.blocks().map(|b| b.light_emitted));
        if is_overworld {
            wire::write_nibble_pairs(&mut buf, self.blocks().map(|b| b.sky_light()));
        }
        buf
    }
}

impl Default for ChunkSection {
    fn default() -> Self {
        Self::new()
    }
}
