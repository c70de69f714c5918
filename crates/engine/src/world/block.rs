//! Block types and the fixed block catalog.
//!
//! A [`Block`] is an immutable value. Its composite id (`id << 4 | metadata`)
//! is the key of the global palette used by direct section encoding.

use std::collections::HashMap;

/// Maximum light level for both emission and filtering.
pub const MAX_LIGHT: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    pub name: &'static str,
    pub id: u16,
    pub metadata: u8,
    /// Light emitted by the block (0..=15).
    pub light_emitted: u8,
    /// Light absorbed when passing through the block (0..=15).
    pub light_filtered: u8,
}

/// Largest block id whose composite id still fits in 13 bits.
pub const MAX_BLOCK_ID: u16 = (1 << 9) - 1;
/// Largest metadata value (one nibble).
pub const MAX_METADATA: u8 = 0xF;

impl Block {
    /// Panics if `id > MAX_BLOCK_ID` or `metadata > MAX_METADATA`: the
    /// composite id must fit the 13-bit global palette.
    pub const fn new(
        name: &'static str,
        id: u16,
        metadata: u8,
        light_emitted: u8,
        light_filtered: u8,
    ) -> Self {
        assert!(id <= MAX_BLOCK_ID, "block id does not fit the 13-bit global palette");
        assert!(metadata <= MAX_METADATA, "block metadata must fit in a nibble");
        Self {
            name,
            id,
            metadata,
            light_emitted,
            light_filtered,
        }
    }

    /// 13-bit global palette key.
    #[inline]
    pub const fn composite_id(&self) -> u16 {
        (self.id << 4) | self.metadata as u16
    }

    /// Sky light that passes through this block when lit from above.
    #[inline]
    pub const fn sky_light(&self) -> u8 {
        MAX_LIGHT.saturating_sub(self.light_filtered)
    }

    pub const fn is_air(&self) -> bool {
        self.id == 0
    }
}

// -- Catalog --

pub const AIR: Block = Block::new("air", 0, 0, 0, 0);
pub const STONE: Block = Block::new("stone", 1, 0, 0, 15);
pub const GRANITE: Block = Block::new("granite", 1, 1, 0, 15);
pub const GRASS: Block = Block::new("grass", 2, 0, 0, 15);
pub const DIRT: Block = Block::new("dirt", 3, 0, 0, 15);
pub const COBBLESTONE: Block = Block::new("cobblestone", 4, 0, 0, 15);
pub const PLANKS: Block = Block::new("planks", 5, 0, 0, 15);
pub const BEDROCK: Block = Block::new("bedrock", 7, 0, 0, 15);
pub const WATER: Block = Block::new("water", 9, 0, 0, 3);
pub const LAVA: Block = Block::new("lava", 11, 0, 15, 0);
pub const SAND: Block = Block::new("sand", 12, 0, 0, 15);
pub const GRAVEL: Block = Block::new("gravel", 13, 0, 0, 15);
pub const LOG: Block = Block::new("log", 17, 0, 0, 15);
pub const LEAVES: Block = Block::new("leaves", 18, 0, 0, 1);
pub const GLASS: Block = Block::new("glass", 20, 0, 0, 0);
pub const TORCH: Block = Block::new("torch", 50, 0, 14, 0);
pub const ICE: Block = Block::new("ice", 79, 0, 0, 3);
pub const NETHERRACK: Block = Block::new("netherrack", 87, 0, 0, 15);
pub const GLOWSTONE: Block = Block::new("glowstone", 89, 0, 15, 15);
pub const END_STONE: Block = Block::new("end_stone", 121, 0, 0, 15);
pub const SEA_LANTERN: Block = Block::new("sea_lantern", 169, 0, 15, 15);

const CATALOG: &[Block] = &[
    AIR,
    STONE,
    GRANITE,
    GRASS,
    DIRT,
    COBBLESTONE,
    PLANKS,
    BEDROCK,
    WATER,
    LAVA,
    SAND,
    GRAVEL,
    LOG,
    LEAVES,
    GLASS,
    TORCH,
    ICE,
    NETHERRACK,
    GLOWSTONE,
    END_STONE,
    SEA_LANTERN,
];

/// Immutable catalog of every known block variant, built once at startup.
pub struct BlockRegistry {
    by_key: HashMap<(u16, u8), Block>,
}

impl BlockRegistry {
    pub fn vanilla() -> Self {
        let by_key = CATALOG
            .iter()
            .map(|block| ((block.id, block.metadata), *block))
            .collect();
        Self { by_key }
    }

    /// Base variant (metadata 0) of `id`. Unknown ids resolve to air.
    pub fn lookup(&self, id: u16) -> Block {
        self.lookup_variant(id, 0)
    }

    pub fn lookup_variant(&self, id: u16, metadata: u8) -> Block {
        match self.by_key.get(&(id, metadata)) {
            Some(block) => *block,
            None => {
                tracing::debug!("Unknown block {}:{}, using air", id, metadata);
                AIR
            }
        }
    }

    pub fn get(&self, id: u16) -> Option<Block> {
        self.by_key.get(&(id, 0)).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<Block> {
        self.by_key.values().find(|b| b.name == name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::vanilla()
    }
}
