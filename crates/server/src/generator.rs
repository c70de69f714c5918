//! Terrain generators for lazily created chunk columns.
//!
//! A world calls its generator exactly once per column, the first time the
//! column is referenced by a player's view.

use voxstream_engine::world::block::{self, Block};
use voxstream_engine::world::chunk::{ChunkColumn, DEFAULT_BIOME};
use voxstream_engine::world::position::ChunkPos;
use voxstream_engine::world::section::SECTION_SIZE;

/// Fills a freshly created column. Implementations must be deterministic in
/// `pos` and cheap enough to run under the world lock.
pub trait ChunkGenerator: Send + Sync + 'static {
    /// Human-readable name (used for logging).
    fn name(&self) -> &'static str;

    fn generate(&self, pos: ChunkPos, column: &mut ChunkColumn);
}

/// Horizontal layers stacked from y = 0 upward.
#[derive(Clone, Debug)]
pub struct FlatGenerator {
    layers: Vec<Block>,
    biome: u8,
}

/// Nether biome id.
const HELL_BIOME: u8 = 8;
/// End biome id.
const SKY_BIOME: u8 = 9;

impl FlatGenerator {
    /// `layers[0]` is placed at y = 0. At most 256 layers are used.
    pub fn new(layers: Vec<Block>, biome: u8) -> Self {
        let mut layers = layers;
        layers.truncate(256);
        Self { layers, biome }
    }

    /// Bedrock, three stone, two dirt, grass. Surface at y = 6.
    pub fn classic() -> Self {
        Self::new(
            vec![
                block::BEDROCK,
                block::STONE,
                block::STONE,
                block::STONE,
                block::DIRT,
                block::DIRT,
                block::GRASS,
            ],
            DEFAULT_BIOME,
        )
    }

    pub fn nether() -> Self {
        let mut layers = vec![block::BEDROCK];
        layers.extend(std::iter::repeat_n(block::NETHERRACK, 31));
        layers.push(block::GLOWSTONE);
        Self::new(layers, HELL_BIOME)
    }

    pub fn end() -> Self {
        Self::new(vec![block::END_STONE; 48], SKY_BIOME)
    }

    /// Height of the topmost layer, plus one.
    pub fn surface_height(&self) -> usize {
        self.layers.len()
    }
}

impl ChunkGenerator for FlatGenerator {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn generate(&self, _pos: ChunkPos, column: &mut ChunkColumn) {
        for (y, layer) in self.layers.iter().enumerate() {
            if layer.is_air() {
                continue;
            }
            let section = column.section_mut(y / SECTION_SIZE);
            let local_y = (y % SECTION_SIZE) as u8;
            for z in 0..SECTION_SIZE as u8 {
                for x in 0..SECTION_SIZE as u8 {
                    section.set_block(x, local_y, z, *layer);
                }
            }
        }
        for z in 0..SECTION_SIZE as u8 {
            for x in 0..SECTION_SIZE as u8 {
                column.set_biome(x, z, self.biome);
            }
        }
    }
}

/// Leaves columns empty.
pub struct VoidGenerator;

impl ChunkGenerator for VoidGenerator {
    fn name(&self) -> &'static str {
        "void"
    }

    fn generate(&self, _pos: ChunkPos, _column: &mut ChunkColumn) {}
}
