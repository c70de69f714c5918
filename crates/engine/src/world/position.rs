/// Number of blocks along each horizontal edge of a chunk column.
pub const CHUNK_EDGE: i32 = 16;

/// Horizontal world border, in blocks from the origin.
pub const WORLD_BORDER: f64 = 30_000_000.0;

/// Convert a world coordinate to its chunk coordinate (floor division by 16).
///
/// Coordinates past the world border map to the border chunk; NaN maps to 0.
#[inline]
pub fn chunk_coord(world: f64) -> i32 {
    (world.clamp(-WORLD_BORDER, WORLD_BORDER) / CHUNK_EDGE as f64).floor() as i32
}

/// Chunk column position (each chunk is 16x16 blocks horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing the world-space point `(x, z)`.
    pub fn from_world(x: f64, z: f64) -> Self {
        Self::new(chunk_coord(x), chunk_coord(z))
    }
}

/// Block position local to a chunk column (x, z in 0..16, y in 0..256).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalBlockPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalBlockPos {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    pub const fn section_index(&self) -> usize {
        (self.y >> 4) as usize
    }

    pub const fn section_local_y(&self) -> u8 {
        self.y & 0xF
    }
}
