pub mod block;
pub mod chunk;
pub mod position;
pub mod section;
pub mod wire;

pub use block::{Block, BlockRegistry};
pub use chunk::ChunkColumn;
pub use position::{ChunkPos, LocalBlockPos};
pub use section::ChunkSection;
