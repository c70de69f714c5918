//! Game-agnostic voxel world data: paletted chunk sections, chunk columns,
//! and the view-volume geometry used to decide which columns a viewer needs.

pub mod view;
pub mod world;
