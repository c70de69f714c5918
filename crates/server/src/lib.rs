//! Multiplayer voxel server core: per-dimension interest management,
//! chunk streaming into per-player mailboxes, and a live dashboard.

pub mod config;
pub mod dashboard;
pub mod generator;
pub mod interest;
pub mod mailbox;
pub mod player;
pub mod session;
pub mod universe;
