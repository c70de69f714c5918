//! Player identity and the live per-player aggregate owned by a world.

use uuid::Uuid;
use voxstream_engine::view::ViewVolume;
use voxstream_engine::world::position::ChunkPos;

use crate::mailbox::Mailboxes;

/// Who a player is, as established by login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uuid: Uuid,
    pub name: String,
}

impl Identity {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }

    /// Offline-mode identity: the UUID is derived from the name.
    pub fn offline(name: &str) -> Self {
        Self::new(offline_uuid(name), name)
    }
}

/// Generate an offline-mode UUID from a player name.
pub fn offline_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_URL, format!("OfflinePlayer:{}", name).as_bytes())
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn chunk(&self) -> ChunkPos {
        ChunkPos::from_world(self.x, self.z)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Look {
    pub yaw: f32,
    pub pitch: f32,
}

/// Live state of a joined player. Owned by the world for as long as the
/// player is a member.
pub struct Player {
    /// Wire-level entity id, stable across dimension changes.
    pub entity_id: i32,
    pub identity: Identity,
    pub position: Position,
    pub look: Look,
    pub on_ground: bool,
    pub render_distance: i32,
    /// Home chunk as of the last `update_chunk` (or join).
    pub chunk: ChunkPos,
    /// View volume around `chunk`.
    pub view: ViewVolume,
    pub mailboxes: Mailboxes,
}

impl Player {
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            entity_id: self.entity_id,
            identity: self.identity.clone(),
            position: self.position,
            look: self.look,
            render_distance: self.render_distance,
            chunk: self.chunk,
        }
    }
}

/// Copy of a player's public state, for queries outside the world lock.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSnapshot {
    pub entity_id: i32,
    pub identity: Identity,
    pub position: Position,
    pub look: Look,
    pub render_distance: i32,
    pub chunk: ChunkPos,
}
