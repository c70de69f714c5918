//! Per-player outbound mailboxes: one bounded channel per event kind.
//!
//! The world pushes into these while holding its lock, so a full mailbox
//! stalls the producer until the session's write loop drains it. Order is
//! FIFO within one channel; there is no ordering across channels or across
//! players.

use tokio::sync::mpsc;
use uuid::Uuid;

/// Render distance cap that [`DEFAULT_CAPACITY`] is sized for.
pub const DEFAULT_MAX_RENDER_DISTANCE: i32 = 32;

/// Default per-channel capacity: a whole join at the default render-distance
/// cap fits without the session draining concurrently.
pub const DEFAULT_CAPACITY: usize = view_columns(DEFAULT_MAX_RENDER_DISTANCE);

/// Chunk loads a single join pushes to one player: `(2r + 1)^2`.
pub const fn view_columns(render_distance: i32) -> usize {
    if render_distance < 0 {
        return 0;
    }
    let side = 2 * render_distance as usize + 1;
    side * side
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkLoad {
    pub x: i32,
    pub z: i32,
    /// Payload carries the biome grid (ground-up load).
    pub full: bool,
    pub bitmask: u16,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkUnload {
    pub x: i32,
    pub z: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpawnEntity {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DespawnEntity {
    pub entity_id: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityLook {
    pub entity_id: i32,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityRelativeMove {
    pub entity_id: i32,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub on_ground: bool,
}

impl EntityRelativeMove {
    /// Largest per-axis delta the fixed-point encoding can carry.
    pub const MAX_DELTA: f64 = 8.0;

    /// Protocol fixed-point delta: `(new * 32 - old * 32) * 128`.
    pub fn fixed_point(&self) -> (i16, i16, i16) {
        let fp = |d: f64| (d * 32.0 * 128.0) as i16;
        (fp(self.dx), fp(self.dy), fp(self.dz))
    }

    /// False when the move is too large for a relative update and the
    /// session should teleport the entity instead.
    pub fn fits_relative(&self) -> bool {
        [self.dx, self.dy, self.dz]
            .iter()
            .all(|d| d.abs() < Self::MAX_DELTA)
    }
}

/// One event addressed to one player's mailbox.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    ChunkLoad(ChunkLoad),
    ChunkUnload(ChunkUnload),
    Spawn(SpawnEntity),
    Despawn(DespawnEntity),
    Look(EntityLook),
    RelativeMove(EntityRelativeMove),
}

/// The receiving side's channel has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxClosed;

/// Sending halves, registered with the world at join.
#[derive(Clone, Debug)]
pub struct Mailboxes {
    pub chunk_load: mpsc::Sender<ChunkLoad>,
    pub chunk_unload: mpsc::Sender<ChunkUnload>,
    pub spawn: mpsc::Sender<SpawnEntity>,
    pub despawn: mpsc::Sender<DespawnEntity>,
    pub look: mpsc::Sender<EntityLook>,
    pub relative_move: mpsc::Sender<EntityRelativeMove>,
}

/// Receiving halves, held by the session's write loop.
#[derive(Debug)]
pub struct MailboxReceivers {
    pub chunk_load: mpsc::Receiver<ChunkLoad>,
    pub chunk_unload: mpsc::Receiver<ChunkUnload>,
    pub spawn: mpsc::Receiver<SpawnEntity>,
    pub despawn: mpsc::Receiver<DespawnEntity>,
    pub look: mpsc::Receiver<EntityLook>,
    pub relative_move: mpsc::Receiver<EntityRelativeMove>,
}

/// Create a set of bounded mailboxes, `capacity` slots per event kind.
pub fn bounded(capacity: usize) -> (Mailboxes, MailboxReceivers) {
    let (chunk_load, chunk_load_rx) = mpsc::channel(capacity);
    let (chunk_unload, chunk_unload_rx) = mpsc::channel(capacity);
    let (spawn, spawn_rx) = mpsc::channel(capacity);
    let (despawn, despawn_rx) = mpsc::channel(capacity);
    let (look, look_rx) = mpsc::channel(capacity);
    let (relative_move, relative_move_rx) = mpsc::channel(capacity);
    (
        Mailboxes {
            chunk_load,
            chunk_unload,
            spawn,
            despawn,
            look,
            relative_move,
        },
        MailboxReceivers {
            chunk_load: chunk_load_rx,
            chunk_unload: chunk_unload_rx,
            spawn: spawn_rx,
            despawn: despawn_rx,
            look: look_rx,
            relative_move: relative_move_rx,
        },
    )
}

impl Mailboxes {
    /// Push `event` onto the matching channel, waiting for capacity.
    pub async fn deliver(&self, event: Outbound) -> Result<(), MailboxClosed> {
        let sent = match event {
            Outbound::ChunkLoad(e) => self.chunk_load.send(e).await.is_ok(),
            Outbound::ChunkUnload(e) => self.chunk_unload.send(e).await.is_ok(),
            Outbound::Spawn(e) => self.spawn.send(e).await.is_ok(),
            Outbound::Despawn(e) => self.despawn.send(e).await.is_ok(),
            Outbound::Look(e) => self.look.send(e).await.is_ok(),
            Outbound::RelativeMove(e) => self.relative_move.send(e).await.is_ok(),
        };
        if sent { Ok(()) } else { Err(MailboxClosed) }
    }

    /// True once the session has dropped its receivers.
    pub fn is_closed(&self) -> bool {
        self.chunk_load.is_closed()
    }
}
