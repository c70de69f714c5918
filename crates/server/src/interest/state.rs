//! Owned interest-management state for one world.
//!
//! Every mutation runs against `&mut InterestState`, so the lock boundary is
//! the `World` that wraps it. Operations never touch mailboxes directly:
//! they queue [`Delivery`]s in the outbox, which the caller flushes while it
//! still holds the lock.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use indexmap::IndexSet;
use slotmap::{SlotMap, new_key_type};
use voxstream_engine::view::{self, ViewError, ViewVolume};
use voxstream_engine::world::chunk::ChunkColumn;
use voxstream_engine::world::position::ChunkPos;

use crate::generator::ChunkGenerator;
use crate::mailbox::{
    ChunkLoad, ChunkUnload, DespawnEntity, EntityLook, EntityRelativeMove, Mailboxes, Outbound,
    SpawnEntity,
};
use crate::player::{Identity, Look, Player, PlayerSnapshot, Position};
use crate::universe::Dimension;

new_key_type! {
    /// Arena handle of a player inside one world.
    pub struct PlayerId;
}

/// An event queued for one player's mailbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: PlayerId,
    pub event: Outbound,
}

/// Counts of what one `update_chunk` changed, for logging and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkChange {
    pub loaded: usize,
    pub unloaded: usize,
    pub linked: usize,
    pub unlinked: usize,
}

pub struct InterestState {
    dimension: Dimension,
    spawn: Position,
    generator: Box<dyn ChunkGenerator>,
    chunks: HashMap<ChunkPos, ChunkColumn>,
    players_by_chunk: HashMap<ChunkPos, IndexSet<PlayerId>>,
    /// Symmetric: `b ∈ visibility[a]` iff `a ∈ visibility[b]`.
    visibility: HashMap<PlayerId, IndexSet<PlayerId>>,
    players: SlotMap<PlayerId, Player>,
    outbox: Vec<Delivery>,
    encoded_bytes: u64,
}

impl InterestState {
    pub fn new(dimension: Dimension, spawn: Position, generator: Box<dyn ChunkGenerator>) -> Self {
        Self {
            dimension,
            spawn,
            generator,
            chunks: HashMap::new(),
            players_by_chunk: HashMap::new(),
            visibility: HashMap::new(),
            players: SlotMap::with_key(),
            outbox: Vec::new(),
            encoded_bytes: 0,
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Take everything queued since the last call.
    pub fn drain_outbox(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.outbox)
    }

    /// Bytes of chunk payload encoded since the last call.
    pub fn take_encoded_bytes(&mut self) -> u64 {
        std::mem::take(&mut self.encoded_bytes)
    }

    pub fn mailboxes(&self, id: PlayerId) -> Option<&Mailboxes> {
        self.players.get(id).map(|p| &p.mailboxes)
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    /// Unknown ids are a caller bug: the session layer only calls in between
    /// a successful join and the matching close.
    fn player(&self, id: PlayerId) -> &Player {
        match self.players.get(id) {
            Some(player) => player,
            None => panic!("operation on unknown player {id:?}"),
        }
    }

    fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        match self.players.get_mut(id) {
            Some(player) => player,
            None => panic!("operation on unknown player {id:?}"),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn column_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn column(&self, pos: ChunkPos) -> Option<&ChunkColumn> {
        self.chunks.get(&pos)
    }

    pub fn snapshot(&self, id: PlayerId) -> Option<PlayerSnapshot> {
        self.players.get(id).map(Player::snapshot)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().collect()
    }

    pub fn players_in(&self, pos: ChunkPos) -> Vec<PlayerId> {
        self.players_by_chunk
            .get(&pos)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn visible_to(&self, id: PlayerId) -> Vec<PlayerId> {
        self.visibility
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether `id` appears anywhere in the membership or visibility maps.
    pub fn is_referenced(&self, id: PlayerId) -> bool {
        self.players.contains_key(id)
            || self.visibility.contains_key(&id)
            || self.visibility.values().any(|set| set.contains(&id))
            || self.players_by_chunk.values().any(|bucket| bucket.contains(&id))
    }

    // ── Edges and columns ───────────────────────────────────────────────

    fn push(&mut self, to: PlayerId, event: Outbound) {
        self.outbox.push(Delivery { to, event });
    }

    fn spawn_event(&self, id: PlayerId) -> Outbound {
        let p = self.player(id);
        Outbound::Spawn(SpawnEntity {
            entity_id: p.entity_id,
            uuid: p.identity.uuid,
            name: p.identity.name.clone(),
            x: p.position.x,
            y: p.position.y,
            z: p.position.z,
            yaw: p.look.yaw,
            pitch: p.look.pitch,
        })
    }

    fn despawn_event(&self, id: PlayerId) -> Outbound {
        Outbound::Despawn(DespawnEntity {
            entity_id: self.player(id).entity_id,
        })
    }

    /// Add the edge `a <-> b` and exchange spawns if it was not there yet.
    fn link(&mut self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return false;
        }
        let added = self.visibility.entry(a).or_default().insert(b);
        self.visibility.entry(b).or_default().insert(a);
        if added {
            let (spawn_a, spawn_b) = (self.spawn_event(a), self.spawn_event(b));
            self.push(a, spawn_b);
            self.push(b, spawn_a);
        }
        added
    }

    /// Remove the edge `a <-> b` and exchange despawns if it existed.
    fn unlink(&mut self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return false;
        }
        let removed = self
            .visibility
            .get_mut(&a)
            .is_some_and(|set| set.shift_remove(&b));
        if let Some(set) = self.visibility.get_mut(&b) {
            set.shift_remove(&a);
        }
        if removed {
            let (despawn_a, despawn_b) = (self.despawn_event(a), self.despawn_event(b));
            self.push(a, despawn_b);
            self.push(b, despawn_a);
        }
        removed
    }

    /// Create the column at `pos` if needed, then queue a full load for `viewer`.
    fn load_column(&mut self, viewer: PlayerId, pos: ChunkPos) {
        let column = match self.chunks.entry(pos) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let mut column = ChunkColumn::new();
                self.generator.generate(pos, &mut column);
                tracing::trace!("Generated column ({}, {}) with {}", pos.x, pos.z, self.generator.name());
                e.insert(column)
            }
        };
        let (bitmask, data) = column.encode(true, self.dimension.is_overworld());
        self.encoded_bytes += data.len() as u64;
        tracing::trace!("Load ({}, {}) -> {:?}: {} bytes", pos.x, pos.z, viewer, data.len());
        self.push(
            viewer,
            Outbound::ChunkLoad(ChunkLoad {
                x: pos.x,
                z: pos.z,
                full: true,
                bitmask,
                data,
            }),
        );
    }

    fn unload_column(&mut self, viewer: PlayerId, pos: ChunkPos) {
        tracing::trace!("Unload ({}, {}) -> {:?}", pos.x, pos.z, viewer);
        self.push(viewer, Outbound::ChunkUnload(ChunkUnload { x: pos.x, z: pos.z }));
    }

    fn leave_bucket(&mut self, id: PlayerId, pos: ChunkPos) {
        if let Some(bucket) = self.players_by_chunk.get_mut(&pos) {
            bucket.shift_remove(&id);
            if bucket.is_empty() {
                self.players_by_chunk.remove(&pos);
            }
        }
    }

    // ── Membership ──────────────────────────────────────────────────────

    /// Add a player at the spawn point, load its whole view, and exchange
    /// spawns with everyone already registered inside that view.
    pub fn join(
        &mut self,
        entity_id: i32,
        identity: Identity,
        render_distance: i32,
        mailboxes: Mailboxes,
    ) -> Result<PlayerId, ViewError> {
        let position = self.spawn;
        let view = ViewVolume::around_player(position.x, position.z, render_distance)?;
        let chunk = position.chunk();

        let id = self.players.insert(Player {
            entity_id,
            identity,
            position,
            look: Look::default(),
            on_ground: false,
            render_distance,
            chunk,
            view,
            mailboxes,
        });
        self.visibility.insert(id, IndexSet::new());

        for column in view.columns() {
            let pos = ChunkPos::new(column.x, column.z);
            self.load_column(id, pos);
            for other in self.players_in(pos) {
                self.link(id, other);
            }
        }
        self.players_by_chunk.entry(chunk).or_default().insert(id);

        Ok(id)
    }

    /// Record a new position and broadcast the relative move to every
    /// player that can see the mover. Returns true when the home chunk
    /// changed and [`update_chunk`](Self::update_chunk) is due.
    pub fn update_position(&mut self, id: PlayerId, x: f64, y: f64, z: f64, on_ground: bool) -> bool {
        let player = self.player_mut(id);
        let old = player.position;
        player.position = Position::new(x, y, z);
        player.on_ground = on_ground;
        let event = Outbound::RelativeMove(EntityRelativeMove {
            entity_id: player.entity_id,
            dx: x - old.x,
            dy: y - old.y,
            dz: z - old.z,
            on_ground,
        });
        let chunk_changed = player.position.chunk() != player.chunk;

        for other in self.visible_to(id) {
            self.push(other, event.clone());
        }
        chunk_changed
    }

    pub fn update_look(&mut self, id: PlayerId, yaw: f32, pitch: f32) {
        let player = self.player_mut(id);
        player.look = Look { yaw, pitch };
        let event = Outbound::Look(EntityLook {
            entity_id: player.entity_id,
            yaw,
            pitch,
        });
        for other in self.visible_to(id) {
            self.push(other, event.clone());
        }
    }

    /// Re-center the player's view on its current chunk: load and link what
    /// came into view, unload and unlink what left it, and move the player
    /// to its new chunk bucket. Shared columns are untouched.
    pub fn update_chunk(&mut self, id: PlayerId) -> ChunkChange {
        let player = self.player(id);
        let old_chunk = player.chunk;
        let new_chunk = player.position.chunk();
        if new_chunk == old_chunk {
            return ChunkChange::default();
        }

        let old_view = player.view;
        let new_view = old_view.translated(new_chunk.x - old_chunk.x, new_chunk.z - old_chunk.z);
        let delta = match view::diff(&new_view, &old_view) {
            Ok(delta) => delta,
            Err(e) => {
                tracing::warn!("Skipping chunk update for {:?}: {}", id, e);
                return ChunkChange::default();
            }
        };

        let mut change = ChunkChange::default();
        for column in &delta.only_a {
            let pos = ChunkPos::new(column.x, column.z);
            self.load_column(id, pos);
            change.loaded += 1;
            for other in self.players_in(pos) {
                if self.link(id, other) {
                    change.linked += 1;
                }
            }
        }
        for column in &delta.only_b {
            let pos = ChunkPos::new(column.x, column.z);
            self.unload_column(id, pos);
            change.unloaded += 1;
            for other in self.players_in(pos) {
                if self.unlink(id, other) {
                    change.unlinked += 1;
                }
            }
        }

        self.leave_bucket(id, old_chunk);
        self.players_by_chunk.entry(new_chunk).or_default().insert(id);
        let player = self.player_mut(id);
        player.chunk = new_chunk;
        player.view = new_view;

        change
    }

    /// Remove the player: despawn it for everyone who could see it, drop it
    /// from every map, and hand its mailboxes back.
    pub fn close(&mut self, id: PlayerId) -> Mailboxes {
        let despawn = self.despawn_event(id);
        let watchers = self.visibility.remove(&id).unwrap_or_default();
        for other in watchers {
            if let Some(set) = self.visibility.get_mut(&other) {
                set.shift_remove(&id);
            }
            self.push(other, despawn.clone());
        }

        let chunk = self.player(id).chunk;
        self.leave_bucket(id, chunk);
        // Drop anything still queued for the departing player.
        self.outbox.retain(|d| d.to != id);

        match self.players.remove(id) {
            Some(player) => player.mailboxes,
            None => panic!("operation on unknown player {id:?}"),
        }
    }

    /// Check the structural invariants: symmetric edges, every member in
    /// exactly its recorded bucket, no references to departed players.
    pub fn verify(&self) -> anyhow::Result<()> {
        for (a, set) in &self.visibility {
            anyhow::ensure!(self.players.contains_key(*a), "visibility key {a:?} is not a member");
            for b in set {
                anyhow::ensure!(a != b, "{a:?} sees itself");
                anyhow::ensure!(
                    self.visibility.get(b).is_some_and(|s| s.contains(a)),
                    "edge {a:?} -> {b:?} is not symmetric"
                );
            }
        }
        for (pos, bucket) in &self.players_by_chunk {
            anyhow::ensure!(!bucket.is_empty(), "empty bucket left at {pos:?}");
            for id in bucket {
                let player = self
                    .players
                    .get(*id)
                    .ok_or_else(|| anyhow::anyhow!("bucket {pos:?} holds departed {id:?}"))?;
                anyhow::ensure!(player.chunk == *pos, "{id:?} is filed under {pos:?} but lives in {:?}", player.chunk);
            }
        }
        for (id, player) in &self.players {
            anyhow::ensure!(
                self.players_by_chunk.get(&player.chunk).is_some_and(|b| b.contains(&id)),
                "{id:?} missing from bucket {:?}",
                player.chunk
            );
            anyhow::ensure!(self.visibility.contains_key(&id), "{id:?} has no visibility entry");
        }
        Ok(())
    }
}
