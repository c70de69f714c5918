//! Interest management: who sees which columns and which other players.
//!
//! A [`World`] serializes every mutation behind one write lock. Events a
//! mutation produces are delivered to the affected mailboxes before the lock
//! is released, so each player observes events in the order the world
//! applied them.

pub mod state;

pub use state::{ChunkChange, Delivery, InterestState, PlayerId};

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use voxstream_engine::view::ViewError;
use voxstream_engine::world::position::ChunkPos;

use crate::dashboard::Metrics;
use crate::generator::ChunkGenerator;
use crate::mailbox::Mailboxes;
use crate::player::{Identity, PlayerSnapshot, Position};
use crate::universe::Dimension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// The requested render distance does not describe a valid view.
    InvalidView(ViewError),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::InvalidView(e) => write!(f, "cannot join: {}", e),
        }
    }
}

impl std::error::Error for JoinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JoinError::InvalidView(e) => Some(e),
        }
    }
}

impl From<ViewError> for JoinError {
    fn from(e: ViewError) -> Self {
        JoinError::InvalidView(e)
    }
}

/// One dimension's live players and columns.
pub struct World {
    state: RwLock<InterestState>,
    max_render_distance: i32,
    metrics: Arc<Metrics>,
}

impl World {
    pub fn new(
        dimension: Dimension,
        spawn: Position,
        generator: Box<dyn ChunkGenerator>,
        max_render_distance: i32,
        metrics: Arc<Metrics>,
    ) -> Self {
        tracing::debug!("World {:?} using {} generator", dimension, generator.name());
        Self {
            state: RwLock::new(InterestState::new(dimension, spawn, generator)),
            max_render_distance,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Register a player at the spawn point. Negative render distances are
    /// rejected with no state change; larger ones are capped at the
    /// configured maximum.
    pub async fn join(
        &self,
        entity_id: i32,
        identity: Identity,
        render_distance: i32,
        mailboxes: Mailboxes,
    ) -> Result<PlayerId, JoinError> {
        let render_distance = render_distance.min(self.max_render_distance);
        let mut state = self.state.write().await;
        let name = identity.name.clone();
        let id = state.join(entity_id, identity, render_distance, mailboxes)?;
        self.flush(&mut state).await;
        self.metrics.player_joined();
        tracing::info!(
            "{} joined {:?} as {:?} (entity {}, render distance {})",
            name,
            state.dimension(),
            id,
            entity_id,
            render_distance
        );
        Ok(id)
    }

    /// Returns true when the player crossed into another chunk; the caller
    /// then follows up with [`update_chunk`](Self::update_chunk).
    pub async fn update_position(&self, id: PlayerId, x: f64, y: f64, z: f64, on_ground: bool) -> bool {
        let mut state = self.state.write().await;
        let crossed = state.update_position(id, x, y, z, on_ground);
        self.flush(&mut state).await;
        crossed
    }

    pub async fn update_look(&self, id: PlayerId, yaw: f32, pitch: f32) {
        let mut state = self.state.write().await;
        state.update_look(id, yaw, pitch);
        self.flush(&mut state).await;
    }

    /// Position and look in one step, as sent by a combined movement packet.
    pub async fn update_position_and_look(
        &self,
        id: PlayerId,
        (x, y, z): (f64, f64, f64),
        (yaw, pitch): (f32, f32),
        on_ground: bool,
    ) -> bool {
        let mut state = self.state.write().await;
        let crossed = state.update_position(id, x, y, z, on_ground);
        state.update_look(id, yaw, pitch);
        self.flush(&mut state).await;
        crossed
    }

    pub async fn update_chunk(&self, id: PlayerId) -> ChunkChange {
        let started = Instant::now();
        let mut state = self.state.write().await;
        let change = state.update_chunk(id);
        self.flush(&mut state).await;
        drop(state);
        if change != ChunkChange::default() {
            self.metrics.record_chunk_update(started.elapsed());
            tracing::debug!(
                "{:?} re-centered: +{} -{} columns, +{} -{} players",
                id,
                change.loaded,
                change.unloaded,
                change.linked,
                change.unlinked
            );
        }
        change
    }

    /// Remove the player and return its mailboxes, still open.
    pub async fn close(&self, id: PlayerId) -> Mailboxes {
        let mut state = self.state.write().await;
        let mailboxes = state.close(id);
        self.flush(&mut state).await;
        self.metrics.player_left();
        tracing::info!("{:?} left {:?}", id, state.dimension());
        mailboxes
    }

    /// Deliver everything the last mutation queued, in order. A closed
    /// mailbox means the session is already gone; its events are dropped.
    async fn flush(&self, state: &mut InterestState) {
        let bytes = state.take_encoded_bytes();
        if bytes > 0 {
            self.metrics.record_chunk_bytes(bytes);
        }
        for Delivery { to, event } in state.drain_outbox() {
            let Some(mailboxes) = state.mailboxes(to) else {
                continue;
            };
            self.metrics.record_outbound(&event);
            if mailboxes.deliver(event).await.is_err() {
                self.metrics.record_dropped();
                tracing::debug!("Mailbox of {:?} is closed, dropping event", to);
            }
        }
    }

    // ── Read-only queries ───────────────────────────────────────────────

    pub async fn dimension(&self) -> Dimension {
        self.state.read().await.dimension()
    }

    pub async fn player_count(&self) -> usize {
        self.state.read().await.player_count()
    }

    pub async fn column_count(&self) -> usize {
        self.state.read().await.column_count()
    }

    pub async fn visible_to(&self, id: PlayerId) -> Vec<PlayerId> {
        self.state.read().await.visible_to(id)
    }

    pub async fn players_in(&self, pos: ChunkPos) -> Vec<PlayerId> {
        self.state.read().await.players_in(pos)
    }

    pub async fn snapshot_player(&self, id: PlayerId) -> Option<PlayerSnapshot> {
        self.state.read().await.snapshot(id)
    }

    pub async fn player_ids(&self) -> Vec<PlayerId> {
        self.state.read().await.player_ids()
    }

    pub async fn is_referenced(&self, id: PlayerId) -> bool {
        self.state.read().await.is_referenced(id)
    }

    /// Check the structural invariants of the membership and visibility maps.
    pub async fn verify(&self) -> anyhow::Result<()> {
        self.state.read().await.verify()
    }
}
