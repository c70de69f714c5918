//! Client-side view of a player's mailboxes, and a scripted bot driver.
//!
//! A [`Session`] drains the six per-kind channels and keeps a model of what
//! the client would have: loaded columns and visible entities. Channels are
//! independent, so the model counts loads against unloads (and spawns
//! against despawns) rather than trusting cross-kind arrival order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use voxstream_engine::world::position::ChunkPos;

use crate::config::ServerConfig;
use crate::mailbox::{self, MailboxReceivers, Outbound};
use crate::player::Identity;
use crate::universe::Universe;

/// Running totals of everything a session received.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub chunk_loads: u64,
    pub chunk_unloads: u64,
    pub spawns: u64,
    pub despawns: u64,
    pub looks: u64,
    pub moves: u64,
    pub chunk_bytes: u64,
}

impl Tally {
    pub fn total(&self) -> u64 {
        self.chunk_loads + self.chunk_unloads + self.spawns + self.despawns + self.looks + self.moves
    }
}

pub struct Session {
    receivers: MailboxReceivers,
    columns: HashMap<ChunkPos, i32>,
    entities: HashMap<i32, i32>,
    tally: Tally,
}

impl Session {
    pub fn new(receivers: MailboxReceivers) -> Self {
        Self {
            receivers,
            columns: HashMap::new(),
            entities: HashMap::new(),
            tally: Tally::default(),
        }
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Columns with more loads than unloads received so far.
    pub fn loaded_columns(&self) -> HashSet<ChunkPos> {
        self.columns
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(pos, _)| *pos)
            .collect()
    }

    /// Entity ids with more spawns than despawns received so far.
    pub fn visible_entities(&self) -> HashSet<i32> {
        self.entities
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn apply(&mut self, event: Outbound) {
        match event {
            Outbound::ChunkLoad(e) => {
                self.tally.chunk_loads += 1;
                self.tally.chunk_bytes += e.data.len() as u64;
                bump(&mut self.columns, ChunkPos::new(e.x, e.z), 1);
            }
            Outbound::ChunkUnload(e) => {
                self.tally.chunk_unloads += 1;
                bump(&mut self.columns, ChunkPos::new(e.x, e.z), -1);
            }
            Outbound::Spawn(e) => {
                self.tally.spawns += 1;
                bump(&mut self.entities, e.entity_id, 1);
            }
            Outbound::Despawn(e) => {
                self.tally.despawns += 1;
                bump(&mut self.entities, e.entity_id, -1);
            }
            Outbound::Look(_) => self.tally.looks += 1,
            Outbound::RelativeMove(_) => self.tally.moves += 1,
        }
    }

    /// Apply everything already queued without waiting. Returns how many
    /// events were consumed.
    pub fn pump(&mut self) -> usize {
        let mut taken = 0;
        while let Some(event) = self.try_next() {
            self.apply(event);
            taken += 1;
        }
        taken
    }

    fn try_next(&mut self) -> Option<Outbound> {
        let rx = &mut self.receivers;
        if let Ok(e) = rx.chunk_load.try_recv() {
            return Some(Outbound::ChunkLoad(e));
        }
        if let Ok(e) = rx.chunk_unload.try_recv() {
            return Some(Outbound::ChunkUnload(e));
        }
        if let Ok(e) = rx.spawn.try_recv() {
            return Some(Outbound::Spawn(e));
        }
        if let Ok(e) = rx.despawn.try_recv() {
            return Some(Outbound::Despawn(e));
        }
        if let Ok(e) = rx.look.try_recv() {
            return Some(Outbound::Look(e));
        }
        if let Ok(e) = rx.relative_move.try_recv() {
            return Some(Outbound::RelativeMove(e));
        }
        None
    }

    /// Wait for the next event on any channel. `None` once every sender
    /// has been dropped and all channels are empty.
    pub async fn recv_one(&mut self) -> Option<Outbound> {
        let rx = &mut self.receivers;
        tokio::select! {
            Some(e) = rx.chunk_load.recv() => Some(Outbound::ChunkLoad(e)),
            Some(e) = rx.chunk_unload.recv() => Some(Outbound::ChunkUnload(e)),
            Some(e) = rx.spawn.recv() => Some(Outbound::Spawn(e)),
            Some(e) = rx.despawn.recv() => Some(Outbound::Despawn(e)),
            Some(e) = rx.look.recv() => Some(Outbound::Look(e)),
            Some(e) = rx.relative_move.recv() => Some(Outbound::RelativeMove(e)),
            else => None,
        }
    }

    /// Drain until the world side hangs up, then hand the session back.
    pub async fn run(mut self) -> Self {
        while let Some(event) = self.recv_one().await {
            self.apply(event);
        }
        self
    }
}

fn bump<K: std::hash::Hash + Eq + Copy>(counts: &mut HashMap<K, i32>, key: K, by: i32) {
    let n = counts.entry(key).or_insert(0);
    *n += by;
    if *n == 0 {
        counts.remove(&key);
    }
}

/// Walk a bot in a straight line away from spawn, then leave.
///
/// Bot `index` heads out at `index / count` of a full turn. Its mailboxes are
/// drained concurrently so the world never blocks on a full channel.
pub async fn run_bot(universe: Arc<Universe>, config: Arc<ServerConfig>, index: usize) -> anyhow::Result<Tally> {
    let name = format!("bot{}", index);
    let entity_id = universe.allocate_entity_id();
    let (mailboxes, receivers) = mailbox::bounded(config.mailbox_capacity);
    let drain = tokio::spawn(Session::new(receivers).run());

    let world = Arc::clone(universe.world(config.dimension));
    let id = world
        .join(entity_id, Identity::offline(&name), config.render_distance, mailboxes)
        .await
        .with_context(|| format!("{} failed to join", name))?;

    let angle = std::f64::consts::TAU * index as f64 / config.bots.count.max(1) as f64;
    let (step_x, step_z) = (angle.cos() * config.bots.speed, angle.sin() * config.bots.speed);
    // Yaw 0 faces +z, increasing clockwise seen from above.
    let yaw = (-step_x.atan2(step_z)).to_degrees() as f32;
    let [mut x, y, mut z] = config.spawn;

    let mut interval = tokio::time::interval(Duration::from_millis(config.bots.step_interval_ms));
    for _ in 0..config.bots.steps {
        interval.tick().await;
        x += step_x;
        z += step_z;
        let crossed = world
            .update_position_and_look(id, (x, y, z), (yaw, 0.0), true)
            .await;
        if crossed {
            world.update_chunk(id).await;
        }
    }

    drop(world.close(id).await);
    let session = drain.await.context("bot session task panicked")?;
    let tally = session.tally();
    tracing::info!(
        "{} done at ({:.1}, {:.1}): {} loads, {} unloads, {} spawns, {} despawns, {} KiB",
        name,
        x,
        z,
        tally.chunk_loads,
        tally.chunk_unloads,
        tally.spawns,
        tally.despawns,
        tally.chunk_bytes / 1024
    );
    Ok(tally)
}
