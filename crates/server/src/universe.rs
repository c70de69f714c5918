//! The set of worlds a server hosts, one per dimension.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::dashboard::Metrics;
use crate::generator::{ChunkGenerator, FlatGenerator};
use crate::interest::{JoinError, PlayerId, World};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    #[default]
    Overworld,
    Nether,
    End,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Overworld, Dimension::Nether, Dimension::End];

    /// Only the overworld has a sky, so only it carries sky light.
    pub fn is_overworld(self) -> bool {
        self == Dimension::Overworld
    }

    /// Protocol dimension id.
    pub fn id(self) -> i32 {
        match self {
            Dimension::Nether => -1,
            Dimension::Overworld => 0,
            Dimension::End => 1,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "overworld" => Some(Dimension::Overworld),
            "nether" => Some(Dimension::Nether),
            "end" => Some(Dimension::End),
            _ => None,
        }
    }
}

/// All hosted worlds plus the server-wide entity id counter.
pub struct Universe {
    worlds: HashMap<Dimension, Arc<World>>,
    next_entity_id: AtomicI32,
    metrics: Arc<Metrics>,
}

impl Universe {
    pub fn new(config: &ServerConfig, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        config.validate()?;
        let overworld = config.flat_generator()?;
        let mut worlds = HashMap::new();
        for dimension in Dimension::ALL {
            let generator: Box<dyn ChunkGenerator> = match dimension {
                Dimension::Overworld => Box::new(overworld.clone()),
                Dimension::Nether => Box::new(FlatGenerator::nether()),
                Dimension::End => Box::new(FlatGenerator::end()),
            };
            let world = World::new(
                dimension,
                config.spawn_position(),
                generator,
                config.max_render_distance,
                Arc::clone(&metrics),
            );
            worlds.insert(dimension, Arc::new(world));
        }
        Ok(Self {
            worlds,
            next_entity_id: AtomicI32::new(1),
            metrics,
        })
    }

    pub fn world(&self, dimension: Dimension) -> &Arc<World> {
        match self.worlds.get(&dimension) {
            Some(world) => world,
            None => panic!("universe has no world for {dimension:?}"),
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Entity ids are server-wide so a player keeps its id across dimensions.
    pub fn allocate_entity_id(&self) -> i32 {
        self.next_entity_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Move a player between dimensions: close it in `from`, then join `to`
    /// with the same identity, render distance and mailboxes. The player
    /// reappears at the spawn point of the target world.
    pub async fn transfer(
        &self,
        id: PlayerId,
        from: Dimension,
        to: Dimension,
    ) -> Result<PlayerId, JoinError> {
        let source = self.world(from);
        let Some(snapshot) = source.snapshot_player(id).await else {
            panic!("transfer of unknown player {id:?}");
        };
        let mailboxes = source.close(id).await;
        tracing::info!("Moving {} from {:?} to {:?}", snapshot.identity.name, from, to);
        self.world(to)
            .join(
                snapshot.entity_id,
                snapshot.identity,
                snapshot.render_distance,
                mailboxes,
            )
            .await
    }

    /// Sum of players across all worlds.
    pub async fn player_count(&self) -> usize {
        let mut total = 0;
        for world in self.worlds.values() {
            total += world.player_count().await;
        }
        total
    }

    pub async fn column_count(&self) -> usize {
        let mut total = 0;
        for world in self.worlds.values() {
            total += world.column_count().await;
        }
        total
    }
}
