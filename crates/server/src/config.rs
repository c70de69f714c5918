//! Server configuration: defaults, an optional JSON file, then CLI flags.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use voxstream_engine::world::block::BlockRegistry;

use crate::generator::FlatGenerator;
use crate::mailbox::{self, DEFAULT_CAPACITY, DEFAULT_MAX_RENDER_DISTANCE};
use crate::player::Position;
use crate::universe::Dimension;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Where players appear on join, in world coordinates.
    pub spawn: [f64; 3],
    /// Render distance requested by bots and assumed for new sessions.
    pub render_distance: i32,
    /// Upper bound applied to every join.
    pub max_render_distance: i32,
    /// Slots per event kind in each player's mailboxes.
    pub mailbox_capacity: usize,
    /// Dimension new sessions join.
    pub dimension: Dimension,
    pub dashboard_port: u16,
    pub bots: BotConfig,
    /// Overworld terrain, bottom layer first.
    pub flat_layers: Vec<LayerConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub count: usize,
    /// Movement updates each bot sends before leaving.
    pub steps: u32,
    pub step_interval_ms: u64,
    /// Blocks walked per step.
    pub speed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Catalog name, e.g. `"stone"`.
    pub block: String,
    pub height: u32,
}

impl LayerConfig {
    fn new(block: &str, height: u32) -> Self {
        Self {
            block: block.to_string(),
            height,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            spawn: [0.5, 7.0, 0.5],
            render_distance: 8,
            max_render_distance: DEFAULT_MAX_RENDER_DISTANCE,
            mailbox_capacity: DEFAULT_CAPACITY,
            dimension: Dimension::Overworld,
            dashboard_port: 8000,
            bots: BotConfig::default(),
            flat_layers: vec![
                LayerConfig::new("bedrock", 1),
                LayerConfig::new("stone", 3),
                LayerConfig::new("dirt", 2),
                LayerConfig::new("grass", 1),
            ],
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: 4,
            steps: 400,
            step_interval_ms: 50,
            speed: 0.6,
        }
    }
}

impl ServerConfig {
    /// Defaults, overlaid with the JSON file at `path` if one is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `--bots`, `--dashboard-port`, `--render-distance` and
    /// `--dimension` overrides from the command line.
    pub fn apply_args(&mut self, args: &[String]) -> anyhow::Result<()> {
        let flag = |name: &str| args.iter().skip_while(|a| *a != name).nth(1).cloned();

        if let Some(v) = flag("--bots") {
            self.bots.count = v.parse().with_context(|| format!("invalid --bots {v:?}"))?;
        }
        if let Some(v) = flag("--dashboard-port") {
            self.dashboard_port = v
                .parse()
                .with_context(|| format!("invalid --dashboard-port {v:?}"))?;
        }
        if let Some(v) = flag("--render-distance") {
            self.render_distance = v
                .parse()
                .with_context(|| format!("invalid --render-distance {v:?}"))?;
        }
        if let Some(v) = flag("--dimension") {
            self.dimension =
                Dimension::parse(&v).with_context(|| format!("unknown dimension {v:?}"))?;
        }
        Ok(())
    }

    /// Reject settings under which a join could fill a mailbox before its
    /// session starts draining, stalling the world lock.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.max_render_distance >= 0,
            "max_render_distance must be non-negative, got {}",
            self.max_render_distance
        );
        anyhow::ensure!(self.mailbox_capacity > 0, "mailbox_capacity must be positive");
        let needed = mailbox::view_columns(self.max_render_distance);
        anyhow::ensure!(
            self.mailbox_capacity >= needed,
            "mailbox_capacity {} cannot hold a join at max_render_distance {} ({} columns)",
            self.mailbox_capacity,
            self.max_render_distance,
            needed
        );
        Ok(())
    }

    pub fn spawn_position(&self) -> Position {
        let [x, y, z] = self.spawn;
        Position::new(x, y, z)
    }

    /// Build the overworld generator from `flat_layers`.
    pub fn flat_generator(&self) -> anyhow::Result<FlatGenerator> {
        if self.flat_layers.is_empty() {
            return Ok(FlatGenerator::classic());
        }
        let registry = BlockRegistry::vanilla();
        let mut layers = Vec::new();
        for layer in &self.flat_layers {
            let block = registry
                .by_name(&layer.block)
                .with_context(|| format!("unknown block {:?} in flat_layers", layer.block))?;
            layers.extend(std::iter::repeat_n(block, layer.height as usize));
        }
        Ok(FlatGenerator::new(layers, voxstream_engine::world::chunk::DEFAULT_BIOME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cli_overrides_defaults() {
        let mut config = ServerConfig::default();
        config
            .apply_args(&args(&["voxstream", "--bots", "12", "--dimension", "nether"]))
            .unwrap();
        assert_eq!(config.bots.count, 12);
        assert_eq!(config.dimension, Dimension::Nether);
        assert_eq!(config.dashboard_port, 8000);
    }

    #[test]
    fn bad_flag_value_is_an_error() {
        let mut config = ServerConfig::default();
        assert!(config.apply_args(&args(&["--render-distance", "far"])).is_err());
        assert!(config.apply_args(&args(&["--dimension", "moon"])).is_err());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "render_distance": 3, "bots": { "count": 1 } }"#).unwrap();
        assert_eq!(config.render_distance, 3);
        assert_eq!(config.bots.count, 1);
        assert_eq!(config.bots.steps, BotConfig::default().steps);
        assert_eq!(config.mailbox_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn defaults_are_consistent() {
        ServerConfig::default().validate().unwrap();
    }

    #[test]
    fn capacity_smaller_than_a_full_join_is_rejected() {
        let config = ServerConfig {
            max_render_distance: 32,
            mailbox_capacity: 2048,
            ..ServerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("4225 columns"), "{err}");

        let fits = ServerConfig {
            max_render_distance: 22,
            mailbox_capacity: 2048,
            ..ServerConfig::default()
        };
        fits.validate().unwrap();
    }

    #[test]
    fn default_layers_match_classic_generator() {
        let generator = ServerConfig::default().flat_generator().unwrap();
        assert_eq!(generator.surface_height(), FlatGenerator::classic().surface_height());
    }

    #[test]
    fn unknown_layer_block_is_rejected() {
        let config = ServerConfig {
            flat_layers: vec![LayerConfig::new("cheese", 2)],
            ..ServerConfig::default()
        };
        assert!(config.flat_generator().is_err());
    }
}
