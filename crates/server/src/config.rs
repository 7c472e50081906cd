//! Server configuration: a JSON file with every field defaulted, so a
//! missing or partial file still boots a sensible server.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use ashlar_engine::geometry::BoundingBox;
use ashlar_engine::world::position::BlockPos;

use crate::permissions::Rank;

/// An axis-aligned box no one below bypass rank may build in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedArea {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl ProtectedArea {
    pub fn to_bounds(&self) -> BoundingBox {
        BoundingBox::from_corners(
            BlockPos::new(self.min[0], self.min[1], self.min[2]),
            BlockPos::new(self.max[0], self.max[1], self.max[2]),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub world_name: String,
    /// Radius of the flat bootstrap world, in chunks.
    pub world_radius_chunks: i32,
    /// Server-wide BlockDB switch; the per-world switch lives next to it for
    /// the day multiple worlds exist.
    pub blockdb_enabled: bool,
    pub world_blockdb_enabled: bool,
    /// Per-operation ceilings for one tick's batch.
    pub batch_max_blocks: u32,
    pub batch_time_slice_ms: u64,
    pub tick_interval_ms: u64,
    /// Half-extent of the box that clamps flood fills around their seed.
    pub fill_max_extent: i32,
    /// How long a bulk-undo confirmation stays valid.
    pub confirmation_timeout_secs: u64,
    /// How many finished commands a session keeps for `/undo`.
    pub undo_history_depth: usize,
    pub default_rank: String,
    /// Players who log in as op rank.
    pub operators: Vec<String>,
    pub ranks: Vec<Rank>,
    pub protected: Vec<ProtectedArea>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:2555".into(),
            world_name: "main".into(),
            world_radius_chunks: 4,
            blockdb_enabled: true,
            world_blockdb_enabled: true,
            batch_max_blocks: 20_000,
            batch_time_slice_ms: 15,
            tick_interval_ms: 50,
            fill_max_extent: 32,
            confirmation_timeout_secs: 30,
            undo_history_depth: 8,
            default_rank: "builder".into(),
            operators: Vec::new(),
            ranks: vec![Rank::guest(), Rank::builder(), Rank::op()],
            protected: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load from `path` if given (hard error when unreadable), else from
    /// `ashlar.json` if present, else defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p,
            None => {
                let fallback = Path::new("ashlar.json");
                if !fallback.exists() {
                    tracing::info!("No config file, using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ServerConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        tracing::info!(config = %path.display(), "Config loaded");
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.batch_max_blocks > 0, "batch_max_blocks must be positive");
        anyhow::ensure!(self.tick_interval_ms > 0, "tick_interval_ms must be positive");
        anyhow::ensure!(self.fill_max_extent > 0, "fill_max_extent must be positive");
        anyhow::ensure!(!self.ranks.is_empty(), "at least one rank is required");
        anyhow::ensure!(
            self.ranks.iter().any(|r| r.name == self.default_rank),
            "default_rank {:?} is not defined",
            self.default_rank
        );
        Ok(())
    }

    /// Rank to assign a player at login.
    pub fn rank_for(&self, player_name: &str) -> Rank {
        let wanted = if self
            .operators
            .iter()
            .any(|op| op.eq_ignore_ascii_case(player_name))
        {
            "op"
        } else {
            self.default_rank.as_str()
        };
        self.ranks
            .iter()
            .find(|r| r.name == wanted)
            .or_else(|| self.ranks.iter().find(|r| r.name == self.default_rank))
            .or_else(|| self.ranks.first())
            .cloned()
            .unwrap_or_else(Rank::guest)
    }

    pub fn protected_bounds(&self) -> Vec<BoundingBox> {
        self.protected.iter().map(ProtectedArea::to_bounds).collect()
    }
}
