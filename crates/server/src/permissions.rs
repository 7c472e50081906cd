//! Ranks and the engine-facing draw policy.
//!
//! Rule definitions stay here in the server; the engine only ever sees the
//! two boolean checks of [`DrawPolicy`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ashlar_engine::draw::{DrawPolicy, Placement};
use ashlar_engine::geometry::BoundingBox;
use ashlar_engine::world::World;
use ashlar_engine::world::block::BlockId;
use ashlar_engine::world::position::BlockPos;

/// A named permission tier, assigned per player at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rank {
    pub name: String,
    /// Largest estimated volume one draw command may cover. 0 = unlimited.
    pub draw_limit: u64,
    /// Cap on per-command undo entries before `too_large_to_undo` sticks.
    pub undo_capacity: usize,
    pub can_build: bool,
    /// Build inside protected areas.
    pub bypass_protection: bool,
}

impl Rank {
    pub fn guest() -> Self {
        Self {
            name: "guest".into(),
            draw_limit: 32_768,
            undo_capacity: 32_768,
            can_build: true,
            bypass_protection: false,
        }
    }

    pub fn builder() -> Self {
        Self {
            name: "builder".into(),
            draw_limit: 2_000_000,
            undo_capacity: 2_000_000,
            can_build: true,
            bypass_protection: false,
        }
    }

    pub fn op() -> Self {
        Self {
            name: "op".into(),
            draw_limit: 0,
            undo_capacity: 8_000_000,
            can_build: true,
            bypass_protection: true,
        }
    }
}

/// Per-session policy handed to the engine: the player's rank plus the
/// world's protected areas.
pub struct RankPolicy {
    rank: Rank,
    protected: Arc<Vec<BoundingBox>>,
}

impl RankPolicy {
    pub fn new(rank: Rank, protected: Arc<Vec<BoundingBox>>) -> Self {
        Self { rank, protected }
    }

    pub fn rank(&self) -> &Rank {
        &self.rank
    }
}

impl DrawPolicy for RankPolicy {
    fn can_place(&self, _world: &World, pos: BlockPos, _block: BlockId) -> Placement {
        if !self.rank.can_build {
            return Placement::Denied;
        }
        if !self.rank.bypass_protection && self.protected.iter().any(|area| area.contains(pos)) {
            return Placement::Denied;
        }
        Placement::Allowed
    }

    fn can_draw(&self, estimate: u64) -> bool {
        self.rank.draw_limit == 0 || estimate <= self.rank.draw_limit
    }
}
