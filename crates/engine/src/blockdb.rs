//! BlockDB: the per-world, append-only, chronologically ordered log of
//! applied block mutations.
//!
//! Appends happen synchronously on the ticker context, immediately after the
//! grid mutation they record, so the log can never desynchronize from the
//! live grid. Lookups run on worker threads against a snapshot of the log:
//! a lookup started before an append may or may not observe that append,
//! but never observes a partial entry.

use std::collections::HashSet;
use std::ops::BitOr;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rayon::prelude::*;

use crate::PlayerId;
use crate::error::BlockDbError;
use crate::geometry::BoundingBox;
use crate::world::block::BlockId;
use crate::world::position::BlockPos;

/// How a mutation came to be, as a small bitset carried on every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFlags(pub u16);

impl ContextFlags {
    pub const NONE: ContextFlags = ContextFlags(0);
    /// Placed or broken by hand rather than by a draw command.
    pub const MANUAL: ContextFlags = ContextFlags(1 << 0);
    /// Produced by a draw command (cuboid, sphere, line, image, ...).
    pub const DRAWN: ContextFlags = ContextFlags(1 << 1);
    pub const REPLACED: ContextFlags = ContextFlags(1 << 2);
    pub const PASTED: ContextFlags = ContextFlags(1 << 3);
    pub const CUT: ContextFlags = ContextFlags(1 << 4);
    pub const FILLED: ContextFlags = ContextFlags(1 << 5);
    /// Reverted by the player who made the original change.
    pub const UNDONE_SELF: ContextFlags = ContextFlags(1 << 6);
    /// Reverted by someone else (bulk undo).
    pub const UNDONE_OTHER: ContextFlags = ContextFlags(1 << 7);

    pub const fn contains(self, other: ContextFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ContextFlags {
    type Output = ContextFlags;

    fn bitor(self, rhs: ContextFlags) -> ContextFlags {
        ContextFlags(self.0 | rhs.0)
    }
}

/// Immutable record of one applied mutation. Never edited or individually
/// deleted once appended.
#[derive(Debug, Clone, Copy)]
pub struct BlockDbEntry {
    /// Unix seconds at append time.
    pub timestamp: u64,
    pub player: PlayerId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub old_block: BlockId,
    pub new_block: BlockId,
    pub flags: ContextFlags,
}

impl BlockDbEntry {
    /// Build an entry stamped with the current time.
    pub fn record(
        player: PlayerId,
        pos: BlockPos,
        old_block: BlockId,
        new_block: BlockId,
        flags: ContextFlags,
    ) -> Self {
        Self {
            timestamp: unix_now(),
            player,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            old_block,
            new_block,
            flags,
        }
    }

    pub const fn pos(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// What a lookup should return. Count-bounded lookups set `limit`;
/// time-bounded lookups leave `limit` at `usize::MAX` and set `max_age`.
#[derive(Debug, Clone, Default)]
pub struct LookupFilter {
    pub limit: usize,
    /// `None` means whole-world ("undo everywhere this player touched").
    pub area: Option<BoundingBox>,
    /// `None` means any player.
    pub players: Option<HashSet<PlayerId>>,
    /// When set, `players` is an exclusion set instead of a target set.
    pub exclude_players: bool,
    /// Only entries newer than now - max_age.
    pub max_age: Option<Duration>,
}

impl LookupFilter {
    pub fn by_count(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn by_age(max_age: Duration) -> Self {
        Self {
            limit: usize::MAX,
            max_age: Some(max_age),
            ..Self::default()
        }
    }

    pub fn in_area(mut self, area: BoundingBox) -> Self {
        self.area = Some(area);
        self
    }

    pub fn for_players(mut self, players: HashSet<PlayerId>, exclude: bool) -> Self {
        self.players = Some(players);
        self.exclude_players = exclude;
        self
    }

    fn matches(&self, entry: &BlockDbEntry, cutoff: Option<u64>) -> bool {
        if let Some(cutoff) = cutoff {
            if entry.timestamp < cutoff {
                return false;
            }
        }
        if let Some(area) = &self.area {
            if !area.contains(entry.pos()) {
                return false;
            }
        }
        if let Some(players) = &self.players {
            if players.contains(&entry.player) == self.exclude_players {
                return false;
            }
        }
        true
    }
}

/// Per-world owner of the append-only entry log.
///
/// Two flags gate every operation: the server-wide switch and the per-world
/// one. When either is off, appends are dropped and lookups fail with
/// [`BlockDbError::Disabled`] so callers can tell "disabled" apart from
/// "nothing found".
pub struct BlockDb {
    world_name: String,
    globally_enabled: bool,
    world_enabled: bool,
    entries: RwLock<Vec<BlockDbEntry>>,
}

impl BlockDb {
    pub fn new(world_name: impl Into<String>, globally_enabled: bool, world_enabled: bool) -> Self {
        Self {
            world_name: world_name.into(),
            globally_enabled,
            world_enabled,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn world_name(&self) -> &str {
        &self.world_name
    }

    pub fn is_enabled(&self) -> bool {
        self.globally_enabled && self.world_enabled
    }

    /// Append one entry. O(1) amortized; called on the ticker context right
    /// after the mutation it records. Silently dropped when disabled.
    pub fn append(&self, entry: BlockDbEntry) {
        if !self.is_enabled() {
            return;
        }
        self.entries
            .write()
            .expect("blockdb lock poisoned")
            .push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("blockdb lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matching entries, most-recent-first, truncated to `filter.limit`.
    ///
    /// Snapshots the log under a brief read lock, then filters off-lock in
    /// parallel so a large scan never stalls appends (and therefore never
    /// stalls the tick loop).
    pub fn lookup(&self, filter: &LookupFilter) -> Result<Vec<BlockDbEntry>, BlockDbError> {
        if !self.is_enabled() {
            return Err(BlockDbError::Disabled);
        }

        let snapshot: Vec<BlockDbEntry> =
            self.entries.read().expect("blockdb lock poisoned").clone();
        let cutoff = filter.max_age.map(|age| unix_now().saturating_sub(age.as_secs()));

        // Append index, not timestamp, is the chronological key: second
        // resolution produces heavy ties within one batch.
        let mut hits: Vec<(usize, BlockDbEntry)> = snapshot
            .par_iter()
            .enumerate()
            .filter(|(_, e)| filter.matches(e, cutoff))
            .map(|(i, e)| (i, *e))
            .collect();
        hits.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        hits.truncate(filter.limit);

        tracing::debug!(
            world = %self.world_name,
            scanned = snapshot.len(),
            matched = hits.len(),
            "BlockDB lookup"
        );
        Ok(hits.into_iter().map(|(_, e)| e).collect())
    }
}
