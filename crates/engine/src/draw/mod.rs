//! The draw operation engine: a resumable batching state machine that turns
//! a region + brush into permission-checked, audited, undoable mutations.
//!
//! One cooperative tick context drives `draw_batch` for every in-flight
//! operation; a batch self-limits by a block-count ceiling and a wall-clock
//! deadline so no single command can starve other players' ticks.

pub mod brush;
pub mod clipboard;
pub mod region;

use std::time::Instant;

use slotmap::new_key_type;

use crate::PlayerId;
use crate::blockdb::{BlockDb, BlockDbEntry, ContextFlags};
use crate::error::EngineError;
use crate::geometry::BoundingBox;
use crate::undo::UndoState;
use crate::world::World;
use crate::world::block::BlockId;
use crate::world::position::BlockPos;
use brush::{BlockChoice, Brush};
use region::Region;

new_key_type! {
    /// Handle for an in-flight draw operation in the ticker's table.
    pub struct DrawOpId;
}

/// Verdict of the per-coordinate permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Allowed,
    Denied,
}

/// The capability surface the engine consumes from the rank/permission
/// layer. Rule definitions live outside; only these booleans cross the seam.
pub trait DrawPolicy: Send + Sync {
    /// Per-coordinate check, queried for every paint. A denial skips the
    /// coordinate and never aborts the command.
    fn can_place(&self, world: &World, pos: BlockPos, block: BlockId) -> Placement;

    /// Rank draw ceiling, checked once at begin time against the estimate.
    fn can_draw(&self, estimate: u64) -> bool;
}

/// Policy that allows everything (console, tests).
pub struct Unrestricted;

impl DrawPolicy for Unrestricted {
    fn can_place(&self, _world: &World, _pos: BlockPos, _block: BlockId) -> Placement {
        Placement::Allowed
    }

    fn can_draw(&self, _estimate: u64) -> bool {
        true
    }
}

/// Lifecycle of a draw operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Created,
    Prepared,
    Running,
    Done,
    Cancelled,
}

/// One user-issued building command: a region, a brush, and the saved state
/// needed to resume it across batches.
pub struct DrawOp {
    player: PlayerId,
    label: String,
    region: Box<dyn Region>,
    brush: Box<dyn Brush>,
    flags: ContextFlags,
    state: OpState,
    bounds: Option<BoundingBox>,
    estimate: u64,
    drawn: u64,
    skipped: u64,
    undo: UndoState,
}

impl DrawOp {
    pub fn new(
        player: PlayerId,
        label: impl Into<String>,
        region: Box<dyn Region>,
        brush: Box<dyn Brush>,
        flags: ContextFlags,
        undo_capacity: usize,
    ) -> Self {
        Self {
            player,
            label: label.into(),
            region,
            brush,
            flags,
            state: OpState::Created,
            bounds: None,
            estimate: 0,
            drawn: 0,
            skipped: 0,
            undo: UndoState::with_capacity_limit(undo_capacity),
        }
    }

    /// Validate marks and brush, compute bounds and the volume estimate, and
    /// check the rank draw ceiling. Zero side effects on error. An empty
    /// region (only possible for replays) completes immediately.
    pub fn begin(
        &mut self,
        world: &World,
        marks: &[BlockPos],
        policy: &dyn DrawPolicy,
    ) -> Result<(), EngineError> {
        if self.state != OpState::Created {
            return Err(EngineError::Validation(
                "operation has already been started".into(),
            ));
        }
        let expected = self.region.expected_marks();
        if marks.len() != expected {
            return Err(EngineError::BadMarks {
                expected,
                got: marks.len(),
            });
        }

        self.brush.begin(world)?;
        let info = self.region.begin(marks, world)?;
        if !policy.can_draw(info.estimate) {
            return Err(EngineError::DrawLimit(info.estimate));
        }

        self.bounds = Some(info.bounds);
        self.estimate = info.estimate;
        self.state = if info.estimate == 0 {
            OpState::Done
        } else {
            OpState::Prepared
        };
        tracing::debug!(
            player = self.player.0,
            label = %self.label,
            estimate = self.estimate,
            "draw operation prepared"
        );
        Ok(())
    }

    /// Run one batch: resume the region cursor and mutate until `max_blocks`
    /// blocks have been drawn this call or `deadline` has passed, whichever
    /// comes first. Returns the number drawn this call.
    ///
    /// Both ceilings are checked before fetching the next coordinate, so the
    /// resume point is always exactly the next unvisited coordinate and a
    /// sequence of batches is indistinguishable from one uninterrupted pass.
    pub fn draw_batch(
        &mut self,
        world: &World,
        policy: &dyn DrawPolicy,
        db: &BlockDb,
        max_blocks: u32,
        deadline: Instant,
    ) -> u32 {
        match self.state {
            OpState::Prepared | OpState::Running => {}
            _ => return 0,
        }
        self.state = OpState::Running;

        let mut drawn_now: u32 = 0;
        loop {
            if drawn_now >= max_blocks || Instant::now() >= deadline {
                break;
            }
            let Some(pos) = self.region.next(world) else {
                self.state = OpState::Done;
                break;
            };

            let current = world.get_block(pos);
            let target = match self.brush.next_block(pos, current) {
                BlockChoice::Skip => {
                    self.skipped += 1;
                    continue;
                }
                BlockChoice::Paint(block) => block,
            };
            // Painting what is already there is not a mutation: nothing to
            // log, nothing to undo.
            if target == current {
                self.skipped += 1;
                continue;
            }
            if policy.can_place(world, pos, target) == Placement::Denied {
                self.skipped += 1;
                continue;
            }

            world.set_block(pos, target);
            db.append(BlockDbEntry::record(
                self.player,
                pos,
                current,
                target,
                self.flags,
            ));
            self.undo.add(pos, current);
            self.drawn += 1;
            drawn_now += 1;
        }
        drawn_now
    }

    /// Cooperative cancel: no further batches run. Mutations already applied
    /// stay; reversing them takes a separate `/undo`.
    pub fn cancel(&mut self) {
        if self.state != OpState::Done {
            self.state = OpState::Cancelled;
        }
    }

    pub fn state(&self) -> OpState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, OpState::Done | OpState::Cancelled)
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn brush_description(&self) -> String {
        self.brush.description()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn blocks_total_estimate(&self) -> u64 {
        self.estimate
    }

    pub fn blocks_drawn(&self) -> u64 {
        self.drawn
    }

    pub fn blocks_skipped(&self) -> u64 {
        self.skipped
    }

    pub fn undo(&self) -> &UndoState {
        &self.undo
    }

    /// Hand the undo log to the session once the operation is finished.
    pub fn into_undo(self) -> UndoState {
        self.undo
    }
}
