//! Per-command undo log: a capacity-bounded record of (coordinate, previous
//! block) pairs, enough to reverse one draw operation.

use crate::world::block::BlockId;
use crate::world::position::BlockPos;

/// One reversible mutation: what was at `pos` before the operation touched it.
#[derive(Debug, Clone, Copy)]
pub struct UndoEntry {
    pub pos: BlockPos,
    pub previous: BlockId,
}

/// Ordered log of a single command's mutations, in application order.
///
/// Entries are added only for mutations that actually changed the grid and
/// passed the permission check. Once the capacity ceiling is hit the
/// `too_large_to_undo` flag sticks: recording stops permanently for this
/// command, but drawing continues.
#[derive(Debug)]
pub struct UndoState {
    entries: Vec<UndoEntry>,
    capacity: usize,
    too_large: bool,
}

impl UndoState {
    /// Capacity comes from the issuing player's rank (draw-limit policy).
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            too_large: false,
        }
    }

    /// Record one mutation. Returns `false` (permanently) once the capacity
    /// ceiling has been reached.
    pub fn add(&mut self, pos: BlockPos, previous: BlockId) -> bool {
        if self.too_large {
            return false;
        }
        if self.entries.len() < self.capacity {
            self.entries.push(UndoEntry { pos, previous });
            true
        } else {
            self.too_large = true;
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn too_large_to_undo(&self) -> bool {
        self.too_large
    }

    /// Entries in application order (oldest first).
    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }
}
