//! Per-connection session state: selection marks, clipboard, the bounded
//! undo history, and any pending bulk-undo confirmation.

use std::sync::Arc;

use ashlar_engine::draw::clipboard::Clipboard;
use ashlar_engine::undo::UndoState;
use ashlar_engine::world::position::BlockPos;

use crate::bulk_undo::PendingUndo;
use crate::permissions::RankPolicy;
use crate::player_registry::PlayerInfo;

/// What the ticker sends back to a connection about its operation.
#[derive(Debug)]
pub enum SessionNotice {
    /// Periodic progress line for long operations.
    Progress {
        label: String,
        drawn: u64,
        estimate: u64,
    },
    /// The operation left the tick table (finished or cancelled).
    Finished {
        label: String,
        drawn: u64,
        skipped: u64,
        cancelled: bool,
        too_large_to_undo: bool,
        undo: UndoState,
    },
}

pub struct Session {
    pub info: PlayerInfo,
    pub policy: Arc<RankPolicy>,
    /// Selection marks in placement order.
    marks: Vec<BlockPos>,
    pub clipboard: Option<Clipboard>,
    /// Undo logs of finished commands, oldest first, capped at `history_depth`.
    undo_history: Vec<UndoState>,
    history_depth: usize,
    pub pending_undo: Option<PendingUndo>,
    /// One draw operation in flight per connection.
    pub op_in_flight: bool,
}

impl Session {
    pub fn new(info: PlayerInfo, policy: Arc<RankPolicy>, history_depth: usize) -> Self {
        Self {
            info,
            policy,
            marks: Vec::new(),
            clipboard: None,
            undo_history: Vec::new(),
            history_depth,
            pending_undo: None,
            op_in_flight: false,
        }
    }

    pub fn add_mark(&mut self, pos: BlockPos) -> usize {
        self.marks.push(pos);
        self.marks.len()
    }

    pub fn marks(&self) -> &[BlockPos] {
        &self.marks
    }

    pub fn clear_marks(&mut self) {
        self.marks.clear();
    }

    /// The most recent `n` marks in placement order, or `None` when fewer
    /// exist. Mark 0 of a geometry is the oldest of the `n`.
    pub fn last_marks(&self, n: usize) -> Option<Vec<BlockPos>> {
        if self.marks.len() < n {
            return None;
        }
        Some(self.marks[self.marks.len() - n..].to_vec())
    }

    /// Record a finished command's undo log, evicting the oldest beyond the
    /// history depth. Empty logs are not worth a history slot.
    pub fn push_undo(&mut self, undo: UndoState) {
        if undo.is_empty() {
            return;
        }
        if self.undo_history.len() == self.history_depth {
            self.undo_history.remove(0);
        }
        self.undo_history.push(undo);
    }

    /// Most recent undo log, removed from the history.
    pub fn pop_undo(&mut self) -> Option<UndoState> {
        self.undo_history.pop()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashlar_engine::PlayerId;
    use ashlar_engine::world::block::BlockId;
    use crate::permissions::Rank;

    fn session(depth: usize) -> Session {
        let info = PlayerInfo {
            conn_id: 1,
            player_id: PlayerId(1),
            name: "tester".into(),
            rank_name: "builder".into(),
        };
        let policy = Arc::new(RankPolicy::new(Rank::builder(), Arc::new(Vec::new())));
        Session::new(info, policy, depth)
    }

    fn undo_of_len(n: usize) -> UndoState {
        let mut undo = UndoState::with_capacity_limit(n);
        for i in 0..n {
            undo.add(BlockPos::new(i as i32, 0, 0), BlockId::AIR);
        }
        undo
    }

    #[test]
    fn last_marks_returns_newest_in_placement_order() {
        let mut s = session(4);
        s.add_mark(BlockPos::new(1, 0, 0));
        s.add_mark(BlockPos::new(2, 0, 0));
        s.add_mark(BlockPos::new(3, 0, 0));
        let marks = s.last_marks(2).unwrap();
        assert_eq!(marks, vec![BlockPos::new(2, 0, 0), BlockPos::new(3, 0, 0)]);
        assert!(s.last_marks(4).is_none());
    }

    #[test]
    fn undo_history_evicts_oldest_and_skips_empty() {
        let mut s = session(2);
        s.push_undo(undo_of_len(0));
        assert_eq!(s.undo_depth(), 0);

        s.push_undo(undo_of_len(1));
        s.push_undo(undo_of_len(2));
        s.push_undo(undo_of_len(3));
        assert_eq!(s.undo_depth(), 2);
        assert_eq!(s.pop_undo().unwrap().len(), 3);
        assert_eq!(s.pop_undo().unwrap().len(), 2);
        assert!(s.pop_undo().is_none());
    }
}
