//! Adapters that turn undo requests into replay draw operations.
//!
//! Both personal and bulk undo run through the same engine machinery as any
//! other command, so they are batched, permission-checked, logged to the
//! BlockDB, and themselves undoable.

use std::collections::HashSet;

use ashlar_engine::PlayerId;
use ashlar_engine::blockdb::ContextFlags;
use ashlar_engine::draw::{DrawOp, DrawPolicy};
use ashlar_engine::draw::region::ReplayRegion;
use ashlar_engine::undo::UndoState;

use crate::bulk_undo::PendingUndo;
use crate::session::Session;

/// `/undo [n]`: pop up to `levels` finished commands off the session history
/// and build one replay that reverts them newest-first.
///
/// Refusals leave the session untouched: the draw ceiling is checked here,
/// before the popped logs are committed, and a refused pop is pushed back.
pub fn personal_undo(session: &mut Session, levels: usize) -> Result<DrawOp, String> {
    if levels == 0 {
        return Err("undo count must be at least 1".into());
    }
    let mut popped = Vec::new();
    for _ in 0..levels {
        match session.pop_undo() {
            Some(undo) => popped.push(undo),
            None => break,
        }
    }
    if popped.is_empty() {
        return Err("nothing to undo".into());
    }

    // Merge into one log in application order (oldest command first); the
    // replay then walks it newest mutation first. A coordinate touched by
    // several commands ends up restored to its oldest recorded block.
    let total: usize = popped.iter().map(UndoState::len).sum();
    let mut merged = UndoState::with_capacity_limit(total);
    for undo in popped.iter().rev() {
        for entry in undo.entries() {
            merged.add(entry.pos, entry.previous);
        }
    }

    // The replay visits each distinct coordinate once; that count is what
    // the rank ceiling will see at begin time.
    let distinct = {
        let mut seen = HashSet::with_capacity(merged.len());
        for entry in merged.entries() {
            seen.insert(entry.pos);
        }
        seen.len()
    };
    if !session.policy.can_draw(distinct as u64) {
        for undo in popped.into_iter().rev() {
            session.push_undo(undo);
        }
        return Err(format!(
            "undoing that would affect about {distinct} blocks, which is over your draw limit"
        ));
    }

    let (region, brush) = ReplayRegion::from_undo(&merged, "undo");
    Ok(DrawOp::new(
        session.info.player_id,
        "undo",
        Box::new(region),
        Box::new(brush),
        ContextFlags::UNDONE_SELF,
        session.policy.rank().undo_capacity,
    ))
}

/// `/ok`: turn a confirmed snapshot into a replay operation.
pub fn bulk_replay(player: PlayerId, pending: &PendingUndo, undo_capacity: usize) -> DrawOp {
    let (region, brush) = ReplayRegion::from_entries(&pending.entries, "bulk undo");
    DrawOp::new(
        player,
        "bulk undo",
        Box::new(region),
        Box::new(brush),
        pending.flags,
        undo_capacity,
    )
}
