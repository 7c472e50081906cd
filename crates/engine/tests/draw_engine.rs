//! Draw-engine behavior tests: batching exactness, cancellation, undo
//! capacity, audit-log coupling, and replay. All block values are opaque
//! `BlockId`s; no server-side palette semantics are involved.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ashlar_engine::PlayerId;
use ashlar_engine::blockdb::{BlockDb, ContextFlags, LookupFilter};
use ashlar_engine::draw::brush::{BlockChoice, Brush, PasteBrush, SolidBrush};
use ashlar_engine::draw::region::{
    CuboidRegion, CutRegion, PasteRegion, Region, ReplayRegion,
};
use ashlar_engine::draw::{DrawOp, DrawPolicy, OpState, Placement, Unrestricted};
use ashlar_engine::geometry::BoundingBox;
use ashlar_engine::world::World;
use ashlar_engine::world::block::BlockId;
use ashlar_engine::world::position::BlockPos;

const STONE: BlockId = BlockId(1);
const DIRT: BlockId = BlockId(3);

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}

fn enabled_db() -> BlockDb {
    BlockDb::new("test", true, true)
}

fn cuboid_op(player: u32, block: BlockId, undo_capacity: usize) -> DrawOp {
    DrawOp::new(
        PlayerId(player),
        "cuboid",
        Box::new(CuboidRegion::new()),
        Box::new(SolidBrush::new(block, "stone")),
        ContextFlags::DRAWN,
        undo_capacity,
    )
}

/// A brush that never paints.
struct NeverBrush;

impl Brush for NeverBrush {
    fn next_block(&mut self, _pos: BlockPos, _current: BlockId) -> BlockChoice {
        BlockChoice::Skip
    }

    fn description(&self) -> String {
        "nothing".into()
    }
}

/// Denies placement above y = 0.
struct GroundFloorOnly;

impl DrawPolicy for GroundFloorOnly {
    fn can_place(&self, _world: &World, pos: BlockPos, _block: BlockId) -> Placement {
        if pos.y > 0 {
            Placement::Denied
        } else {
            Placement::Allowed
        }
    }

    fn can_draw(&self, _estimate: u64) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

#[test]
fn batching_is_exact_for_any_cap() {
    let marks = [BlockPos::new(0, 0, 0), BlockPos::new(3, 2, 4)];
    let volume = 4 * 3 * 5;

    for cap in [1u32, 3, 7, 64, 10_000] {
        let world = World::new();
        let db = enabled_db();
        let mut op = cuboid_op(1, STONE, volume as usize);
        op.begin(&world, &marks, &Unrestricted).unwrap();
        assert_eq!(op.blocks_total_estimate(), volume);

        let mut batches = 0;
        while !op.is_finished() {
            let n = op.draw_batch(&world, &Unrestricted, &db, cap, far_deadline());
            assert!(n <= cap);
            batches += 1;
            assert!(batches < 100_000, "runaway batching at cap {cap}");
        }

        assert_eq!(op.state(), OpState::Done);
        assert_eq!(op.blocks_drawn(), volume);
        assert_eq!(op.blocks_skipped(), 0);
        assert_eq!(op.undo().len(), volume as usize);
        assert_eq!(db.len(), volume as usize);

        // No coordinate omitted: every block in the box is stone now.
        for x in 0..4 {
            for y in 0..3 {
                for z in 0..5 {
                    assert_eq!(world.get_block(BlockPos::new(x, y, z)), STONE);
                }
            }
        }
        // Nothing outside the box was touched.
        assert_eq!(world.get_block(BlockPos::new(4, 0, 0)), BlockId::AIR);
    }
}

#[test]
fn expired_deadline_stops_before_the_next_coordinate() {
    let world = World::new();
    let db = enabled_db();
    let mut op = cuboid_op(1, STONE, 1000);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(9, 0, 9)],
        &Unrestricted,
    )
    .unwrap();

    let n = op.draw_batch(&world, &Unrestricted, &db, 1000, Instant::now() - Duration::from_millis(1));
    assert_eq!(n, 0);
    assert_eq!(op.state(), OpState::Running);

    // Resuming with a real deadline finishes the job as if never paused.
    let n = op.draw_batch(&world, &Unrestricted, &db, 1000, far_deadline());
    assert_eq!(n, 100);
    assert_eq!(op.state(), OpState::Done);
}

#[test]
fn cancel_before_first_batch_leaves_grid_unchanged() {
    let world = World::new();
    let db = enabled_db();
    let mut op = cuboid_op(1, STONE, 1000);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(5, 5, 5)],
        &Unrestricted,
    )
    .unwrap();

    op.cancel();
    assert_eq!(op.state(), OpState::Cancelled);
    assert_eq!(op.draw_batch(&world, &Unrestricted, &db, 1000, far_deadline()), 0);
    assert_eq!(op.blocks_drawn(), 0);
    assert_eq!(db.len(), 0);
    for x in 0..6 {
        assert_eq!(world.get_block(BlockPos::new(x, x, x)), BlockId::AIR);
    }
}

#[test]
fn wrong_mark_count_aborts_before_any_side_effect() {
    let world = World::new();
    let mut op = cuboid_op(1, STONE, 10);
    let err = op
        .begin(&world, &[BlockPos::new(0, 0, 0)], &Unrestricted)
        .unwrap_err();
    assert!(matches!(
        err,
        ashlar_engine::error::EngineError::BadMarks { expected: 2, got: 1 }
    ));
    assert_eq!(op.state(), OpState::Created);
}

#[test]
fn draw_ceiling_rejects_at_begin() {
    struct TinyLimit;
    impl DrawPolicy for TinyLimit {
        fn can_place(&self, _: &World, _: BlockPos, _: BlockId) -> Placement {
            Placement::Allowed
        }
        fn can_draw(&self, estimate: u64) -> bool {
            estimate <= 10
        }
    }

    let world = World::new();
    let mut op = cuboid_op(1, STONE, 1000);
    let err = op
        .begin(
            &world,
            &[BlockPos::new(0, 0, 0), BlockPos::new(9, 9, 9)],
            &TinyLimit,
        )
        .unwrap_err();
    assert!(matches!(err, ashlar_engine::error::EngineError::DrawLimit(1000)));
}

// ---------------------------------------------------------------------------
// Counters and the undo log
// ---------------------------------------------------------------------------

#[test]
fn two_by_two_cuboid_scenario() {
    let world = World::new();
    let db = enabled_db();
    let mut op = cuboid_op(1, STONE, 100);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 1)],
        &Unrestricted,
    )
    .unwrap();

    assert_eq!(op.blocks_total_estimate(), 8);
    while !op.is_finished() {
        op.draw_batch(&world, &Unrestricted, &db, 3, far_deadline());
    }
    assert_eq!(op.blocks_drawn(), 8);
    assert_eq!(op.undo().len(), 8);
    assert_eq!(db.len(), 8);
}

#[test]
fn always_skip_brush_draws_nothing() {
    let world = World::new();
    let db = enabled_db();
    let mut op = DrawOp::new(
        PlayerId(1),
        "cuboid",
        Box::new(CuboidRegion::new()),
        Box::new(NeverBrush),
        ContextFlags::DRAWN,
        100,
    );
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(2, 2, 2)],
        &Unrestricted,
    )
    .unwrap();

    assert!(op.blocks_total_estimate() > 0);
    while !op.is_finished() {
        op.draw_batch(&world, &Unrestricted, &db, 1000, far_deadline());
    }
    assert_eq!(op.blocks_drawn(), 0);
    assert_eq!(op.blocks_skipped(), 27);
    assert_eq!(op.undo().len(), 0);
    assert_eq!(db.len(), 0);
}

#[test]
fn undo_capacity_overflow_keeps_drawing() {
    let world = World::new();
    let db = enabled_db();
    let mut op = cuboid_op(1, STONE, 10);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(2, 2, 2)],
        &Unrestricted,
    )
    .unwrap();
    while !op.is_finished() {
        op.draw_batch(&world, &Unrestricted, &db, 1000, far_deadline());
    }

    assert_eq!(op.blocks_drawn(), 27);
    assert_eq!(op.undo().len(), 10);
    assert!(op.undo().too_large_to_undo());
    // The audit log is not capped, only the undo log is.
    assert_eq!(db.len(), 27);
}

#[test]
fn permission_denials_count_as_skipped() {
    let world = World::new();
    let db = enabled_db();
    let mut op = cuboid_op(1, STONE, 1000);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(2, 2, 2)],
        &GroundFloorOnly,
    )
    .unwrap();
    while !op.is_finished() {
        op.draw_batch(&world, &GroundFloorOnly, &db, 1000, far_deadline());
    }

    // Only the y = 0 layer of the 3x3x3 box is allowed.
    assert_eq!(op.blocks_drawn(), 9);
    assert_eq!(op.blocks_skipped(), 18);
    assert_eq!(op.undo().len(), 9);
    assert_eq!(db.len(), 9);
    assert_eq!(world.get_block(BlockPos::new(1, 1, 1)), BlockId::AIR);
}

#[test]
fn repainting_identical_blocks_is_not_a_mutation() {
    let world = World::new();
    let db = enabled_db();
    world.set_block(BlockPos::new(0, 0, 0), STONE);

    let mut op = cuboid_op(1, STONE, 100);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(1, 0, 0)],
        &Unrestricted,
    )
    .unwrap();
    while !op.is_finished() {
        op.draw_batch(&world, &Unrestricted, &db, 1000, far_deadline());
    }

    assert_eq!(op.blocks_drawn(), 1);
    assert_eq!(op.blocks_skipped(), 1);
    assert_eq!(db.len(), 1);
}

// ---------------------------------------------------------------------------
// Replay: undo and undo-of-undo
// ---------------------------------------------------------------------------

fn run_to_done(op: &mut DrawOp, world: &World, db: &BlockDb) {
    while !op.is_finished() {
        op.draw_batch(world, &Unrestricted, db, 1000, far_deadline());
    }
}

#[test]
fn personal_undo_restores_and_is_itself_undoable() {
    let world = World::new();
    let db = enabled_db();
    world.set_block(BlockPos::new(1, 0, 1), DIRT);

    let mut op = cuboid_op(1, STONE, 1000);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(2, 0, 2)],
        &Unrestricted,
    )
    .unwrap();
    run_to_done(&mut op, &world, &db);
    let undo = op.into_undo();
    assert_eq!(undo.len(), 9);

    let (region, brush) = ReplayRegion::from_undo(&undo, "undo");
    let mut undo_op = DrawOp::new(
        PlayerId(1),
        "undo",
        Box::new(region),
        Box::new(brush),
        ContextFlags::UNDONE_SELF,
        1000,
    );
    undo_op.begin(&world, &[], &Unrestricted).unwrap();
    run_to_done(&mut undo_op, &world, &db);

    assert_eq!(undo_op.blocks_drawn(), 9);
    assert_eq!(world.get_block(BlockPos::new(1, 0, 1)), DIRT);
    assert_eq!(world.get_block(BlockPos::new(0, 0, 0)), BlockId::AIR);

    // The undo recorded its own reversal log: redo is possible.
    assert_eq!(undo_op.undo().len(), 9);
    let (region, brush) = ReplayRegion::from_undo(undo_op.undo(), "redo");
    let mut redo_op = DrawOp::new(
        PlayerId(1),
        "redo",
        Box::new(region),
        Box::new(brush),
        ContextFlags::UNDONE_SELF,
        1000,
    );
    redo_op.begin(&world, &[], &Unrestricted).unwrap();
    run_to_done(&mut redo_op, &world, &db);
    assert_eq!(world.get_block(BlockPos::new(1, 0, 1)), STONE);
}

#[test]
fn bulk_replay_skips_stale_coordinates() {
    let world = World::new();
    let db = enabled_db();

    let mut op = cuboid_op(7, STONE, 1000);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(2, 0, 0)],
        &Unrestricted,
    )
    .unwrap();
    run_to_done(&mut op, &world, &db);

    let snapshot = db.lookup(&LookupFilter::by_count(100)).unwrap();
    assert_eq!(snapshot.len(), 3);

    // An unrelated edit lands after the snapshot.
    world.set_block(BlockPos::new(1, 0, 0), DIRT);

    let (region, brush) = ReplayRegion::from_entries(&snapshot, "undo");
    let mut undo_op = DrawOp::new(
        PlayerId(8),
        "bulk undo",
        Box::new(region),
        Box::new(brush),
        ContextFlags::UNDONE_OTHER,
        1000,
    );
    undo_op.begin(&world, &[], &Unrestricted).unwrap();
    run_to_done(&mut undo_op, &world, &db);

    assert_eq!(undo_op.blocks_drawn(), 2);
    assert_eq!(undo_op.blocks_skipped(), 1);
    assert_eq!(world.get_block(BlockPos::new(0, 0, 0)), BlockId::AIR);
    assert_eq!(world.get_block(BlockPos::new(2, 0, 0)), BlockId::AIR);
    // The newer edit was preserved, not clobbered.
    assert_eq!(world.get_block(BlockPos::new(1, 0, 0)), DIRT);
}

#[test]
fn empty_replay_completes_at_begin() {
    let world = World::new();
    let (region, brush) = ReplayRegion::from_entries(&[], "undo");
    let mut op = DrawOp::new(
        PlayerId(1),
        "bulk undo",
        Box::new(region),
        Box::new(brush),
        ContextFlags::UNDONE_OTHER,
        10,
    );
    op.begin(&world, &[], &Unrestricted).unwrap();
    assert_eq!(op.state(), OpState::Done);
    assert_eq!(op.blocks_drawn(), 0);
}

// ---------------------------------------------------------------------------
// Cut and paste
// ---------------------------------------------------------------------------

#[test]
fn cut_captures_before_mutating_and_paste_restores() {
    let world = World::new();
    let db = enabled_db();

    // A small recognizable pattern.
    world.set_block(BlockPos::new(0, 0, 0), STONE);
    world.set_block(BlockPos::new(1, 0, 0), DIRT);
    world.set_block(BlockPos::new(1, 1, 1), STONE);

    let slot = Arc::new(Mutex::new(None));
    let mut cut = DrawOp::new(
        PlayerId(1),
        "cut",
        Box::new(CutRegion::new(Arc::clone(&slot))),
        Box::new(SolidBrush::new(BlockId::AIR, "air")),
        ContextFlags::CUT,
        1000,
    );
    cut.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 1)],
        &Unrestricted,
    )
    .unwrap();
    let clipboard = slot.lock().unwrap().take().expect("clipboard captured at begin");
    run_to_done(&mut cut, &world, &db);

    // The cut region is now air.
    assert_eq!(cut.blocks_drawn(), 3);
    assert_eq!(world.get_block(BlockPos::new(0, 0, 0)), BlockId::AIR);
    assert_eq!(world.get_block(BlockPos::new(1, 1, 1)), BlockId::AIR);

    // Paste the clipboard two blocks over.
    let mut paste = DrawOp::new(
        PlayerId(1),
        "paste",
        Box::new(PasteRegion::new(&clipboard)),
        Box::new(PasteBrush::new(clipboard)),
        ContextFlags::PASTED,
        1000,
    );
    paste.begin(&world, &[BlockPos::new(10, 0, 0)], &Unrestricted).unwrap();
    run_to_done(&mut paste, &world, &db);

    assert_eq!(world.get_block(BlockPos::new(10, 0, 0)), STONE);
    assert_eq!(world.get_block(BlockPos::new(11, 0, 0)), DIRT);
    assert_eq!(world.get_block(BlockPos::new(11, 1, 1)), STONE);
    assert_eq!(world.get_block(BlockPos::new(10, 1, 1)), BlockId::AIR);
}

// ---------------------------------------------------------------------------
// Audit log coupling
// ---------------------------------------------------------------------------

#[test]
fn area_lookup_matches_what_was_drawn_there() {
    let world = World::new();
    let db = enabled_db();

    let mut op = cuboid_op(3, STONE, 1000);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(4, 0, 0)],
        &Unrestricted,
    )
    .unwrap();
    run_to_done(&mut op, &world, &db);

    let area = BoundingBox::from_corners(BlockPos::new(1, 0, 0), BlockPos::new(3, 0, 0));
    let hits = db.lookup(&LookupFilter::by_count(2).in_area(area)).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|e| area.contains(e.pos())));
    assert!(hits.iter().all(|e| e.player == PlayerId(3)));
    assert!(hits.iter().all(|e| e.flags.contains(ContextFlags::DRAWN)));
    // Most recent first along the draw order.
    assert_eq!(hits[0].x, 3);
    assert_eq!(hits[1].x, 2);
}

#[test]
fn disabled_blockdb_does_not_stop_drawing() {
    let world = World::new();
    let db = BlockDb::new("test", true, false);
    let mut op = cuboid_op(1, STONE, 100);
    op.begin(
        &world,
        &[BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 1)],
        &Unrestricted,
    )
    .unwrap();
    run_to_done(&mut op, &world, &db);

    assert_eq!(op.blocks_drawn(), 8);
    assert_eq!(db.len(), 0);
    assert!(db.lookup(&LookupFilter::by_count(1)).is_err());
}
