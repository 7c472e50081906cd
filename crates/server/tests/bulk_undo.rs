//! End-to-end bulk undo: draw, look up, confirm, replay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ashlar_engine::PlayerId;
use ashlar_engine::blockdb::{BlockDb, ContextFlags};
use ashlar_engine::draw::DrawOp;
use ashlar_engine::draw::brush::SolidBrush;
use ashlar_engine::draw::region::CuboidRegion;
use ashlar_engine::geometry::BoundingBox;
use ashlar_engine::world::World;
use ashlar_engine::world::block::BlockId;
use ashlar_engine::world::position::BlockPos;

use ashlar_server::block;
use ashlar_server::bulk_undo::{self, TargetFilter, UndoRange, UndoSelector};
use ashlar_server::commands::undo::bulk_replay;
use ashlar_server::permissions::{Rank, RankPolicy};
use ashlar_server::player_registry::PlayerRegistry;

fn policy() -> RankPolicy {
    RankPolicy::new(Rank::builder(), Arc::new(Vec::new()))
}

fn run_to_done(op: &mut DrawOp, world: &World, policy: &RankPolicy, db: &BlockDb) {
    let far = Instant::now() + Duration::from_secs(60);
    while !op.is_finished() {
        op.draw_batch(world, policy, db, 10_000, far);
    }
}

/// Draw a stone row at y=10 for `player`, starting at `x0`.
fn draw_row(world: &World, db: &BlockDb, player: PlayerId, x0: i32, len: i32) {
    let mut op = DrawOp::new(
        player,
        "cuboid of stone",
        Box::new(CuboidRegion::new()),
        Box::new(SolidBrush::new(block::STONE, "stone")),
        ContextFlags::DRAWN,
        100_000,
    );
    let marks = [
        BlockPos::new(x0, 10, 0),
        BlockPos::new(x0 + len - 1, 10, 0),
    ];
    let policy = policy();
    op.begin(world, &marks, &policy).unwrap();
    run_to_done(&mut op, world, &policy, db);
    assert_eq!(op.blocks_drawn(), len as u64);
}

fn count_selector(count: usize, names: &[&str]) -> UndoSelector {
    UndoSelector {
        range: UndoRange::Count(count),
        targets: TargetFilter::Named(names.iter().map(|n| n.to_string()).collect()),
        invert: false,
    }
}

#[tokio::test]
async fn confirm_replays_the_snapshot_and_logs_the_reverts() {
    let world = World::new();
    let db = Arc::new(BlockDb::new("main", true, true));
    let registry = PlayerRegistry::new();
    let mina = registry.register(1, "Mina", "builder").unwrap().player_id;

    draw_row(&world, &db, mina, 0, 4);
    assert_eq!(db.len(), 4);
    assert_eq!(world.get_block(BlockPos::new(0, 10, 0)), block::STONE);

    // Phase 1: snapshot of Mina's own changes.
    let selector = count_selector(100, &["mina"]);
    let pending = bulk_undo::prepare(Arc::clone(&db), &registry, mina, &selector, None)
        .await
        .unwrap()
        .expect("should match the drawn row");
    assert_eq!(pending.entries.len(), 4);
    assert!(pending.flags.contains(ContextFlags::UNDONE_SELF));
    assert!(pending.summary.contains("4 change(s)"));

    // Phase 2: the replay restores air and is logged like any command.
    let mut op = bulk_replay(mina, &pending, 100_000);
    let policy = policy();
    op.begin(&world, &[], &policy).unwrap();
    run_to_done(&mut op, &world, &policy, &db);

    assert_eq!(op.blocks_drawn(), 4);
    for x in 0..4 {
        assert_eq!(world.get_block(BlockPos::new(x, 10, 0)), BlockId::AIR);
    }
    assert_eq!(db.len(), 8);
}

#[tokio::test]
async fn undoing_someone_else_is_flagged_as_such() {
    let world = World::new();
    let db = Arc::new(BlockDb::new("main", true, true));
    let registry = PlayerRegistry::new();
    let mina = registry.register(1, "Mina", "builder").unwrap().player_id;
    let juno = registry.register(2, "Juno", "op").unwrap().player_id;

    draw_row(&world, &db, mina, 0, 3);

    let selector = count_selector(100, &["mina"]);
    let pending = bulk_undo::prepare(Arc::clone(&db), &registry, juno, &selector, None)
        .await
        .unwrap()
        .unwrap();
    assert!(pending.flags.contains(ContextFlags::UNDONE_OTHER));
}

#[tokio::test]
async fn inverted_filter_spares_the_named_player() {
    let world = World::new();
    let db = Arc::new(BlockDb::new("main", true, true));
    let registry = PlayerRegistry::new();
    let mina = registry.register(1, "Mina", "builder").unwrap().player_id;
    let juno = registry.register(2, "Juno", "builder").unwrap().player_id;

    draw_row(&world, &db, mina, 0, 3);
    draw_row(&world, &db, juno, 10, 3);

    let selector = UndoSelector {
        range: UndoRange::Count(100),
        targets: TargetFilter::Named(vec!["juno".into()]),
        invert: true,
    };
    let pending = bulk_undo::prepare(Arc::clone(&db), &registry, mina, &selector, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.entries.len(), 3);
    assert!(pending.entries.iter().all(|e| e.player == mina));
}

#[tokio::test]
async fn area_scope_excludes_changes_outside_the_marks() {
    let world = World::new();
    let db = Arc::new(BlockDb::new("main", true, true));
    let registry = PlayerRegistry::new();
    let mina = registry.register(1, "Mina", "builder").unwrap().player_id;

    draw_row(&world, &db, mina, 0, 3);
    draw_row(&world, &db, mina, 50, 3);

    let area = BoundingBox::from_corners(BlockPos::new(-5, 0, -5), BlockPos::new(5, 20, 5));
    let selector = count_selector(100, &["mina"]);
    let pending = bulk_undo::prepare(Arc::clone(&db), &registry, mina, &selector, Some(area))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.entries.len(), 3);
    assert!(pending.entries.iter().all(|e| e.x <= 5));
}

#[tokio::test]
async fn unknown_player_and_empty_results_are_distinct() {
    let db = Arc::new(BlockDb::new("main", true, true));
    let registry = PlayerRegistry::new();
    let mina = registry.register(1, "Mina", "builder").unwrap().player_id;

    let err = bulk_undo::prepare(
        Arc::clone(&db),
        &registry,
        mina,
        &count_selector(10, &["stranger"]),
        None,
    )
    .await
    .unwrap_err();
    assert!(err.contains("stranger"));

    // Known player, nothing recorded: not an error, just empty.
    let result = bulk_undo::prepare(
        Arc::clone(&db),
        &registry,
        mina,
        &count_selector(10, &["mina"]),
        None,
    )
    .await
    .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn disabled_blockdb_fails_the_lookup_loudly() {
    let db = Arc::new(BlockDb::new("main", true, false));
    let registry = PlayerRegistry::new();
    let mina = registry.register(1, "Mina", "builder").unwrap().player_id;

    let err = bulk_undo::prepare(
        Arc::clone(&db),
        &registry,
        mina,
        &count_selector(10, &["mina"]),
        None,
    )
    .await
    .unwrap_err();
    assert!(err.contains("disabled"));
}

#[tokio::test]
async fn pending_undo_expires_with_the_window() {
    let world = World::new();
    let db = Arc::new(BlockDb::new("main", true, true));
    let registry = PlayerRegistry::new();
    let mina = registry.register(1, "Mina", "builder").unwrap().player_id;
    draw_row(&world, &db, mina, 0, 1);

    let pending = bulk_undo::prepare(db, &registry, mina, &count_selector(10, &["mina"]), None)
        .await
        .unwrap()
        .unwrap();
    assert!(!pending.is_expired(Duration::from_secs(60)));
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(pending.is_expired(Duration::from_millis(1)));
}
