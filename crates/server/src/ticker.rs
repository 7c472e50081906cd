//! The tick loop: the single context that mutates the grid.
//!
//! All prepared draw operations live in one slotmap owned by the ticker
//! task. Every tick, each operation gets one batch bounded by a block count
//! and a wall-clock slice, so many players' commands interleave fairly and
//! the BlockDB log stays ordered exactly like the mutations it records.

use std::sync::Arc;
use std::time::{Duration, Instant};

use slotmap::SlotMap;
use tokio::sync::{broadcast, mpsc};

use ashlar_engine::blockdb::BlockDb;
use ashlar_engine::draw::{DrawOp, DrawOpId, OpState};
use ashlar_engine::world::World;

use crate::config::ServerConfig;
use crate::event_bus::Broadcast;
use crate::permissions::RankPolicy;
use crate::session::SessionNotice;

/// Per-tick ceilings, taken from config at startup.
#[derive(Debug, Clone, Copy)]
pub struct TickBudget {
    pub interval: Duration,
    pub max_blocks: u32,
    pub time_slice: Duration,
}

impl TickBudget {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.tick_interval_ms),
            max_blocks: config.batch_max_blocks,
            time_slice: Duration::from_millis(config.batch_time_slice_ms),
        }
    }
}

/// A prepared operation handed to the ticker, with everything needed to run
/// it and report back.
pub struct Submission {
    pub op: DrawOp,
    pub conn_id: u64,
    pub player_name: String,
    pub policy: Arc<RankPolicy>,
    pub notice: mpsc::UnboundedSender<SessionNotice>,
}

enum TickerMsg {
    Submit(Box<Submission>),
    Cancel { conn_id: u64 },
}

/// Cheap clonable handle for connections to reach the ticker task.
#[derive(Clone)]
pub struct TickerHandle {
    tx: mpsc::UnboundedSender<TickerMsg>,
}

impl TickerHandle {
    pub fn submit(&self, submission: Submission) {
        let _ = self.tx.send(TickerMsg::Submit(Box::new(submission)));
    }

    pub fn cancel(&self, conn_id: u64) {
        let _ = self.tx.send(TickerMsg::Cancel { conn_id });
    }
}

struct ActiveOp {
    sub: Submission,
    ticks: u64,
}

/// Send a progress line roughly every two seconds at the default tick rate.
const PROGRESS_EVERY_TICKS: u64 = 40;

/// Spawn the ticker task and return its handle.
pub fn start(
    world: Arc<World>,
    db: Arc<BlockDb>,
    bus: broadcast::Sender<Broadcast>,
    budget: TickBudget,
) -> TickerHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut ops: SlotMap<DrawOpId, ActiveOp> = SlotMap::with_key();
        let mut interval = tokio::time::interval(budget.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            loop {
                match rx.try_recv() {
                    Ok(TickerMsg::Submit(sub)) => {
                        tracing::debug!(
                            player = %sub.player_name,
                            label = sub.op.label(),
                            estimate = sub.op.blocks_total_estimate(),
                            "operation queued"
                        );
                        ops.insert(ActiveOp { sub: *sub, ticks: 0 });
                    }
                    Ok(TickerMsg::Cancel { conn_id }) => {
                        for active in ops.values_mut() {
                            if active.sub.conn_id == conn_id {
                                active.sub.op.cancel();
                            }
                        }
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => return,
                }
            }

            let mut finished: Vec<DrawOpId> = Vec::new();
            for (id, active) in ops.iter_mut() {
                let deadline = Instant::now() + budget.time_slice;
                active.sub.op.draw_batch(
                    &world,
                    active.sub.policy.as_ref(),
                    &db,
                    budget.max_blocks,
                    deadline,
                );
                active.ticks += 1;

                if active.sub.op.is_finished() {
                    finished.push(id);
                } else if active.ticks % PROGRESS_EVERY_TICKS == 0 {
                    let _ = active.sub.notice.send(SessionNotice::Progress {
                        label: active.sub.op.label().to_string(),
                        drawn: active.sub.op.blocks_drawn(),
                        estimate: active.sub.op.blocks_total_estimate(),
                    });
                }
            }

            for id in finished {
                let Some(active) = ops.remove(id) else { continue };
                let op = active.sub.op;
                let cancelled = op.state() == OpState::Cancelled;
                let (label, drawn, skipped) =
                    (op.label().to_string(), op.blocks_drawn(), op.blocks_skipped());
                tracing::info!(
                    player = %active.sub.player_name,
                    label = %label,
                    drawn,
                    skipped,
                    cancelled,
                    "operation finished"
                );

                let verb = if cancelled { "cancelled" } else { "finished" };
                let _ = bus.send(Broadcast {
                    source_conn: Some(active.sub.conn_id),
                    text: format!(
                        "* {} {verb} {label}: {drawn} blocks",
                        active.sub.player_name
                    )
                    .into(),
                });
                let undo = op.into_undo();
                let _ = active.sub.notice.send(SessionNotice::Finished {
                    label,
                    drawn,
                    skipped,
                    cancelled,
                    too_large_to_undo: undo.too_large_to_undo(),
                    undo,
                });
            }
        }
    });

    TickerHandle { tx }
}
