//! Per-client connection task: login, line dispatch, and report delivery.
//!
//! The first line a client sends is its player name; every later line is
//! either a `/command` or chat. The task multiplexes three sources: client
//! lines, ticker notices about its own operations, and the shared broadcast
//! bus.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

use ashlar_engine::draw::DrawOp;
use ashlar_engine::draw::clipboard::Clipboard;
use ashlar_engine::geometry::BoundingBox;
use ashlar_engine::world::position::BlockPos;

use super::ServerCtx;
use crate::commands::{self, CommandKind};
use crate::event_bus;
use crate::permissions::RankPolicy;
use crate::session::{Session, SessionNotice};
use crate::ticker::Submission;

struct LineWriter {
    inner: OwnedWriteHalf,
}

impl LineWriter {
    async fn send(&mut self, text: impl AsRef<str>) -> anyhow::Result<()> {
        self.inner.write_all(text.as_ref().as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        Ok(())
    }
}

pub async fn handle(stream: TcpStream, ctx: ServerCtx, conn_id: u64) -> anyhow::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut out = LineWriter { inner: write_half };

    out.send("Welcome to Ashlar. What is your name?").await?;
    let name = lines
        .next_line()
        .await?
        .context("closed before login")?
        .trim()
        .to_string();
    if name.len() < 2 || name.len() > 16 || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        out.send("Names are 2-16 letters, digits, or underscores.").await?;
        return Ok(());
    }

    let rank = ctx.config.rank_for(&name);
    let info = match ctx.registry.register(conn_id, &name, &rank.name) {
        Ok(info) => info,
        Err(msg) => {
            out.send(msg).await?;
            return Ok(());
        }
    };
    let policy = Arc::new(RankPolicy::new(rank, Arc::clone(&ctx.protected)));
    let mut session = Session::new(info, policy, ctx.config.undo_history_depth);

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<SessionNotice>();
    let mut bus_rx = ctx.bus.subscribe();

    out.send(format!(
        "Logged in as {} ({}). {} player(s) online. /help for commands.",
        session.info.name,
        session.info.rank_name,
        ctx.registry.player_count()
    ))
    .await?;
    let _ = ctx.bus.send(event_bus::Broadcast {
        source_conn: Some(conn_id),
        text: format!("* {} joined", session.info.name).into(),
    });

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(line) => {
                        let line = line.trim();
                        if !line.is_empty() {
                            handle_line(line, &ctx, &mut session, &mut out, &notice_tx).await?;
                        }
                    }
                }
            }
            Some(notice) = notice_rx.recv() => {
                handle_notice(notice, &mut session, &mut out).await?;
            }
            report = bus_rx.recv() => {
                match report {
                    Ok(b) => {
                        if b.source_conn != Some(conn_id) {
                            out.send(b.text.as_ref()).await?;
                        }
                    }
                    // A lagged reader just loses old lines; keep going.
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    ctx.ticker.cancel(conn_id);
    ctx.registry.deregister(conn_id);
    let _ = ctx.bus.send(event_bus::Broadcast {
        source_conn: Some(conn_id),
        text: format!("* {} left", session.info.name).into(),
    });
    Ok(())
}

/// Begin a built operation and hand it to the ticker.
async fn launch(
    mut op: DrawOp,
    marks: &[BlockPos],
    cut_slot: Option<Arc<std::sync::Mutex<Option<Clipboard>>>>,
    ctx: &ServerCtx,
    session: &mut Session,
    out: &mut LineWriter,
    notice_tx: &mpsc::UnboundedSender<SessionNotice>,
) -> anyhow::Result<()> {
    if let Err(e) = op.begin(&ctx.world, marks, session.policy.as_ref()) {
        return out.send(e.to_string()).await;
    }
    if let Some(slot) = cut_slot {
        session.clipboard = slot.lock().expect("clipboard slot poisoned").take();
        if let Some(clipboard) = &session.clipboard {
            out.send(format!("Copied {} blocks to your clipboard.", clipboard.len()))
                .await?;
        }
    }
    if op.is_finished() {
        return out.send("Nothing to do.").await;
    }

    out.send(format!(
        "Drawing {}: about {} blocks",
        op.label(),
        op.blocks_total_estimate()
    ))
    .await?;
    session.op_in_flight = true;
    ctx.ticker.submit(Submission {
        op,
        conn_id: session.info.conn_id,
        player_name: session.info.name.clone(),
        policy: Arc::clone(&session.policy),
        notice: notice_tx.clone(),
    });
    Ok(())
}

async fn handle_notice(
    notice: SessionNotice,
    session: &mut Session,
    out: &mut LineWriter,
) -> anyhow::Result<()> {
    match notice {
        SessionNotice::Progress {
            label,
            drawn,
            estimate,
        } => {
            out.send(format!("{label}: {drawn}/{estimate} blocks...")).await?;
        }
        SessionNotice::Finished {
            label,
            drawn,
            skipped,
            cancelled,
            too_large_to_undo,
            undo,
        } => {
            session.op_in_flight = false;
            let verb = if cancelled { "Cancelled" } else { "Finished" };
            out.send(format!("{verb} {label}: {drawn} blocks drawn, {skipped} skipped."))
                .await?;
            if too_large_to_undo {
                out.send(format!("Note: {label} was too large to undo fully."))
                    .await?;
            }
            session.push_undo(undo);
        }
    }
    Ok(())
}

async fn handle_line(
    line: &str,
    ctx: &ServerCtx,
    session: &mut Session,
    out: &mut LineWriter,
    notice_tx: &mpsc::UnboundedSender<SessionNotice>,
) -> anyhow::Result<()> {
    let Some(stripped) = line.strip_prefix('/') else {
        // Chat. The bus copy skips this connection, so echo locally.
        let text = event_bus::chat(session.info.conn_id, &session.info.name, line);
        out.send(text.text.as_ref()).await?;
        let _ = ctx.bus.send(text);
        return Ok(());
    };

    let mut tokens = stripped.split_whitespace();
    let Some(cmd) = tokens.next().map(str::to_ascii_lowercase) else {
        return Ok(());
    };
    let args: Vec<&str> = tokens.collect();
    let Some(def) = ctx.commands.get(&cmd) else {
        return out.send(format!("Unknown command /{cmd}. Try /help.")).await;
    };

    match def.kind {
        CommandKind::Help => {
            for line in ctx.commands.help_lines() {
                out.send(line).await?;
            }
        }
        CommandKind::Who => {
            let mut players = ctx.registry.snapshot();
            players.sort_by(|a, b| a.name.cmp(&b.name));
            let listing: Vec<String> = players
                .iter()
                .map(|p| format!("{} ({})", p.name, p.rank_name))
                .collect();
            out.send(format!("Online: {}", listing.join(", "))).await?;
        }
        CommandKind::Mark => {
            let coords: Vec<i32> = args.iter().filter_map(|a| a.parse().ok()).collect();
            let [x, y, z] = coords[..] else {
                return out.send(def.usage).await;
            };
            let n = session.add_mark(BlockPos::new(x, y, z));
            out.send(format!("Mark #{n} at ({x}, {y}, {z})")).await?;
        }
        CommandKind::Marks => {
            if session.marks().is_empty() {
                out.send("No marks. /mark <x> <y> <z> to place one.").await?;
            } else {
                for (i, m) in session.marks().iter().enumerate() {
                    out.send(format!("#{}: ({}, {}, {})", i + 1, m.x, m.y, m.z)).await?;
                }
            }
        }
        CommandKind::ClearMarks => {
            session.clear_marks();
            out.send("Marks cleared.").await?;
        }
        CommandKind::Copy => {
            let Some(marks) = session.last_marks(2) else {
                return out.send("Copy needs 2 marks.").await;
            };
            let bounds = BoundingBox::from_corners(marks[0], marks[1]);
            let clipboard = Clipboard::capture(&ctx.world, bounds);
            out.send(format!("Copied {} blocks to your clipboard.", clipboard.len()))
                .await?;
            session.clipboard = Some(clipboard);
        }
        CommandKind::Cuboid
        | CommandKind::Replace
        | CommandKind::Sphere
        | CommandKind::Line
        | CommandKind::Fill2d
        | CommandKind::Fill3d
        | CommandKind::Cut
        | CommandKind::Paste => {
            if session.op_in_flight {
                return out
                    .send("You already have a command running; /cancel it first.")
                    .await;
            }
            match commands::draw::build(def.kind, &args, session, &ctx.config) {
                Err(msg) => out.send(msg).await?,
                Ok(built) => {
                    launch(built.op, &built.marks, built.cut_slot, ctx, session, out, notice_tx)
                        .await?
                }
            }
        }
        CommandKind::DrawImage => {
            if session.op_in_flight {
                return out
                    .send("You already have a command running; /cancel it first.")
                    .await;
            }
            let [path] = args[..] else {
                return out.send(def.usage).await;
            };
            match commands::draw::build_image(path, session).await {
                Err(msg) => out.send(msg).await?,
                Ok(built) => {
                    launch(built.op, &built.marks, built.cut_slot, ctx, session, out, notice_tx)
                        .await?
                }
            }
        }
        CommandKind::Cancel => {
            if session.op_in_flight {
                ctx.ticker.cancel(session.info.conn_id);
                out.send("Cancelling...").await?;
            } else {
                out.send("Nothing is running.").await?;
            }
        }
        CommandKind::Undo => {
            if session.op_in_flight {
                return out
                    .send("Wait for your current command to finish first.")
                    .await;
            }
            let levels = match args[..] {
                [] => 1,
                [n] => match n.parse::<usize>() {
                    Ok(n) => n,
                    Err(_) => return out.send(def.usage).await,
                },
                _ => return out.send(def.usage).await,
            };
            match commands::undo::personal_undo(session, levels) {
                Err(msg) => out.send(msg).await?,
                Ok(op) => launch(op, &[], None, ctx, session, out, notice_tx).await?,
            }
        }
        CommandKind::UndoArea | CommandKind::UndoPlayer | CommandKind::UndoPlayerNot => {
            let invert = def.kind == CommandKind::UndoPlayerNot;
            let selector = match crate::bulk_undo::parse_selector(&args, invert) {
                Ok(s) => s,
                Err(msg) => return out.send(msg).await,
            };
            let area = if def.kind == CommandKind::UndoArea {
                let Some(marks) = session.last_marks(2) else {
                    return out.send("Area undo needs 2 marks.").await;
                };
                Some(BoundingBox::from_corners(marks[0], marks[1]))
            } else {
                None
            };
            match crate::bulk_undo::prepare(
                Arc::clone(&ctx.db),
                &ctx.registry,
                session.info.player_id,
                &selector,
                area,
            )
            .await
            {
                Err(msg) => out.send(msg).await?,
                Ok(None) => out.send("Nothing to undo.").await?,
                Ok(Some(pending)) => {
                    out.send(&pending.summary).await?;
                    session.pending_undo = Some(pending);
                }
            }
        }
        CommandKind::Confirm => {
            if session.op_in_flight {
                return out
                    .send("Wait for your current command to finish first.")
                    .await;
            }
            let Some(pending) = session.pending_undo.take() else {
                return out.send("Nothing awaiting confirmation.").await;
            };
            let window = std::time::Duration::from_secs(ctx.config.confirmation_timeout_secs);
            if pending.is_expired(window) {
                return out
                    .send("That confirmation has expired; run the lookup again.")
                    .await;
            }
            let op = commands::undo::bulk_replay(
                session.info.player_id,
                &pending,
                session.policy.rank().undo_capacity,
            );
            launch(op, &[], None, ctx, session, out, notice_tx).await?;
        }
        CommandKind::Deny => {
            if session.pending_undo.take().is_some() {
                out.send("Discarded.").await?;
            } else {
                out.send("Nothing awaiting confirmation.").await?;
            }
        }
    }
    Ok(())
}
