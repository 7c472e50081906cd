//! Adapters from parsed draw commands to engine operations.
//!
//! Everything here only *builds* a `DrawOp`; validation and the clipboard
//! capture happen in `DrawOp::begin`, and all mutation happens later on the
//! ticker.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ashlar_engine::blockdb::ContextFlags;
use ashlar_engine::draw::DrawOp;
use ashlar_engine::draw::brush::{Brush, ImageBrush, PasteBrush, ReplaceBrush, SolidBrush};
use ashlar_engine::draw::clipboard::Clipboard;
use ashlar_engine::draw::region::{
    CuboidRegion, CutRegion, FillRegion, ImageRegion, LineRegion, PasteRegion, Region,
    SphereRegion,
};
use ashlar_engine::geometry::BoundingBox;
use ashlar_engine::world::block::BlockId;
use ashlar_engine::world::position::BlockPos;

use crate::block;
use crate::commands::CommandKind;
use crate::config::ServerConfig;
use crate::session::Session;

/// A draw operation ready for `begin` + submission.
pub struct BuiltDraw {
    pub op: DrawOp,
    /// Marks the region consumes, oldest first.
    pub marks: Vec<BlockPos>,
    /// Cut fills this at `begin`; the connection moves it into the session.
    pub cut_slot: Option<Arc<Mutex<Option<Clipboard>>>>,
}

fn parse_block(name: &str) -> Result<BlockId, String> {
    block::by_name(name).ok_or_else(|| format!("unknown block: {name}"))
}

fn marks_for(session: &Session, n: usize) -> Result<Vec<BlockPos>, String> {
    session
        .last_marks(n)
        .ok_or_else(|| format!("this command needs {n} marks, you have {}", session.marks().len()))
}

/// Turn a draw-family command into an unbegun operation.
pub fn build(
    kind: CommandKind,
    args: &[&str],
    session: &Session,
    config: &ServerConfig,
) -> Result<BuiltDraw, String> {
    let player = session.info.player_id;
    let undo_capacity = session.policy.rank().undo_capacity;
    let mut cut_slot = None;

    let (label, marks, region, brush, flags): (
        String,
        Vec<BlockPos>,
        Box<dyn Region>,
        Box<dyn Brush>,
        ContextFlags,
    ) = match kind {
        CommandKind::Cuboid => {
            let [name] = args else {
                return Err("usage: /cuboid <block>".into());
            };
            let target = parse_block(name)?;
            (
                format!("cuboid of {}", block::name_of(target)),
                marks_for(session, 2)?,
                Box::new(CuboidRegion::new()),
                Box::new(SolidBrush::new(target, block::name_of(target))),
                ContextFlags::DRAWN,
            )
        }
        CommandKind::Replace => {
            if args.len() < 2 {
                return Err("usage: /replace <from...> <to>".into());
            }
            let target = parse_block(args[args.len() - 1])?;
            let from: HashSet<BlockId> = args[..args.len() - 1]
                .iter()
                .map(|n| parse_block(n))
                .collect::<Result<_, _>>()?;
            (
                format!("replace with {}", block::name_of(target)),
                marks_for(session, 2)?,
                Box::new(CuboidRegion::new()),
                Box::new(ReplaceBrush::new(from, target, block::name_of(target))),
                ContextFlags::DRAWN | ContextFlags::REPLACED,
            )
        }
        CommandKind::Sphere => {
            let [name] = args else {
                return Err("usage: /sphere <block>".into());
            };
            let target = parse_block(name)?;
            (
                format!("sphere of {}", block::name_of(target)),
                marks_for(session, 2)?,
                Box::new(SphereRegion::new()),
                Box::new(SolidBrush::new(target, block::name_of(target))),
                ContextFlags::DRAWN,
            )
        }
        CommandKind::Line => {
            let [name] = args else {
                return Err("usage: /line <block>".into());
            };
            let target = parse_block(name)?;
            (
                format!("line of {}", block::name_of(target)),
                marks_for(session, 2)?,
                Box::new(LineRegion::new()),
                Box::new(SolidBrush::new(target, block::name_of(target))),
                ContextFlags::DRAWN,
            )
        }
        CommandKind::Fill2d | CommandKind::Fill3d => {
            let [name] = args else {
                return Err("usage: /fill2d|/fill3d <block>".into());
            };
            let target = parse_block(name)?;
            let plane = kind == CommandKind::Fill2d;
            (
                format!("fill of {}", block::name_of(target)),
                marks_for(session, 1)?,
                Box::new(FillRegion::new(plane, config.fill_max_extent)),
                Box::new(SolidBrush::new(target, block::name_of(target))),
                ContextFlags::DRAWN | ContextFlags::FILLED,
            )
        }
        CommandKind::Cut => {
            let fill = match args {
                [] => block::AIR,
                [name] => parse_block(name)?,
                _ => return Err("usage: /cut [block]".into()),
            };
            let slot = Arc::new(Mutex::new(None));
            cut_slot = Some(Arc::clone(&slot));
            (
                "cut".to_string(),
                marks_for(session, 2)?,
                Box::new(CutRegion::new(slot)),
                Box::new(SolidBrush::new(fill, block::name_of(fill))),
                ContextFlags::CUT,
            )
        }
        CommandKind::Paste => {
            if !args.is_empty() {
                return Err("usage: /paste".into());
            }
            let clipboard = session
                .clipboard
                .clone()
                .ok_or("your clipboard is empty; /copy or /cut first")?;
            (
                "paste".to_string(),
                marks_for(session, 1)?,
                Box::new(PasteRegion::new(&clipboard)),
                Box::new(PasteBrush::new(clipboard)),
                ContextFlags::PASTED,
            )
        }
        other => return Err(format!("{other:?} is not a draw command")),
    };

    let op = DrawOp::new(player, label, region, brush, flags, undo_capacity);
    Ok(BuiltDraw {
        op,
        marks,
        cut_slot,
    })
}

/// `/drawimage`: decode off the async runtime, then build like any other
/// draw. Decoding a large PNG can take long enough to stall other
/// connections, so it runs on a blocking worker like the BlockDB lookups do.
pub async fn build_image(path: &str, session: &Session) -> Result<BuiltDraw, String> {
    let marks = marks_for(session, 2)?;
    let plane = BoundingBox::from_corners(marks[0], marks[1]);

    let file = path.to_string();
    let (pixels, width, height) = tokio::task::spawn_blocking(move || {
        let decoded = image::open(&file)
            .map_err(|e| format!("could not read image {file}: {e}"))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let pixels: Vec<[u8; 4]> = decoded.pixels().map(|p| p.0).collect();
        Ok::<_, String>((pixels, width, height))
    })
    .await
    .map_err(|_| "image decode task failed".to_string())??;

    let op = DrawOp::new(
        session.info.player_id,
        format!("image {path}"),
        Box::new(ImageRegion::new()),
        Box::new(ImageBrush::new(
            pixels,
            width,
            height,
            block::image_palette(),
            plane,
        )),
        ContextFlags::DRAWN,
        session.policy.rank().undo_capacity,
    );
    Ok(BuiltDraw {
        op,
        marks,
        cut_slot: None,
    })
}
