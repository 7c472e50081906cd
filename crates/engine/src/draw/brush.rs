//! Brushes: per-coordinate block-selection strategies.
//!
//! A brush is stateless with respect to the grid; its choice is a function of
//! its own state plus the current block it is shown. Some brushes carry a
//! cursor of their own (paste) that advances independently of the region
//! cursor, one step per query.

use std::collections::{HashMap, HashSet};

use super::clipboard::Clipboard;
use crate::error::EngineError;
use crate::geometry::BoundingBox;
use crate::world::World;
use crate::world::block::BlockId;
use crate::world::position::BlockPos;

/// What to do at one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockChoice {
    Paint(BlockId),
    Skip,
}

pub trait Brush: Send {
    /// Validate brush parameters before any mutation. A failure here aborts
    /// the whole command.
    fn begin(&mut self, _world: &World) -> Result<(), EngineError> {
        Ok(())
    }

    /// Choose a block for `pos`, given what the grid currently holds there.
    fn next_block(&mut self, pos: BlockPos, current: BlockId) -> BlockChoice;

    /// Short user-facing description for status messages.
    fn description(&self) -> String;
}

// ── Solid ────────────────────────────────────────────────────────────────

/// Paints one block everywhere.
pub struct SolidBrush {
    block: BlockId,
    label: String,
}

impl SolidBrush {
    pub fn new(block: BlockId, label: impl Into<String>) -> Self {
        Self {
            block,
            label: label.into(),
        }
    }
}

impl Brush for SolidBrush {
    fn next_block(&mut self, _pos: BlockPos, _current: BlockId) -> BlockChoice {
        BlockChoice::Paint(self.block)
    }

    fn description(&self) -> String {
        self.label.clone()
    }
}

// ── Replace ──────────────────────────────────────────────────────────────

/// Paints `to` only where the current block is in the `from` set.
pub struct ReplaceBrush {
    from: HashSet<BlockId>,
    to: BlockId,
    label: String,
}

impl ReplaceBrush {
    pub fn new(from: HashSet<BlockId>, to: BlockId, label: impl Into<String>) -> Self {
        Self {
            from,
            to,
            label: label.into(),
        }
    }
}

impl Brush for ReplaceBrush {
    fn begin(&mut self, _world: &World) -> Result<(), EngineError> {
        if self.from.is_empty() {
            return Err(EngineError::Validation(
                "replace needs at least one source block".into(),
            ));
        }
        Ok(())
    }

    fn next_block(&mut self, _pos: BlockPos, current: BlockId) -> BlockChoice {
        if self.from.contains(&current) {
            BlockChoice::Paint(self.to)
        } else {
            BlockChoice::Skip
        }
    }

    fn description(&self) -> String {
        self.label.clone()
    }
}

// ── Paste ────────────────────────────────────────────────────────────────

/// Feeds out a clipboard buffer one block per query.
///
/// The internal cursor advances on every call, in lockstep with the paste
/// region (which walks the destination box in the clipboard's capture order).
pub struct PasteBrush {
    clipboard: Clipboard,
    cursor: usize,
}

impl PasteBrush {
    pub fn new(clipboard: Clipboard) -> Self {
        Self {
            clipboard,
            cursor: 0,
        }
    }
}

impl Brush for PasteBrush {
    fn begin(&mut self, _world: &World) -> Result<(), EngineError> {
        if self.clipboard.is_empty() {
            return Err(EngineError::Validation("clipboard is empty".into()));
        }
        Ok(())
    }

    fn next_block(&mut self, _pos: BlockPos, _current: BlockId) -> BlockChoice {
        let choice = match self.clipboard.block_at(self.cursor) {
            Some(block) => BlockChoice::Paint(block),
            None => BlockChoice::Skip,
        };
        self.cursor += 1;
        choice
    }

    fn description(&self) -> String {
        format!("paste of {} blocks", self.clipboard.len())
    }
}

// ── Image ────────────────────────────────────────────────────────────────

/// Maps a decoded RGBA image onto a vertical plane, choosing the nearest
/// palette block per pixel. Transparent pixels are skipped.
///
/// Decoding happens in the command layer; the brush only sees raw pixels.
pub struct ImageBrush {
    pixels: Vec<[u8; 4]>,
    width: u32,
    height: u32,
    /// Drawable palette: (block, reference color).
    palette: Vec<(BlockId, [u8; 3])>,
    plane: BoundingBox,
    /// Horizontal axis of the plane runs along x (otherwise z).
    u_is_x: bool,
}

impl ImageBrush {
    pub fn new(
        pixels: Vec<[u8; 4]>,
        width: u32,
        height: u32,
        palette: Vec<(BlockId, [u8; 3])>,
        plane: BoundingBox,
    ) -> Self {
        let u_is_x = plane.x_len() >= plane.z_len();
        Self {
            pixels,
            width,
            height,
            palette,
            plane,
            u_is_x,
        }
    }

    fn nearest(&self, rgb: [u8; 3]) -> BlockId {
        let mut best = self.palette[0].0;
        let mut best_dist = u32::MAX;
        for (block, color) in &self.palette {
            let dist = color
                .iter()
                .zip(rgb.iter())
                .map(|(a, b)| {
                    let d = *a as i32 - *b as i32;
                    (d * d) as u32
                })
                .sum();
            if dist < best_dist {
                best_dist = dist;
                best = *block;
            }
        }
        best
    }
}

impl Brush for ImageBrush {
    fn begin(&mut self, _world: &World) -> Result<(), EngineError> {
        if self.pixels.is_empty() || self.width == 0 || self.height == 0 {
            return Err(EngineError::Validation("image has no pixels".into()));
        }
        if self.palette.is_empty() {
            return Err(EngineError::Validation("image palette is empty".into()));
        }
        Ok(())
    }

    fn next_block(&mut self, pos: BlockPos, _current: BlockId) -> BlockChoice {
        let u = if self.u_is_x {
            (pos.x - self.plane.min.x) as u64
        } else {
            (pos.z - self.plane.min.z) as u64
        };
        let u_len = if self.u_is_x {
            self.plane.x_len()
        } else {
            self.plane.z_len()
        };
        // Image rows run top-down; world y runs bottom-up.
        let v = (self.plane.max.y - pos.y) as u64;
        let v_len = self.plane.y_len();

        // Nearest sampling, stretching the image across the plane.
        let px = ((u * self.width as u64) / u_len).min(self.width as u64 - 1) as u32;
        let py = ((v * self.height as u64) / v_len).min(self.height as u64 - 1) as u32;
        let pixel = self.pixels[(py * self.width + px) as usize];

        if pixel[3] < 128 {
            return BlockChoice::Skip;
        }
        BlockChoice::Paint(self.nearest([pixel[0], pixel[1], pixel[2]]))
    }

    fn description(&self) -> String {
        format!("{}x{} image", self.width, self.height)
    }
}

// ── Replay ───────────────────────────────────────────────────────────────

/// Restore target for one coordinate of a replay.
#[derive(Debug, Clone, Copy)]
pub struct ReplayTarget {
    /// Block to put back.
    pub restore: BlockId,
    /// When set, the coordinate is only touched if the grid still holds this
    /// block; anything else means an unrelated edit landed after the
    /// snapshot, and the coordinate is skipped as stale.
    pub expect: Option<BlockId>,
}

/// Replays previously recorded blocks: the brush behind `/undo` and the
/// bulk-undo flow. Keyed by coordinate so it composes with any region order.
pub struct ReplayBrush {
    targets: HashMap<BlockPos, ReplayTarget>,
    label: String,
}

impl ReplayBrush {
    pub fn new(targets: HashMap<BlockPos, ReplayTarget>, label: impl Into<String>) -> Self {
        Self {
            targets,
            label: label.into(),
        }
    }
}

impl Brush for ReplayBrush {
    fn next_block(&mut self, pos: BlockPos, current: BlockId) -> BlockChoice {
        let Some(target) = self.targets.get(&pos) else {
            return BlockChoice::Skip;
        };
        if let Some(expect) = target.expect {
            if current != expect {
                return BlockChoice::Skip;
            }
        }
        BlockChoice::Paint(target.restore)
    }

    fn description(&self) -> String {
        self.label.clone()
    }
}
