//! Region geometries: where a draw operation goes.
//!
//! A region turns selection marks into a bounding box plus a resumable
//! coordinate cursor. Each member coordinate is yielded exactly once, in a
//! fixed deterministic order, so stopping a batch anywhere and resuming
//! later is behaviorally identical to one uninterrupted pass.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::brush::{ReplayBrush, ReplayTarget};
use super::clipboard::Clipboard;
use crate::blockdb::BlockDbEntry;
use crate::error::EngineError;
use crate::geometry::BoundingBox;
use crate::undo::UndoState;
use crate::world::World;
use crate::world::block::BlockId;
use crate::world::position::BlockPos;

/// What `begin` learned about the region.
#[derive(Debug, Clone, Copy)]
pub struct RegionInfo {
    pub bounds: BoundingBox,
    /// Upper estimate of coordinates the region will yield. Used for the
    /// rank draw-ceiling check and progress reporting.
    pub estimate: u64,
}

pub trait Region: Send {
    /// How many selection marks this geometry consumes.
    fn expected_marks(&self) -> usize;

    /// Compute bounds and estimate from the marks. May read the grid (cut
    /// captures its clipboard here) but never mutates it. An error aborts
    /// the command with zero side effects.
    fn begin(&mut self, marks: &[BlockPos], world: &World) -> Result<RegionInfo, EngineError>;

    /// Next coordinate, advancing the saved cursor. `None` once exhausted.
    fn next(&mut self, world: &World) -> Option<BlockPos>;
}

// ── Box cursor ───────────────────────────────────────────────────────────

/// Shared resumable cursor over a bounding box: x-major, y-middle, z-minor.
struct BoxCursor {
    bounds: BoundingBox,
    next: Option<BlockPos>,
}

impl BoxCursor {
    fn new(bounds: BoundingBox) -> Self {
        Self {
            bounds,
            next: Some(bounds.min),
        }
    }

    fn advance(&mut self) -> Option<BlockPos> {
        let current = self.next?;
        let b = self.bounds;
        let mut pos = current;
        pos.z += 1;
        if pos.z > b.max.z {
            pos.z = b.min.z;
            pos.y += 1;
            if pos.y > b.max.y {
                pos.y = b.min.y;
                pos.x += 1;
            }
        }
        self.next = if pos.x > b.max.x { None } else { Some(pos) };
        Some(current)
    }
}

// ── Cuboid ───────────────────────────────────────────────────────────────

/// Axis-aligned box spanned by two marks.
pub struct CuboidRegion {
    cursor: Option<BoxCursor>,
}

impl CuboidRegion {
    pub fn new() -> Self {
        Self { cursor: None }
    }
}

impl Default for CuboidRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl Region for CuboidRegion {
    fn expected_marks(&self) -> usize {
        2
    }

    fn begin(&mut self, marks: &[BlockPos], _world: &World) -> Result<RegionInfo, EngineError> {
        let bounds = BoundingBox::from_corners(marks[0], marks[1]);
        self.cursor = Some(BoxCursor::new(bounds));
        Ok(RegionInfo {
            bounds,
            estimate: bounds.volume(),
        })
    }

    fn next(&mut self, _world: &World) -> Option<BlockPos> {
        self.cursor.as_mut()?.advance()
    }
}

// ── Sphere ───────────────────────────────────────────────────────────────

/// Ball around mark 0 with radius reaching mark 1. Iterates the enclosing
/// box, yielding only coordinates within the radius.
pub struct SphereRegion {
    cursor: Option<BoxCursor>,
    center: BlockPos,
    radius_sq: f64,
}

impl SphereRegion {
    pub fn new() -> Self {
        Self {
            cursor: None,
            center: BlockPos::new(0, 0, 0),
            radius_sq: 0.0,
        }
    }

    fn member(&self, pos: BlockPos) -> bool {
        let dx = (pos.x - self.center.x) as f64;
        let dy = (pos.y - self.center.y) as f64;
        let dz = (pos.z - self.center.z) as f64;
        dx * dx + dy * dy + dz * dz <= self.radius_sq
    }
}

impl Default for SphereRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl Region for SphereRegion {
    fn expected_marks(&self) -> usize {
        2
    }

    fn begin(&mut self, marks: &[BlockPos], _world: &World) -> Result<RegionInfo, EngineError> {
        self.center = marks[0];
        let dx = (marks[1].x - marks[0].x) as f64;
        let dy = (marks[1].y - marks[0].y) as f64;
        let dz = (marks[1].z - marks[0].z) as f64;
        let radius = (dx * dx + dy * dy + dz * dz).sqrt();
        self.radius_sq = radius * radius;

        let bounds = BoundingBox::around(self.center, radius.ceil() as i32);
        self.cursor = Some(BoxCursor::new(bounds));
        let estimate = ((4.0 / 3.0) * std::f64::consts::PI * radius.powi(3)).ceil() as u64;
        Ok(RegionInfo {
            bounds,
            estimate: estimate.max(1),
        })
    }

    fn next(&mut self, _world: &World) -> Option<BlockPos> {
        loop {
            let pos = self.cursor.as_mut()?.advance()?;
            if self.member(pos) {
                return Some(pos);
            }
        }
    }
}

// ── Line ─────────────────────────────────────────────────────────────────

/// 3D Bresenham walk from mark 0 to mark 1, endpoints inclusive.
///
/// The step sequence is short and duplicate-free, so it is precomputed at
/// begin time and the cursor is a plain index.
pub struct LineRegion {
    points: Vec<BlockPos>,
    cursor: usize,
}

impl LineRegion {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            cursor: 0,
        }
    }

    fn trace(a: BlockPos, b: BlockPos) -> Vec<BlockPos> {
        let dx = (b.x - a.x).abs();
        let dy = (b.y - a.y).abs();
        let dz = (b.z - a.z).abs();
        let sx = if b.x > a.x { 1 } else { -1 };
        let sy = if b.y > a.y { 1 } else { -1 };
        let sz = if b.z > a.z { 1 } else { -1 };
        let dmax = dx.max(dy).max(dz);

        let mut points = Vec::with_capacity(dmax as usize + 1);
        let (mut x, mut y, mut z) = (a.x, a.y, a.z);
        let (mut ex, mut ey, mut ez) = (dmax / 2, dmax / 2, dmax / 2);
        points.push(a);
        for _ in 0..dmax {
            ex -= dx;
            if ex < 0 {
                ex += dmax;
                x += sx;
            }
            ey -= dy;
            if ey < 0 {
                ey += dmax;
                y += sy;
            }
            ez -= dz;
            if ez < 0 {
                ez += dmax;
                z += sz;
            }
            points.push(BlockPos::new(x, y, z));
        }
        points
    }
}

impl Default for LineRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl Region for LineRegion {
    fn expected_marks(&self) -> usize {
        2
    }

    fn begin(&mut self, marks: &[BlockPos], _world: &World) -> Result<RegionInfo, EngineError> {
        self.points = Self::trace(marks[0], marks[1]);
        self.cursor = 0;
        Ok(RegionInfo {
            bounds: BoundingBox::from_corners(marks[0], marks[1]),
            estimate: self.points.len() as u64,
        })
    }

    fn next(&mut self, _world: &World) -> Option<BlockPos> {
        let pos = self.points.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(pos)
    }
}

// ── Cut ──────────────────────────────────────────────────────────────────

/// Box of two marks, with an eager one-time capture of the covered region
/// into a clipboard buffer before any mutation begins.
///
/// The clipboard lands in a shared slot so the command layer can move it
/// into the session once `begin` succeeds.
pub struct CutRegion {
    cursor: Option<BoxCursor>,
    slot: Arc<Mutex<Option<Clipboard>>>,
}

impl CutRegion {
    pub fn new(slot: Arc<Mutex<Option<Clipboard>>>) -> Self {
        Self { cursor: None, slot }
    }
}

impl Region for CutRegion {
    fn expected_marks(&self) -> usize {
        2
    }

    fn begin(&mut self, marks: &[BlockPos], world: &World) -> Result<RegionInfo, EngineError> {
        let bounds = BoundingBox::from_corners(marks[0], marks[1]);
        let clipboard = Clipboard::capture(world, bounds);
        *self.slot.lock().expect("clipboard slot poisoned") = Some(clipboard);
        self.cursor = Some(BoxCursor::new(bounds));
        Ok(RegionInfo {
            bounds,
            estimate: bounds.volume(),
        })
    }

    fn next(&mut self, _world: &World) -> Option<BlockPos> {
        self.cursor.as_mut()?.advance()
    }
}

// ── Paste ────────────────────────────────────────────────────────────────

/// Destination box for a clipboard: mark 0 is the minimum corner, extents
/// come from the clipboard. Walks the box in clipboard capture order so the
/// paste brush cursor stays aligned.
pub struct PasteRegion {
    cursor: Option<BoxCursor>,
    dims: (u64, u64, u64),
}

impl PasteRegion {
    pub fn new(clipboard: &Clipboard) -> Self {
        Self {
            cursor: None,
            dims: clipboard.dims(),
        }
    }
}

impl Region for PasteRegion {
    fn expected_marks(&self) -> usize {
        1
    }

    fn begin(&mut self, marks: &[BlockPos], _world: &World) -> Result<RegionInfo, EngineError> {
        let origin = marks[0];
        let (dx, dy, dz) = self.dims;
        let far = BlockPos::new(
            origin.x.saturating_add(dx as i32 - 1),
            origin.y.saturating_add(dy as i32 - 1),
            origin.z.saturating_add(dz as i32 - 1),
        );
        let bounds = BoundingBox::from_corners(origin, far);
        self.cursor = Some(BoxCursor::new(bounds));
        Ok(RegionInfo {
            bounds,
            estimate: bounds.volume(),
        })
    }

    fn next(&mut self, _world: &World) -> Option<BlockPos> {
        self.cursor.as_mut()?.advance()
    }
}

// ── Flood fill ───────────────────────────────────────────────────────────

/// Breadth-first fill from a seed mark across same-block neighbors, bounded
/// by a maximum extent box around the seed. `plane` restricts the walk to
/// the seed's horizontal layer (2D fill).
pub struct FillRegion {
    plane: bool,
    max_extent: i32,
    bounds: Option<BoundingBox>,
    target: BlockId,
    queue: VecDeque<BlockPos>,
    visited: HashSet<BlockPos>,
}

impl FillRegion {
    pub fn new(plane: bool, max_extent: i32) -> Self {
        Self {
            plane,
            max_extent,
            bounds: None,
            target: BlockId::AIR,
            queue: VecDeque::new(),
            visited: HashSet::new(),
        }
    }
}

impl Region for FillRegion {
    fn expected_marks(&self) -> usize {
        1
    }

    fn begin(&mut self, marks: &[BlockPos], world: &World) -> Result<RegionInfo, EngineError> {
        if self.max_extent <= 0 {
            return Err(EngineError::Validation("fill extent must be positive".into()));
        }
        let seed = marks[0];
        self.target = world.get_block(seed);

        let mut bounds = BoundingBox::around(seed, self.max_extent);
        if self.plane {
            bounds.min.y = seed.y;
            bounds.max.y = seed.y;
        }
        self.bounds = Some(bounds);
        self.queue.clear();
        self.visited.clear();
        self.queue.push_back(seed);
        self.visited.insert(seed);

        // The member count is unknowable before walking; the clamped box
        // volume is the conservative estimate the draw ceiling sees.
        Ok(RegionInfo {
            bounds,
            estimate: bounds.volume(),
        })
    }

    fn next(&mut self, world: &World) -> Option<BlockPos> {
        let bounds = self.bounds?;
        let pos = self.queue.pop_front()?;

        let neighbors = if self.plane {
            pos.horizontal_neighbors().to_vec()
        } else {
            pos.neighbors().to_vec()
        };
        for n in neighbors {
            if bounds.contains(n) && !self.visited.contains(&n) && world.get_block(n) == self.target
            {
                self.visited.insert(n);
                self.queue.push_back(n);
            }
        }
        Some(pos)
    }
}

// ── Image plane ──────────────────────────────────────────────────────────

/// Vertical plane spanned by two marks: the box must be one block thick
/// along x or z. Iterates the plane like any other box.
pub struct ImageRegion {
    cursor: Option<BoxCursor>,
}

impl ImageRegion {
    pub fn new() -> Self {
        Self { cursor: None }
    }
}

impl Default for ImageRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl Region for ImageRegion {
    fn expected_marks(&self) -> usize {
        2
    }

    fn begin(&mut self, marks: &[BlockPos], _world: &World) -> Result<RegionInfo, EngineError> {
        let bounds = BoundingBox::from_corners(marks[0], marks[1]);
        if bounds.x_len() > 1 && bounds.z_len() > 1 {
            return Err(EngineError::Validation(
                "image marks must form a vertical plane (one block thick)".into(),
            ));
        }
        self.cursor = Some(BoxCursor::new(bounds));
        Ok(RegionInfo {
            bounds,
            estimate: bounds.volume(),
        })
    }

    fn next(&mut self, _world: &World) -> Option<BlockPos> {
        self.cursor.as_mut()?.advance()
    }
}

// ── Replay ───────────────────────────────────────────────────────────────

/// A region that is not a contiguous shape at all: the coordinate set of a
/// change snapshot, visited most-recent-change-first. Built together with
/// the matching [`ReplayBrush`].
pub struct ReplayRegion {
    coords: Vec<BlockPos>,
    cursor: usize,
}

impl ReplayRegion {
    /// From a BlockDB lookup snapshot (entries most-recent-first).
    ///
    /// Repeated coordinates collapse to one visit: the restore target is the
    /// *oldest* entry's prior block, the staleness check expects the *newest*
    /// entry's resulting block, and the visit keeps the newest entry's place
    /// in the order.
    pub fn from_entries(entries: &[BlockDbEntry], label: &str) -> (ReplayRegion, ReplayBrush) {
        let mut coords = Vec::new();
        let mut targets: HashMap<BlockPos, ReplayTarget> = HashMap::new();
        for entry in entries {
            let pos = entry.pos();
            match targets.get_mut(&pos) {
                None => {
                    coords.push(pos);
                    targets.insert(
                        pos,
                        ReplayTarget {
                            restore: entry.old_block,
                            expect: Some(entry.new_block),
                        },
                    );
                }
                Some(target) => {
                    // Older entry for the same coordinate: its prior block is
                    // closer to the original state.
                    target.restore = entry.old_block;
                }
            }
        }
        (
            ReplayRegion { coords, cursor: 0 },
            ReplayBrush::new(targets, label),
        )
    }

    /// From a command's own undo log, most-recent mutation first. No
    /// staleness check: the log never leaves the session that wrote it.
    ///
    /// A coordinate recorded more than once (merged multi-level undo logs)
    /// collapses to one visit restoring the oldest recorded block.
    pub fn from_undo(undo: &UndoState, label: &str) -> (ReplayRegion, ReplayBrush) {
        let mut coords = Vec::with_capacity(undo.len());
        let mut targets: HashMap<BlockPos, ReplayTarget> = HashMap::with_capacity(undo.len());
        for entry in undo.entries().iter().rev() {
            match targets.get_mut(&entry.pos) {
                None => {
                    coords.push(entry.pos);
                    targets.insert(
                        entry.pos,
                        ReplayTarget {
                            restore: entry.previous,
                            expect: None,
                        },
                    );
                }
                Some(target) => {
                    target.restore = entry.previous;
                }
            }
        }
        (
            ReplayRegion { coords, cursor: 0 },
            ReplayBrush::new(targets, label),
        )
    }
}

impl Region for ReplayRegion {
    fn expected_marks(&self) -> usize {
        0
    }

    fn begin(&mut self, _marks: &[BlockPos], _world: &World) -> Result<RegionInfo, EngineError> {
        self.cursor = 0;
        let mut bounds = BoundingBox::point(self.coords.first().copied().unwrap_or(BlockPos::new(0, 0, 0)));
        for &pos in &self.coords {
            bounds.expand_to(pos);
        }
        Ok(RegionInfo {
            bounds,
            estimate: self.coords.len() as u64,
        })
    }

    fn next(&mut self, _world: &World) -> Option<BlockPos> {
        let pos = self.coords.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(pos)
    }
}
