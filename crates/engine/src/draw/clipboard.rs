//! Copy/cut/paste buffer: a captured box of blocks.

use crate::geometry::BoundingBox;
use crate::world::World;
use crate::world::block::BlockId;
use crate::world::position::BlockPos;

/// A snapshot of the blocks inside one bounding box.
///
/// Blocks are stored flat in the same x-major, y-middle, z-minor order the
/// draw cursor walks, so a paste brush can feed them out with a plain index.
#[derive(Clone)]
pub struct Clipboard {
    bounds: BoundingBox,
    blocks: Vec<BlockId>,
}

impl Clipboard {
    /// Eagerly read the covered region out of the grid. Reads only.
    pub fn capture(world: &World, bounds: BoundingBox) -> Self {
        let mut blocks = Vec::with_capacity(bounds.volume() as usize);
        for x in bounds.min.x..=bounds.max.x {
            for y in bounds.min.y..=bounds.max.y {
                for z in bounds.min.z..=bounds.max.z {
                    blocks.push(world.get_block(BlockPos::new(x, y, z)));
                }
            }
        }
        Self { bounds, blocks }
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Extents along x, y, z.
    pub fn dims(&self) -> (u64, u64, u64) {
        (
            self.bounds.x_len(),
            self.bounds.y_len(),
            self.bounds.z_len(),
        )
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block at the given cursor index (capture order).
    pub fn block_at(&self, index: usize) -> Option<BlockId> {
        self.blocks.get(index).copied()
    }
}
