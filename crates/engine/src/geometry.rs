//! Axis-aligned bounding boxes over the block grid.

use crate::world::position::BlockPos;

/// Inclusive axis-aligned box. Valid only when `min <= max` on every axis,
/// which the constructors guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl BoundingBox {
    /// Box spanned by two arbitrary corners (normalized per axis).
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Cube of the given radius around a center point.
    pub fn around(center: BlockPos, radius: i32) -> Self {
        let r = radius.max(0);
        Self {
            min: BlockPos::new(
                center.x.saturating_sub(r),
                center.y.saturating_sub(r),
                center.z.saturating_sub(r),
            ),
            max: BlockPos::new(
                center.x.saturating_add(r),
                center.y.saturating_add(r),
                center.z.saturating_add(r),
            ),
        }
    }

    /// Single-block box.
    pub fn point(pos: BlockPos) -> Self {
        Self { min: pos, max: pos }
    }

    pub fn x_len(&self) -> u64 {
        (self.max.x as i64 - self.min.x as i64 + 1) as u64
    }

    pub fn y_len(&self) -> u64 {
        (self.max.y as i64 - self.min.y as i64 + 1) as u64
    }

    pub fn z_len(&self) -> u64 {
        (self.max.z as i64 - self.min.z as i64 + 1) as u64
    }

    /// Product of the three extents. Never zero for a valid box.
    pub fn volume(&self) -> u64 {
        self.x_len() * self.y_len() * self.z_len()
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Grow this box (if needed) to cover `pos`.
    pub fn expand_to(&mut self, pos: BlockPos) {
        self.min.x = self.min.x.min(pos.x);
        self.min.y = self.min.y.min(pos.y);
        self.min.z = self.min.z.min(pos.z);
        self.max.x = self.max.x.max(pos.x);
        self.max.y = self.max.y.max(pos.y);
        self.max.z = self.max.z.max(pos.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_normalize() {
        let b = BoundingBox::from_corners(BlockPos::new(5, -1, 3), BlockPos::new(-2, 4, 3));
        assert_eq!(b.min, BlockPos::new(-2, -1, 3));
        assert_eq!(b.max, BlockPos::new(5, 4, 3));
        assert_eq!(b.volume(), 8 * 6 * 1);
    }

    #[test]
    fn single_point_volume_is_one() {
        let b = BoundingBox::point(BlockPos::new(1, 2, 3));
        assert_eq!(b.volume(), 1);
        assert!(b.contains(BlockPos::new(1, 2, 3)));
        assert!(!b.contains(BlockPos::new(1, 2, 4)));
    }

    #[test]
    fn expand_to_covers_point() {
        let mut b = BoundingBox::point(BlockPos::new(0, 0, 0));
        b.expand_to(BlockPos::new(-3, 7, 1));
        assert!(b.contains(BlockPos::new(-3, 7, 1)));
        assert!(b.contains(BlockPos::new(0, 0, 0)));
        assert_eq!(b.volume(), 4 * 8 * 2);
    }
}
