//! Axis-aligned bounding boxes

use crate::vector::Vec3;

/// Box spanned by `min` and `max` corners
///
/// Well-formed when `min <= max` on every axis. Flat boxes, such as the bounds
/// of a triangle lying in an axis plane, are well-formed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    /// Inverted box that any `union` overwrites
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Tightest box around `points`; `EMPTY` for no points
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |acc, &p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        })
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Midpoint of the box along `axis`, the key the median split sorts by
    #[inline]
    pub fn centroid_axis(&self, axis: usize) -> f32 {
        0.5 * (self.min.axis(axis) + self.max.axis(axis))
    }

    /// Axis of greatest extent. On equal extents the lower axis wins.
    pub fn largest_axis(&self) -> usize {
        let size = self.size();
        (1..3).fold(0, |best, axis| {
            if size.axis(axis) > size.axis(best) {
                axis
            } else {
                best
            }
        })
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..3).all(|axis| self.min.axis(axis) <= self.max.axis(axis))
    }

    #[inline]
    pub fn union(&self, other: &AABB) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// True when `other` lies inside this box, touching faces included
    pub fn contains_aabb(&self, other: &AABB) -> bool {
        (0..3).all(|axis| {
            self.min.axis(axis) <= other.min.axis(axis)
                && other.max.axis(axis) <= self.max.axis(axis)
        })
    }
}

impl Default for AABB {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl FromIterator<AABB> for AABB {
    fn from_iter<I: IntoIterator<Item = AABB>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |acc, b| acc.union(&b))
    }
}
