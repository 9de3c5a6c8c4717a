//! Rays

use crate::vector::Vec3;

/// Half-line `origin + t * direction` for `t >= 0`
///
/// `direction` is unit length after `new`. Distances reported by the
/// intersection tests are therefore world-space lengths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize() }
    }

    /// Ray leaving `from` towards `to`
    #[inline]
    pub fn from_points(from: Vec3, to: Vec3) -> Self {
        Self::new(from, to - from)
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// False for a degenerate zero direction, which no test can hit with
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.direction != Vec3::ZERO
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self { origin: Vec3::ZERO, direction: Vec3::Z }
    }
}
