// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Small geometry helpers shared by the collision and physics modules

use glam::Vec2;

/// Axis-aligned bounds in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds from two corners (order independent)
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Bounds {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create bounds from a center and half extents
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        let half = half_extents.abs();
        Bounds {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest bounds containing every point, or `None` for an empty slice
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Bounds { min: *first, max: *first };
        for p in rest {
            bounds.min = bounds.min.min(*p);
            bounds.max = bounds.max.max(*p);
        }
        Some(bounds)
    }

    /// Center point
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Half extents
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Inclusive overlap test
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Grow uniformly by `border` on every side
    pub fn inflate(&self, border: f32) -> Self {
        Bounds {
            min: self.min - Vec2::splat(border),
            max: self.max + Vec2::splat(border),
        }
    }

    /// Extend the bounds to cover a translation by `offset`
    pub fn sweep(&self, offset: Vec2) -> Self {
        Bounds {
            min: self.min.min(self.min + offset),
            max: self.max.max(self.max + offset),
        }
    }
}

/// 2D cross product of two vectors (z component of the 3D cross)
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross of a scalar angular velocity with a vector: `w × r`
#[inline]
pub fn cross_scalar(w: f32, r: Vec2) -> Vec2 {
    Vec2::new(-w * r.y, w * r.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_sweep_covers_both_ends() {
        let b = Bounds::from_center(Vec2::ZERO, Vec2::splat(1.0));
        let swept = b.sweep(Vec2::new(0.0, -4.0));
        assert_eq!(swept.min, Vec2::new(-1.0, -5.0));
        assert_eq!(swept.max, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_bounds_overlap_is_inclusive() {
        let a = Bounds::new(Vec2::ZERO, Vec2::ONE);
        let b = Bounds::new(Vec2::ONE, Vec2::splat(2.0));
        let c = Bounds::new(Vec2::splat(1.5), Vec2::splat(2.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_cross_helpers() {
        assert_eq!(cross(Vec2::X, Vec2::Y), 1.0);
        assert_eq!(cross_scalar(2.0, Vec2::X), Vec2::new(0.0, 2.0));
    }
}
