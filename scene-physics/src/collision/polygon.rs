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
//! Convex polygon collision image and the swept separating-axis test
//!
//! The polygon is described by a basis in `[-1, 1]` object space. The
//! instance polygon is the basis scaled by half the object size with flips
//! applied; it is cached and only rebuilt when the basis, size or flips
//! change.

use crate::collision::image::{effective_velocity, CollisionImage, ObjectPose};
use crate::collision::info::{CollisionInfo, ContactList};
use crate::collision::material::CollisionMaterial;
use crate::math::Bounds;
use glam::Vec2;
use smallvec::SmallVec;
use std::any::Any;
use tracing::trace;

/// Vertex storage for world-space polygons
pub type PolygonVertices = SmallVec<[Vec2; 8]>;

const BASIS_TOLERANCE: f32 = 1.0e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
struct InstanceKey {
    size: Vec2,
    flip_x: bool,
    flip_y: bool,
}

/// Convex polygon collision image
#[derive(Debug, Clone)]
pub struct PolygonImage {
    basis: Vec<Vec2>,
    priority: f32,
    material: Option<CollisionMaterial>,
    instance: Vec<Vec2>,
    instance_key: Option<InstanceKey>,
    dirty: bool,
}

impl PolygonImage {
    /// Create an image from a counter-clockwise convex basis
    ///
    /// # Panics
    ///
    /// Panics if the basis has fewer than three vertices, leaves `[-1, 1]`,
    /// or is not convex and counter-clockwise
    pub fn new(basis: Vec<Vec2>) -> Self {
        validate_basis(&basis);
        PolygonImage {
            basis,
            priority: 0.0,
            material: None,
            instance: Vec::new(),
            instance_key: None,
            dirty: true,
        }
    }

    /// Image covering the whole object rectangle
    pub fn square() -> Self {
        Self::new(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ])
    }

    /// Builder: set the priority
    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: set the material
    pub fn with_material(mut self, material: CollisionMaterial) -> Self {
        self.material = Some(material);
        self
    }

    /// Set the test priority
    pub fn set_priority(&mut self, priority: f32) {
        self.priority = priority;
    }

    /// Set or clear the material
    pub fn set_material(&mut self, material: Option<CollisionMaterial>) {
        self.material = material;
    }

    /// Basis polygon in `[-1, 1]` object space
    pub fn collision_poly_basis(&self) -> &[Vec2] {
        &self.basis
    }

    /// Replace the basis polygon
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`PolygonImage::new`]
    pub fn set_collision_poly_basis(&mut self, basis: Vec<Vec2>) {
        validate_basis(&basis);
        self.basis = basis;
        self.dirty = true;
    }

    /// True until the instance polygon is rebuilt
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Cached object-space instance polygon
    ///
    /// Empty before the first `prepare`.
    pub fn collision_poly(&self) -> &[Vec2] {
        &self.instance
    }

    fn rebuild(&mut self, key: InstanceKey) {
        self.instance.clear();
        self.instance.extend(self.basis.iter().map(|b| scale_vertex(*b, &key)));
        if key.flip_x != key.flip_y {
            self.instance.reverse();
        }
        self.instance_key = Some(key);
        self.dirty = false;
    }

    /// Object polygon transformed into world space
    ///
    /// Uses the cached instance polygon when it matches the pose, otherwise
    /// builds the vertices on the fly.
    pub fn world_polygon(&self, pose: &ObjectPose) -> PolygonVertices {
        let key = InstanceKey {
            size: pose.size,
            flip_x: pose.flip_x,
            flip_y: pose.flip_y,
        };
        let rotation = Vec2::from_angle(pose.rotation);
        if !self.dirty && self.instance_key == Some(key) {
            return self
                .instance
                .iter()
                .map(|v| rotation.rotate(*v) + pose.position)
                .collect();
        }

        let mut vertices: PolygonVertices = self
            .basis
            .iter()
            .map(|b| rotation.rotate(scale_vertex(*b, &key)) + pose.position)
            .collect();
        if key.flip_x != key.flip_y {
            vertices.reverse();
        }
        vertices
    }
}

impl Default for PolygonImage {
    fn default() -> Self {
        Self::square()
    }
}

impl CollisionImage for PolygonImage {
    fn priority(&self) -> f32 {
        self.priority
    }

    fn material(&self) -> Option<&CollisionMaterial> {
        self.material.as_ref()
    }

    fn prepare(&mut self, pose: &ObjectPose) {
        let key = InstanceKey {
            size: pose.size,
            flip_x: pose.flip_x,
            flip_y: pose.flip_y,
        };
        if self.dirty || self.instance_key != Some(key) {
            self.rebuild(key);
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn world_bounds(&self, pose: &ObjectPose) -> Bounds {
        let vertices = self.world_polygon(pose);
        Bounds::from_points(&vertices).unwrap_or_else(|| Bounds::from_center(pose.position, Vec2::ZERO))
    }

    fn test_move(
        &self,
        dt: &mut f32,
        velocity: Vec2,
        pose: &ObjectPose,
        other: &dyn CollisionImage,
        other_pose: &ObjectPose,
        other_velocity: Vec2,
        out: &mut ContactList,
    ) {
        let Some(other) = other.as_polygon() else {
            trace!("Skipping collision test against a non-polygon image");
            return;
        };

        let ours = self.world_polygon(pose);
        let theirs = other.world_polygon(other_pose);
        let relative = effective_velocity(velocity, pose, other_velocity, other_pose);

        if let Some(hit) = sweep_polygons(&ours, relative, &theirs, *dt + out.epsilon()) {
            out.offer(
                dt,
                CollisionInfo::new(hit.time, hit.position, hit.normal, hit.penetration),
            );
        }
    }

    fn as_polygon(&self) -> Option<&PolygonImage> {
        Some(self)
    }

    fn clone_image(&self) -> Box<dyn CollisionImage> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn scale_vertex(basis: Vec2, key: &InstanceKey) -> Vec2 {
    let half = key.size.abs() * 0.5;
    let sx = if key.flip_x { -1.0 } else { 1.0 };
    let sy = if key.flip_y { -1.0 } else { 1.0 };
    Vec2::new(basis.x * half.x * sx, basis.y * half.y * sy)
}

fn validate_basis(basis: &[Vec2]) {
    assert!(
        basis.len() >= 3,
        "Collision polygon basis needs at least 3 vertices, got {}",
        basis.len()
    );
    for v in basis {
        assert!(
            v.x.abs() <= 1.0 + BASIS_TOLERANCE && v.y.abs() <= 1.0 + BASIS_TOLERANCE,
            "Collision polygon basis vertex {:?} lies outside [-1, 1]",
            v
        );
    }
    let n = basis.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = basis[i];
        let b = basis[(i + 1) % n];
        let c = basis[(i + 2) % n];
        area += a.perp_dot(b);
        assert!(
            (b - a).perp_dot(c - b) >= -BASIS_TOLERANCE,
            "Collision polygon basis must be convex and counter-clockwise"
        );
    }
    assert!(area > 0.0, "Collision polygon basis must be convex and counter-clockwise");
}

/// Result of a swept polygon test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweptHit {
    /// Time of impact, 0 when overlapping at the start
    pub time: f32,
    /// Contact point at the time of impact
    pub position: Vec2,
    /// Unit normal pointing from the other polygon toward the mover
    pub normal: Vec2,
    /// Minimum translation that separates the mover, zero unless overlapping
    pub penetration: Vec2,
}

/// Sweep polygon `a` along `velocity` against static polygon `b`
///
/// Both polygons must be convex and counter-clockwise in world space.
///
/// # Returns
///
/// The first contact no later than `max_time`, or `None`
pub fn sweep_polygons(a: &[Vec2], velocity: Vec2, b: &[Vec2], max_time: f32) -> Option<SweptHit> {
    if a.len() < 3 || b.len() < 3 {
        return None;
    }

    let mut enter = f32::NEG_INFINITY;
    let mut exit = f32::INFINITY;
    let mut enter_normal = Vec2::ZERO;
    let mut min_overlap = f32::INFINITY;
    let mut overlap_normal = Vec2::ZERO;

    for axis in edge_normals(a).chain(edge_normals(b)) {
        let (min_a, max_a) = project(a, axis);
        let (min_b, max_b) = project(b, axis);
        let speed = velocity.dot(axis);

        if max_a <= min_b {
            if speed <= 0.0 {
                return None;
            }
            let t_enter = (min_b - max_a) / speed;
            if t_enter > enter {
                enter = t_enter;
                enter_normal = -axis;
            }
            exit = exit.min((max_b - min_a) / speed);
        } else if max_b <= min_a {
            if speed >= 0.0 {
                return None;
            }
            let t_enter = (max_b - min_a) / speed;
            if t_enter > enter {
                enter = t_enter;
                enter_normal = axis;
            }
            exit = exit.min((min_b - max_a) / speed);
        } else {
            let push_positive = max_b - min_a;
            let push_negative = max_a - min_b;
            let (depth, direction) = if push_positive < push_negative {
                (push_positive, axis)
            } else {
                (push_negative, -axis)
            };
            if depth < min_overlap {
                min_overlap = depth;
                overlap_normal = direction;
            }
            if speed > 0.0 {
                exit = exit.min(push_positive / speed);
            } else if speed < 0.0 {
                exit = exit.min(push_negative / -speed);
            }
        }

        if enter > exit || enter > max_time {
            return None;
        }
    }

    if enter == f32::NEG_INFINITY {
        // Overlapping on every axis
        if overlap_normal == Vec2::ZERO {
            return None;
        }
        return Some(SweptHit {
            time: 0.0,
            position: contact_point(a, b, overlap_normal),
            normal: overlap_normal,
            penetration: overlap_normal * min_overlap,
        });
    }

    let time = enter.max(0.0);
    let moved: PolygonVertices = a.iter().map(|v| *v + velocity * time).collect();
    let position = contact_point(&moved, b, enter_normal);
    Some(SweptHit {
        time,
        position,
        normal: enter_normal,
        penetration: Vec2::ZERO,
    })
}

fn edge_normals(polygon: &[Vec2]) -> impl Iterator<Item = Vec2> + '_ {
    let n = polygon.len();
    (0..n).filter_map(move |i| {
        let edge = polygon[(i + 1) % n] - polygon[i];
        Vec2::new(edge.y, -edge.x).try_normalize()
    })
}

fn project(polygon: &[Vec2], axis: Vec2) -> (f32, f32) {
    polygon
        .iter()
        .map(|v| v.dot(axis))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)))
}

/// Middle of the span shared by the facing features of `a` and `b`
///
/// `normal` points from `b` toward `a`. The vertices of each polygon that
/// face the other are projected onto the contact tangent and the two spans
/// are clipped against each other. Along the normal the point lies halfway
/// between both features, which coincide at the time of impact.
fn contact_point(a: &[Vec2], b: &[Vec2], normal: Vec2) -> Vec2 {
    let tangent = normal.perp();
    let (a_lo, a_hi, a_depth) = support_span(a, -normal, tangent);
    let (b_lo, b_hi, b_depth) = support_span(b, normal, tangent);
    // Disjoint spans (corner against corner) give the middle of the gap
    let along = (a_lo.max(b_lo) + a_hi.min(b_hi)) * 0.5;
    let across = (b_depth - a_depth) * 0.5;
    tangent * along + normal * across
}

/// Tangent span and support distance of the vertices furthest along `direction`
fn support_span(polygon: &[Vec2], direction: Vec2, tangent: Vec2) -> (f32, f32, f32) {
    let (_, best) = project(polygon, direction);
    let tolerance = 1.0e-4 * (1.0 + best.abs());
    let (lo, hi) = polygon
        .iter()
        .filter(|v| v.dot(direction) >= best - tolerance)
        .map(|v| v.dot(tangent))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)));
    (lo, hi, best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose_at(x: f32, y: f32, size: f32) -> ObjectPose {
        ObjectPose::new(Vec2::new(x, y), Vec2::splat(size))
    }

    #[test]
    fn test_basis_round_trip() {
        let basis = vec![Vec2::new(0.0, -1.0), Vec2::new(1.0, 1.0), Vec2::new(-1.0, 1.0)];
        let mut image = PolygonImage::square();
        image.set_collision_poly_basis(basis.clone());
        assert_eq!(image.collision_poly_basis(), basis.as_slice());
        assert!(image.is_dirty());
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let mut image = PolygonImage::square();
        let pose = pose_at(0.0, 0.0, 4.0);
        image.prepare(&pose);
        let first = image.collision_poly().to_vec();
        assert!(!image.is_dirty());
        image.prepare(&pose);
        assert_eq!(image.collision_poly(), first.as_slice());
        assert_eq!(first[0], Vec2::new(-2.0, -2.0));
        assert_eq!(first[2], Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_single_flip_keeps_counter_clockwise() {
        let mut image = PolygonImage::new(vec![Vec2::new(-1.0, -1.0), Vec2::new(1.0, -1.0), Vec2::new(0.0, 1.0)]);
        let mut pose = pose_at(0.0, 0.0, 2.0);
        pose.flip_y = true;
        image.prepare(&pose);

        let poly = image.collision_poly();
        let n = poly.len();
        let area: f32 = (0..n).map(|i| poly[i].perp_dot(poly[(i + 1) % n])).sum();
        assert!(area > 0.0);
        assert!(poly.contains(&Vec2::new(0.0, -1.0)));
    }

    #[test]
    fn test_size_change_rebuilds() {
        let mut image = PolygonImage::square();
        image.prepare(&pose_at(0.0, 0.0, 2.0));
        image.prepare(&pose_at(0.0, 0.0, 6.0));
        assert_eq!(image.collision_poly()[2], Vec2::new(3.0, 3.0));
    }

    #[test]
    #[should_panic(expected = "convex and counter-clockwise")]
    fn test_clockwise_basis_rejected() {
        PolygonImage::new(vec![Vec2::new(-1.0, -1.0), Vec2::new(-1.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, -1.0)]);
    }

    #[test]
    #[should_panic(expected = "outside [-1, 1]")]
    fn test_basis_out_of_range_rejected() {
        PolygonImage::new(vec![Vec2::new(-2.0, -1.0), Vec2::new(1.0, -1.0), Vec2::new(0.0, 1.0)]);
    }

    #[test]
    fn test_sweep_box_onto_box() {
        let a = PolygonImage::square().world_polygon(&pose_at(0.0, 5.0, 2.0));
        let b = PolygonImage::square().world_polygon(&pose_at(0.0, 0.0, 2.0));
        let hit = sweep_polygons(&a, Vec2::new(0.0, -10.0), &b, 1.0).unwrap();
        assert!((hit.time - 0.3).abs() < 1e-5);
        assert!((hit.normal - Vec2::Y).length() < 1e-5);
        assert!((hit.position - Vec2::new(0.0, 1.0)).length() < 1e-4);
        assert_eq!(hit.penetration, Vec2::ZERO);
    }

    #[test]
    fn test_sweep_misses_when_out_of_time() {
        let a = PolygonImage::square().world_polygon(&pose_at(0.0, 5.0, 2.0));
        let b = PolygonImage::square().world_polygon(&pose_at(0.0, 0.0, 2.0));
        assert!(sweep_polygons(&a, Vec2::new(0.0, -1.0), &b, 1.0).is_none());
        assert!(sweep_polygons(&a, Vec2::new(0.0, 10.0), &b, 1.0).is_none());
        assert!(sweep_polygons(&a, Vec2::ZERO, &b, 1.0).is_none());
    }

    #[test]
    fn test_sweep_passing_beside_misses() {
        let a = PolygonImage::square().world_polygon(&pose_at(-5.0, 3.0, 2.0));
        let b = PolygonImage::square().world_polygon(&pose_at(0.0, 0.0, 2.0));
        assert!(sweep_polygons(&a, Vec2::new(10.0, 0.0), &b, 1.0).is_none());
    }

    #[test]
    fn test_overlap_reports_penetration() {
        let a = PolygonImage::square().world_polygon(&pose_at(0.0, 1.5, 2.0));
        let b = PolygonImage::square().world_polygon(&pose_at(0.0, 0.0, 2.0));
        let hit = sweep_polygons(&a, Vec2::ZERO, &b, 1.0).unwrap();
        assert_eq!(hit.time, 0.0);
        assert!((hit.normal - Vec2::Y).length() < 1e-5);
        assert!((hit.penetration - Vec2::new(0.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_rotated_polygon_sweep() {
        let mut pose = pose_at(5.0, 0.0, 2.0);
        pose.rotation = std::f32::consts::FRAC_PI_4;
        let diamond = PolygonImage::square().world_polygon(&pose);
        let wall = PolygonImage::square().world_polygon(&pose_at(0.0, 0.0, 2.0));

        let hit = sweep_polygons(&diamond, Vec2::new(-10.0, 0.0), &wall, 1.0).unwrap();
        let gap = 5.0 - 2.0f32.sqrt() - 1.0;
        assert!((hit.time - gap / 10.0).abs() < 1e-4);
        assert!((hit.normal - Vec2::X).length() < 1e-4);
        assert!((hit.position - Vec2::new(1.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_contact_point_is_middle_of_shared_face() {
        let a = PolygonImage::square().world_polygon(&pose_at(1.5, 5.0, 2.0));
        let b = PolygonImage::square().world_polygon(&pose_at(0.0, 0.0, 2.0));
        let hit = sweep_polygons(&a, Vec2::new(0.0, -10.0), &b, 1.0).unwrap();
        assert!((hit.time - 0.3).abs() < 1e-5);
        assert!((hit.position - Vec2::new(0.75, 1.0)).length() < 1e-4, "contact {}", hit.position);
    }

    #[test]
    fn test_overlap_contact_point_is_inside_both() {
        let a = PolygonImage::square().world_polygon(&pose_at(1.0, 1.5, 2.0));
        let b = PolygonImage::square().world_polygon(&pose_at(0.0, 0.0, 2.0));
        let hit = sweep_polygons(&a, Vec2::ZERO, &b, 1.0).unwrap();
        assert!((hit.normal - Vec2::Y).length() < 1e-5);
        assert!((hit.position - Vec2::new(0.5, 0.75)).length() < 1e-4, "contact {}", hit.position);
    }
}
