//! Pointer picking against the ground plane.
//!
//! The cursor is unprojected into a world-space ray and intersected with the
//! horizontal pick plane. Misses are not errors; they just produce no hit.

use crate::camera::Camera;
use glam::{Vec2, Vec3};
use particle_physics::FLOOR_HEIGHT;

/// Half the side of the square pick plane centred at the origin.
pub const GROUND_HALF_EXTENT: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Normalized
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray through a cursor position given in physical pixels.
    pub fn from_screen(camera: &Camera, cursor: Vec2, viewport: Vec2) -> Self {
        let ndc = Vec2::new(
            2.0 * cursor.x / viewport.x - 1.0,
            1.0 - 2.0 * cursor.y / viewport.y,
        );
        Self {
            origin: camera.position(),
            direction: camera.ray_direction(ndc),
        }
    }
}

/// Bounded horizontal plane the pointer is picked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlane {
    pub height: f32,
    pub half_extent: f32,
}

impl Default for GroundPlane {
    fn default() -> Self {
        Self {
            height: FLOOR_HEIGHT,
            half_extent: GROUND_HALF_EXTENT,
        }
    }
}

impl GroundPlane {
    pub fn intersect(&self, ray: &Ray) -> Option<Vec3> {
        if ray.direction.y.abs() < 1e-8 {
            return None;
        }
        let t = (self.height - ray.origin.y) / ray.direction.y;
        if t < 0.0 {
            return None;
        }

        let hit = ray.at(t);
        (hit.x.abs() <= self.half_extent && hit.z.abs() <= self.half_extent).then_some(hit)
    }

    /// Pick the ground under a cursor position.
    pub fn pick(&self, camera: &Camera, cursor: Vec2, viewport: Vec2) -> Option<Vec3> {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return None;
        }
        self.intersect(&Ray::from_screen(camera, cursor, viewport))
    }
}
