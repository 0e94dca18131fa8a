//! Camera system for 3D visualization

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};

/// Point the camera orbits around.
pub const CAMERA_TARGET: Vec3 = Vec3::new(0.0, -8.0, 0.0);

/// Initial eye position.
pub const CAMERA_EYE: Vec3 = Vec3::new(0.0, 100.0, 100.0);

pub const MIN_DISTANCE: f32 = 5.0;
pub const MAX_DISTANCE: f32 = 200.0;

/// Camera uniform for GPU
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    // Billboard axes in world space
    pub right: [f32; 3],
    pub particle_size: f32,
    pub up: [f32; 3],
    pub _padding: f32,
}

/// Orbit camera for 3D scene navigation
pub struct Camera {
    pub distance: f32,
    pub rotation: Quat,
    pub target: Vec3,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let offset = CAMERA_EYE - CAMERA_TARGET;
        // Tilt the +Z view axis down onto the eye offset.
        let rotation = Quat::from_rotation_x(-offset.y.atan2(offset.z));

        Self {
            distance: offset.length(),
            rotation,
            target: CAMERA_TARGET,
            aspect: width as f32 / height.max(1) as f32,
            fovy: 50.0_f32.to_radians(),
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        let offset = self.rotation * Vec3::new(0.0, 0.0, self.distance);
        self.target + offset
    }

    /// World-space direction of the view ray through `ndc` (x right, y up,
    /// both in [-1, 1]). Normalized.
    pub fn ray_direction(&self, ndc: Vec2) -> Vec3 {
        let half_height = (self.fovy * 0.5).tan();
        let view = Vec3::new(ndc.x * half_height * self.aspect, ndc.y * half_height, -1.0);
        (self.rotation * view).normalize()
    }

    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        // Yaw around world up so the horizon stays level.
        let yaw_rotation = Quat::from_axis_angle(Vec3::Y, -delta_x);

        let right = self.rotation * Vec3::X;
        let pitch_rotation = Quat::from_axis_angle(right, -delta_y);

        self.rotation = yaw_rotation * pitch_rotation * self.rotation;
        self.rotation = self.rotation.normalize();
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance + delta).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        let position = self.position();
        let rotation_matrix = Mat4::from_quat(self.rotation.conjugate());
        let translation_matrix = Mat4::from_translation(-position);
        let view = rotation_matrix * translation_matrix;
        let proj = Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }

    pub fn to_uniform(&self, particle_size: f32) -> CameraUniform {
        CameraUniform {
            view_proj: self.build_view_projection_matrix().to_cols_array_2d(),
            right: (self.rotation * Vec3::X).to_array(),
            particle_size,
            up: (self.rotation * Vec3::Y).to_array(),
            _padding: 0.0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}
