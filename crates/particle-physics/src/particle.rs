//! Per-particle data layout

use crate::constants::COLOR_HASH_SHIFT;
use crate::hash::hash;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// One `vec3<f32>` slot in a GPU storage array.
///
/// WGSL `array<vec3<f32>>` has a 16-byte stride, so every slot carries an
/// explicit fourth lane. The lane is never read by the kernels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PackedVec3 {
    pub xyz: [f32; 3],
    pub w: f32,
}

impl PackedVec3 {
    pub fn new(v: Vec3, w: f32) -> Self {
        Self {
            xyz: v.to_array(),
            w,
        }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::from_array(self.xyz)
    }
}

/// Color assigned to a particle at init. Blue stays at zero.
pub fn particle_color(index: u32) -> Vec3 {
    Vec3::new(
        hash(index),
        hash(index.wrapping_add(COLOR_HASH_SHIFT)),
        0.0,
    )
}

/// Host-side copy of the particle store (structure of arrays).
///
/// Used by the reference kernels and as the target of GPU readbacks. Every
/// array has exactly `len()` entries; the index is the particle's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleStore {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub colors: Vec<Vec3>,
}

impl ParticleStore {
    /// Zeroed store, as freshly allocated device memory would be.
    pub fn zeroed(count: u32) -> Self {
        let count = count as usize;
        Self {
            positions: vec![Vec3::ZERO; count],
            velocities: vec![Vec3::ZERO; count],
            colors: vec![Vec3::ZERO; count],
        }
    }

    /// Rebuild a store from packed GPU slots.
    pub fn from_packed(
        positions: &[PackedVec3],
        velocities: &[PackedVec3],
        colors: &[PackedVec3],
    ) -> Self {
        debug_assert_eq!(positions.len(), velocities.len());
        debug_assert_eq!(positions.len(), colors.len());
        Self {
            positions: positions.iter().map(|p| p.to_vec3()).collect(),
            velocities: velocities.iter().map(|p| p.to_vec3()).collect(),
            colors: colors.iter().map(|p| p.to_vec3()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
