//! Uniform block shared by all simulation kernels

use bytemuck::{Pod, Zeroable};
use particle_physics::{
    GridLayout, Tunables, COLOR_HASH_SHIFT, FLOOR_FRICTION, IMPULSE_JITTER_BIAS,
    IMPULSE_JITTER_SCALE, IMPULSE_RADIUS, IMPULSE_STRENGTH,
};

/// GPU copy of the tunables plus the fixed layout constants (matches WGSL `SimParams`).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SimParams {
    // x: gravity, y: bounce, z: friction, w: size
    pub physics: [f32; 4],

    // xyz: impulse point, w: padding
    pub impulse: [f32; 4],

    // x: radius, y: strength, z: jitter scale, w: jitter bias
    pub impulse_shape: [f32; 4],

    // x: spacing, y: offset, z: floor friction, w: padding
    pub grid: [f32; 4],

    // x: particle count, y: grid side, z: color hash shift, w: padding
    pub counts: [u32; 4],
}

impl SimParams {
    pub fn new(tunables: &Tunables, grid: &GridLayout) -> Self {
        let p = tunables.impulse_point;
        Self {
            physics: [
                tunables.gravity,
                tunables.bounce,
                tunables.friction,
                tunables.size,
            ],
            impulse: [p.x, p.y, p.z, 0.0],
            impulse_shape: [
                IMPULSE_RADIUS,
                IMPULSE_STRENGTH,
                IMPULSE_JITTER_SCALE,
                IMPULSE_JITTER_BIAS,
            ],
            grid: [grid.spacing, grid.offset(), FLOOR_FRICTION, 0.0],
            counts: [grid.particle_count, grid.side, COLOR_HASH_SHIFT, 0],
        }
    }
}
