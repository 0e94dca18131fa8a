//! Runtime-tunable physical parameters

use crate::constants::*;
use glam::Vec3;

/// Scalars an external controller may change at any time.
///
/// Kernels only ever read these. The host owns the single copy and pushes it to
/// the device before each submission that needs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tunables {
    /// Added to `velocity.y` every step; expected in `[-0.0098, 0]`
    pub gravity: f32,
    /// Vertical restitution on floor contact; expected in `[0.1, 1]`
    pub bounce: f32,
    /// Velocity multiplier per step; expected in `[0.96, 0.99]`
    pub friction: f32,
    /// Sprite size, only consumed by the renderer
    pub size: f32,
    /// Origin of the most recent impulse
    pub impulse_point: Vec3,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            bounce: DEFAULT_BOUNCE,
            friction: DEFAULT_FRICTION,
            size: DEFAULT_SIZE,
            impulse_point: Vec3::ZERO,
        }
    }
}

impl Tunables {
    pub fn is_finite(&self) -> bool {
        self.gravity.is_finite()
            && self.bounce.is_finite()
            && self.friction.is_finite()
            && self.size.is_finite()
            && self.impulse_point.is_finite()
    }
}
