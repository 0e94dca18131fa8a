//! Initial grid placement

use glam::Vec3;

/// Square grid the particles start on, centred around the origin on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub particle_count: u32,
    /// Particles per row, `ceil(sqrt(particle_count))`
    pub side: u32,
    pub spacing: f32,
}

impl GridLayout {
    pub fn new(particle_count: u32, spacing: f32) -> Self {
        Self {
            particle_count,
            side: grid_side(particle_count),
            spacing,
        }
    }

    /// Grid offset in cells; positions are `(offset - col) * spacing`.
    pub fn offset(&self) -> f32 {
        self.side as f32 / 2.0
    }

    /// Starting position of a particle. Y is always the floor.
    pub fn position(&self, index: u32) -> Vec3 {
        debug_assert!(
            index < self.particle_count,
            "particle index {index} out of range (count {})",
            self.particle_count
        );
        let col = (index % self.side) as f32;
        let row = (index / self.side) as f32;
        let offset = self.offset();
        Vec3::new(
            (offset - col) * self.spacing,
            0.0,
            (offset - row) * self.spacing,
        )
    }
}

/// Smallest square side that fits `count` particles.
pub fn grid_side(count: u32) -> u32 {
    if count == 0 {
        return 0;
    }
    let mut side = (count as f64).sqrt().floor() as u32;
    while (side as u64) * (side as u64) < count as u64 {
        side += 1;
    }
    side
}
