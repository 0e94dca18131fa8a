//! # Particle Physics
//!
//! GPU-free core of the particle field: constants, the particle data layout,
//! the index hash, grid placement, runtime tunables, and reference versions of
//! the init / integrate / impulse kernels.

pub mod constants;
pub mod grid;
pub mod hash;
pub mod kernels;
pub mod particle;
pub mod tunables;

pub use constants::*;
pub use grid::*;
pub use hash::*;
pub use kernels::*;
pub use particle::*;
pub use tunables::*;
