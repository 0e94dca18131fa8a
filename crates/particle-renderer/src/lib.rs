//! # Particle Renderer
//!
//! Orbit camera, point-sprite renderer over the simulation's store buffers,
//! ground grid, and ground-plane picking.

pub mod camera;
pub mod picking;
pub mod renderer;

pub use camera::*;
pub use picking::*;
pub use renderer::*;
