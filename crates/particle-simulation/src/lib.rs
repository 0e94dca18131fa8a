//! # Particle Simulation Engine
//!
//! GPU particle store driven by three compute kernels (init, integrate, impulse)
//! submitted through a single ordered queue.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod params;
pub mod queue;
pub mod simulation;

pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use params::*;
pub use queue::*;
pub use simulation::*;
