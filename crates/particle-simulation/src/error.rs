//! Simulation errors

use crate::dispatch::Phase;
use thiserror::Error;

/// Everything that can go wrong driving the simulation.
///
/// Device and pipeline failures happen at startup and are fatal; there is no
/// partial-initialization recovery.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("no suitable GPU adapter: {0}")]
    AdapterUnavailable(String),

    #[error("failed to create device: {0}")]
    DeviceRequest(String),

    #[error("failed to allocate particle store: {0}")]
    Allocation(String),

    #[error("failed to build {stage}: {message}")]
    Pipeline { stage: &'static str, message: String },

    #[error("device poll failed: {0}")]
    Poll(String),

    #[error("failed to map readback buffer: {0}")]
    BufferMap(String),

    #[error("cannot {operation} while {phase:?}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },

    #[error("particle store must hold at least one particle")]
    EmptyStore,
}

pub type SimulationResult<T> = Result<T, SimulationError>;
