//! Startup configuration
//!
//! Read once before the device is created. The particle count is fixed for the
//! process lifetime; the tunables only seed the runtime values.

use particle_physics::{
    Tunables, DEFAULT_BOUNCE, DEFAULT_FRICTION, DEFAULT_GRAVITY, DEFAULT_PARTICLE_COUNT,
    DEFAULT_SIZE, GRID_SPACING,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PARTICLES_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "particles.toml";

/// Workgroup size baked into the WGSL kernels.
pub const WORKGROUP_SIZE: u32 = 256;

/// Upper bound on the particle count: one store array must fit the default
/// 128 MiB storage binding limit, and the dispatch must fit 65535 workgroups.
pub const MAX_PARTICLE_COUNT: u32 = 8_388_608;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("config validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Initial values for the runtime tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialTunables {
    pub gravity: f32,
    pub bounce: f32,
    pub friction: f32,
    pub size: f32,
}

impl Default for InitialTunables {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            bounce: DEFAULT_BOUNCE,
            friction: DEFAULT_FRICTION,
            size: DEFAULT_SIZE,
        }
    }
}

impl From<InitialTunables> for Tunables {
    fn from(initial: InitialTunables) -> Self {
        Self {
            gravity: initial.gravity,
            bounce: initial.bounce,
            friction: initial.friction,
            size: initial.size,
            ..Tunables::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub particle_count: u32,
    pub grid_spacing: f32,
    pub workgroup_size: u32,
    pub tunables: InitialTunables,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            grid_spacing: GRID_SPACING,
            workgroup_size: WORKGROUP_SIZE,
            tunables: InitialTunables::default(),
        }
    }
}

impl SimulationConfig {
    /// Load from `$PARTICLES_CONFIG`, else `./particles.toml`, else defaults.
    pub fn load() -> ConfigResult<Self> {
        match Self::config_path() {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_toml_file(path)
            }
            None => {
                log::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.particle_count == 0 {
            return Err(ConfigError::Validation(
                "particle_count must be greater than zero".into(),
            ));
        }
        if self.particle_count > MAX_PARTICLE_COUNT {
            return Err(ConfigError::Validation(format!(
                "particle_count {} exceeds the maximum of {}",
                self.particle_count, MAX_PARTICLE_COUNT
            )));
        }
        if self.workgroup_size != WORKGROUP_SIZE {
            return Err(ConfigError::Validation(format!(
                "workgroup_size must be {} (got {})",
                WORKGROUP_SIZE, self.workgroup_size
            )));
        }
        if !(self.grid_spacing.is_finite() && self.grid_spacing > 0.0) {
            return Err(ConfigError::Validation(format!(
                "grid_spacing must be a positive number (got {})",
                self.grid_spacing
            )));
        }
        if !Tunables::from(self.tunables).is_finite() {
            return Err(ConfigError::Validation("tunables must be finite".into()));
        }
        Ok(())
    }

    pub fn initial_tunables(&self) -> Tunables {
        self.tunables.into()
    }
}
