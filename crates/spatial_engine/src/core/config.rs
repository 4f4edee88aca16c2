//! # Engine Configuration
//!
//! Configuration structures for the simulation actor, the shared camera
//! projection and the orientation sensor filters.
//!
//! ## Configuration Categories
//!
//! - **Simulation Config**: fixed tick rate of the simulation actor
//! - **Projection Config**: field of view and clip planes
//! - **Sensor Config**: moving-average filter shape and dead-band thresholds
//! - **Engine Config**: the top-level file format tying them together

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// # Simulation Configuration
///
/// Pacing of the simulation actor that consumes input, runs picking and
/// advances animations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// Ticks per second
    pub target_tick_rate: u32,
}

impl SimulationConfig {
    /// Create a simulation configuration with the default tick rate
    pub fn new() -> Self {
        Self { target_tick_rate: 25 }
    }

    /// Set the tick rate
    pub fn with_tick_rate(mut self, ticks_per_second: u32) -> Self {
        self.target_tick_rate = ticks_per_second;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.target_tick_rate == 0 {
            return Err("target_tick_rate must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Projection Configuration
///
/// Perspective parameters applied to the projection shared by all cameras.
/// The viewport size is not part of the file; it arrives with the surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectionConfig {
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Near clip distance
    pub z_near: f32,
    /// Far clip distance
    pub z_far: f32,
}

impl ProjectionConfig {
    /// Create a projection configuration
    pub fn new(fov_y_degrees: f32, z_near: f32, z_far: f32) -> Self {
        Self { fov_y_degrees, z_near, z_far }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return Err(format!("fov_y_degrees must be in (0, 180), got {}", self.fov_y_degrees));
        }
        if self.z_near <= 0.0 {
            return Err(format!("z_near must be positive, got {}", self.z_near));
        }
        if self.z_far <= self.z_near {
            return Err(format!("z_far ({}) must exceed z_near ({})", self.z_far, self.z_near));
        }
        Ok(())
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self::new(45.0, 1.0, 100.0)
    }
}

/// # Sensor Configuration
///
/// Shape of the moving-average filters smoothing the accelerometer and
/// magnetometer streams, and the dead-band below which a new reading is
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorConfig {
    /// Window length of each averaging pass
    pub samples: usize,
    /// Number of cascaded passes
    pub passes: usize,
    /// Nominal sensor rate used to fill gaps between timestamps
    pub sample_rate_hz: f64,
    /// Minimum per-component accelerometer change accepted
    pub accelerometer_threshold: f32,
    /// Minimum per-component magnetometer change accepted
    pub magnetometer_threshold: f32,
}

impl SensorConfig {
    /// Create a sensor configuration
    pub fn new() -> Self {
        Self {
            samples: 25,
            passes: 3,
            sample_rate_hz: 50.0,
            accelerometer_threshold: 1.0,
            magnetometer_threshold: 5.0,
        }
    }

    /// Set the filter shape
    pub fn with_filter(mut self, samples: usize, passes: usize) -> Self {
        self.samples = samples;
        self.passes = passes;
        self
    }

    /// Set the dead-band thresholds
    pub fn with_thresholds(mut self, accelerometer: f32, magnetometer: f32) -> Self {
        self.accelerometer_threshold = accelerometer;
        self.magnetometer_threshold = magnetometer;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.samples == 0 || self.passes == 0 {
            return Err("sensor filter needs at least one sample and one pass".to_string());
        }
        if self.sample_rate_hz < 0.0 {
            return Err(format!("sample_rate_hz must not be negative, got {}", self.sample_rate_hz));
        }
        if self.accelerometer_threshold < 0.0 || self.magnetometer_threshold < 0.0 {
            return Err("sensor thresholds must not be negative".to_string());
        }
        Ok(())
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Engine Configuration
///
/// This is the main configuration structure applications should load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Simulation actor pacing
    pub simulation: SimulationConfig,
    /// Shared camera projection
    pub projection: ProjectionConfig,
    /// Orientation sensor filtering
    pub sensors: SensorConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            simulation: SimulationConfig::default(),
            projection: ProjectionConfig::default(),
            sensors: SensorConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the simulation configuration
    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    /// Set the projection configuration
    pub fn with_projection(mut self, projection: ProjectionConfig) -> Self {
        self.projection = projection;
        self
    }

    /// Set the sensor configuration
    pub fn with_sensors(mut self, sensors: SensorConfig) -> Self {
        self.sensors = sensors;
        self
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<(), String> {
        self.simulation.validate()?;
        self.projection.validate()?;
        self.sensors.validate()?;
        Ok(())
    }

    /// Initialize logging at the configured level
    ///
    /// `RUST_LOG` still overrides the level when it is set.
    pub fn init_logging(&self) {
        crate::foundation::logging::init_with_level(&self.log_level);
        log::debug!("Logging initialized at {}", self.log_level);
    }

    /// Load a configuration file and validate it
    pub fn load_validated(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}
