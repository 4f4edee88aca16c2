//! Accelerometer and magnetometer fusion

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::config::SensorConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::sensors::filter::MovingAverageFilter;

/// Fusion object shared between the sensor thread and the simulation actor
pub type SharedSensorFusion = Arc<Mutex<SensorFusion>>;

// Below this the east vector is unusable (free fall, or close to a magnetic pole)
const MIN_EAST_NORM: f32 = 0.1;

/// Holds a reading until a component moves further than `threshold` from it
#[derive(Debug, Clone, Copy)]
struct DeadBand {
    held: [f32; 3],
    threshold: f32,
}

impl DeadBand {
    fn new(threshold: f32) -> Self {
        Self { held: [0.0; 3], threshold }
    }

    fn apply(&mut self, raw: [f32; 3]) -> [f32; 3] {
        let moved = raw
            .iter()
            .zip(&self.held)
            .any(|(value, held)| (value - held).abs() > self.threshold);
        if moved {
            self.held = raw;
        }
        self.held
    }
}

/// Smooths gravity and geomagnetic readings into a device rotation
#[derive(Debug, Clone)]
pub struct SensorFusion {
    accelerometer: MovingAverageFilter,
    magnetometer: MovingAverageFilter,
    accelerometer_band: DeadBand,
    magnetometer_band: DeadBand,
}

impl SensorFusion {
    /// Create filters shaped by `config`
    pub fn new(config: &SensorConfig) -> Self {
        let filter = || {
            MovingAverageFilter::new(config.samples, config.passes, 3).with_sample_rate(config.sample_rate_hz)
        };
        Self {
            accelerometer: filter(),
            magnetometer: filter(),
            accelerometer_band: DeadBand::new(config.accelerometer_threshold),
            magnetometer_band: DeadBand::new(config.magnetometer_threshold),
        }
    }

    /// Wrap in a lock for sharing between threads
    pub fn shared(self) -> SharedSensorFusion {
        Arc::new(Mutex::new(self))
    }

    /// Feed an accelerometer reading taken at `timestamp_ns`
    pub fn on_accelerometer(&mut self, timestamp_ns: i64, reading: [f32; 3]) {
        let held = self.accelerometer_band.apply(reading);
        self.accelerometer.add_sample_at(&held, timestamp_ns);
    }

    /// Feed a magnetometer reading taken at `timestamp_ns`
    pub fn on_magnetometer(&mut self, timestamp_ns: i64, reading: [f32; 3]) {
        let held = self.magnetometer_band.apply(reading);
        self.magnetometer.add_sample_at(&held, timestamp_ns);
    }

    /// Smoothed gravity vector in device coordinates
    pub fn gravity(&self) -> Vec3 {
        self.accelerometer.result3().map_or_else(Vec3::zeros, Vec3::from)
    }

    /// Smoothed geomagnetic vector in device coordinates
    pub fn geomagnetic(&self) -> Vec3 {
        self.magnetometer.result3().map_or_else(Vec3::zeros, Vec3::from)
    }

    /// Rotation from world into device coordinates
    ///
    /// The columns are east, magnetic north and up expressed in device
    /// coordinates, ready to use as a camera orientation. Returns `None`
    /// when the readings cannot define a basis.
    pub fn rotation_matrix(&self) -> Option<Mat4> {
        rotation_from(self.gravity(), self.geomagnetic())
    }
}

/// Orientation basis from a gravity and a geomagnetic vector
pub fn rotation_from(gravity: Vec3, geomagnetic: Vec3) -> Option<Mat4> {
    let east = geomagnetic.cross(&gravity);
    let east_norm = east.norm();
    if east_norm < MIN_EAST_NORM {
        log::trace!("Degenerate sensor basis, east vector norm {east_norm}");
        return None;
    }
    let east = east / east_norm;
    let up = gravity.try_normalize(f32::EPSILON)?;
    let north = up.cross(&east);

    #[rustfmt::skip]
    let rotation = Mat4::new(
        east.x, north.x, up.x, 0.0,
        east.y, north.y, up.y, 0.0,
        east.z, north.z, up.z, 0.0,
        0.0,    0.0,     0.0,  1.0,
    );
    Some(rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> SensorConfig {
        SensorConfig::new().with_filter(4, 2)
    }

    #[test]
    fn test_flat_device_facing_north_is_identity() {
        // Screen up, top edge pointing north with a downward dip
        let rotation = rotation_from(Vec3::new(0.0, 0.0, 9.81), Vec3::new(0.0, 22.0, -40.0)).unwrap();
        assert_relative_eq!(rotation, Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_readings() {
        assert!(rotation_from(Vec3::zeros(), Vec3::new(0.0, 22.0, -40.0)).is_none());
        // Field parallel to gravity
        assert!(rotation_from(Vec3::new(0.0, 0.0, 9.81), Vec3::new(0.0, 0.0, -40.0)).is_none());
    }

    #[test]
    fn test_dead_band_holds_small_changes() {
        let mut band = DeadBand::new(1.0);
        assert_eq!(band.apply([0.5, 0.0, 0.0]), [0.0, 0.0, 0.0]);
        assert_eq!(band.apply([0.0, 0.0, 9.8]), [0.0, 0.0, 9.8]);
        assert_eq!(band.apply([0.3, -0.4, 9.5]), [0.0, 0.0, 9.8]);
    }

    #[test]
    fn test_fusion_produces_rotation_after_samples() {
        let mut fusion = SensorFusion::new(&config());
        assert!(fusion.rotation_matrix().is_none());

        for tick in 0..30 {
            let timestamp = 1_000_000_000 + tick * 20_000_000;
            fusion.on_accelerometer(timestamp, [0.0, 0.0, 9.81]);
            fusion.on_magnetometer(timestamp, [0.0, 22.0, -40.0]);
        }
        assert_relative_eq!(fusion.gravity(), Vec3::new(0.0, 0.0, 9.81), epsilon = 1e-4);
        let rotation = fusion.rotation_matrix().unwrap();
        assert_relative_eq!(rotation, Mat4::identity(), epsilon = 1e-4);
    }
}
