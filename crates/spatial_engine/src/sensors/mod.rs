//! Device orientation from raw motion sensors
//!
//! Accelerometer and magnetometer streams are smoothed by cascaded
//! [`MovingAverageFilter`]s owned by a [`SensorFusion`], which turns the two
//! smoothed vectors into a rotation matrix for orientation-linked cameras.
//! The platform layer feeds samples from its own thread; share the fusion
//! object behind a lock.

pub mod filter;
pub mod fusion;

pub use filter::MovingAverageFilter;
pub use fusion::{SensorFusion, SharedSensorFusion};
