//! Easing curves mapping linear progress to eased progress

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Progress curve applied between two keyframes
///
/// Every curve maps 0 to 0 and 1 to 1. Input outside `0..=1` is clamped.
#[derive(Clone, Default)]
pub enum Easing {
    /// Constant speed
    #[default]
    Linear,
    /// Starts slow, speeds up
    Accelerate,
    /// Starts fast, slows down
    Decelerate,
    /// Slow at both ends: `cos((t + 1)π) / 2 + 0.5`
    AccelerateDecelerate,
    /// Application-supplied curve
    Custom(Arc<dyn Fn(f32) -> f32 + Send + Sync>),
}

impl Easing {
    /// Wrap a custom curve
    pub fn custom(curve: impl Fn(f32) -> f32 + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(curve))
    }

    /// Eased progress for linear progress `t`
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Accelerate => t * t,
            Self::Decelerate => 1.0 - (1.0 - t) * (1.0 - t),
            Self::AccelerateDecelerate => ((t + 1.0) * PI).cos() * 0.5 + 0.5,
            Self::Custom(curve) => curve(t),
        }
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("Linear"),
            Self::Accelerate => f.write_str("Accelerate"),
            Self::Decelerate => f.write_str("Decelerate"),
            Self::AccelerateDecelerate => f.write_str("AccelerateDecelerate"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}
