//! Keyframes

use std::time::Duration;

use crate::foundation::math::{utils, Quat, TransformChannel, Vec3};

/// Target local transform at a point in time
///
/// Unset channels are left alone by the animation, except translation,
/// which a prepared animation fills with zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame {
    time: Duration,
    /// Translation at this frame
    pub translation: TransformChannel<Vec3>,
    /// Rotation at this frame
    pub rotation: TransformChannel<Quat>,
    /// Scale at this frame
    pub scale: TransformChannel<Vec3>,
}

impl KeyFrame {
    /// Frame at `time` with every channel unset
    pub fn new(time: Duration) -> Self {
        Self {
            time,
            translation: TransformChannel::Unset,
            rotation: TransformChannel::Unset,
            scale: TransformChannel::Unset,
        }
    }

    /// Frame at a signed millisecond offset; negative offsets are clamped to zero
    pub fn at_millis(millis: i64) -> Self {
        let millis = u64::try_from(millis).unwrap_or_else(|_| {
            log::warn!("Keyframe time {millis}ms is negative, clamping to 0");
            0
        });
        Self::new(Duration::from_millis(millis))
    }

    /// Set the translation channel
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = TransformChannel::Set(translation);
        self
    }

    /// Set the rotation channel
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = TransformChannel::Set(rotation);
        self
    }

    /// Set the rotation channel as `angle_degrees` around `axis`
    pub fn with_rotation_degrees(self, angle_degrees: f32, axis: Vec3) -> Self {
        self.with_rotation(utils::rotation_degrees(angle_degrees, axis))
    }

    /// Set the scale channel
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = TransformChannel::Set(scale);
        self
    }

    /// Offset from the start of the animation
    pub fn time(&self) -> Duration {
        self.time
    }
}
