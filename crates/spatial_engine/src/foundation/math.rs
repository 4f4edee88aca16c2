//! Math utilities and types
//!
//! Provides the vector and matrix aliases used by the scene graph, plus the
//! per-channel local transform description carried by every spatial.

pub use nalgebra::{
    Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type (column-major storage, as handed to the draw backend)
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// One optional component of a local transform
///
/// An `Unset` channel contributes identity when the world matrix is built and
/// is skipped by keyframe interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransformChannel<T> {
    /// Channel carries no value
    #[default]
    Unset,
    /// Channel carries an explicit value
    Set(T),
}

impl<T: Copy> TransformChannel<T> {
    /// Value of the channel, if set
    pub fn get(&self) -> Option<T> {
        match self {
            Self::Unset => None,
            Self::Set(value) => Some(*value),
        }
    }

    /// Whether the channel carries a value
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

/// Local translation, rotation and scale of a spatial relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalTransform {
    /// Translation relative to the parent
    pub translation: TransformChannel<Vec3>,

    /// Rotation relative to the parent
    pub rotation: TransformChannel<Quat>,

    /// Per-axis scale
    pub scale: TransformChannel<Vec3>,
}

impl LocalTransform {
    /// Create a transform with every channel unset
    pub fn identity() -> Self {
        Self::default()
    }

    /// Whether any channel carries a value
    pub fn is_identity(&self) -> bool {
        !self.translation.is_set() && !self.rotation.is_set() && !self.scale.is_set()
    }

    /// Convert to a transformation matrix: translate, then rotate, then scale
    pub fn to_matrix(&self) -> Mat4 {
        let mut matrix = Mat4::identity();
        if let Some(translation) = self.translation.get() {
            matrix *= Mat4::new_translation(&translation);
        }
        if let Some(rotation) = self.rotation.get() {
            matrix *= rotation.to_homogeneous();
        }
        if let Some(scale) = self.scale.get() {
            matrix *= Mat4::new_nonuniform_scaling(&scale);
        }
        matrix
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::*;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Rotation of `angle_degrees` around `axis`
    ///
    /// A zero-length axis yields the identity rotation.
    pub fn rotation_degrees(angle_degrees: f32, axis: Vec3) -> Quat {
        Unit::try_new(axis, f32::EPSILON)
            .map_or_else(Quat::identity, |axis| Quat::from_axis_angle(&axis, deg_to_rad(angle_degrees)))
    }
}
