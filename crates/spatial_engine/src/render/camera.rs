//! # Cameras and the Shared Projection
//!
//! A [`Camera`] owns a model (view) matrix and the eye position it was built
//! from. Both live behind one lock so a reader never sees a matrix from one
//! update paired with a position from another. All cameras of a scene share
//! one [`Projection`] through [`SharedProjection`], replacing the
//! process-wide projection state a fixed-function pipeline would keep.
//!
//! ## Conventions
//! - Right-handed, Y-up world; the camera looks down its local -Z axis
//! - Matrices are column-major and handed to the backend unchanged
//! - Screen coordinates are pixels with the origin at the top-left corner
//!
//! ## Model Matrix Invariant
//! The model matrix is always `rotation * translate(-position)`. Every
//! mutator keeps `position` in step with the translation it applies.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::core::config::ProjectionConfig;
use crate::foundation::math::{utils, Mat4, Vec3, Vec4};
use crate::intersection::ray::Ray;

/// Projection shared by every camera of a scene
pub type SharedProjection = Arc<RwLock<Projection>>;

/// Perspective projection plus the viewport values needed to unproject taps
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    fov_y_degrees: f32,
    z_near: f32,
    z_far: f32,
    width: f32,
    height: f32,
    aspect: f32,
    near_half_height: f32,
    matrix: Mat4,
}

impl Default for Projection {
    fn default() -> Self {
        Self::from_config(&ProjectionConfig::default())
    }
}

impl Projection {
    /// Projection with the configured lens on a 1x1 viewport
    ///
    /// The real viewport arrives later through [`Projection::set_viewport`].
    pub fn from_config(config: &ProjectionConfig) -> Self {
        let mut projection = Self {
            fov_y_degrees: config.fov_y_degrees,
            z_near: config.z_near,
            z_far: config.z_far,
            width: 1.0,
            height: 1.0,
            aspect: 1.0,
            near_half_height: 0.0,
            matrix: Mat4::identity(),
        };
        projection.set_perspective(config.fov_y_degrees, 1.0, 1.0, config.z_near, config.z_far);
        projection
    }

    /// Wrap a projection for sharing between cameras
    pub fn shared(self) -> SharedProjection {
        Arc::new(RwLock::new(self))
    }

    /// Set a perspective projection
    ///
    /// # Arguments
    /// * `fov_y_degrees` - Vertical field of view in degrees
    /// * `width`, `height` - Viewport size in pixels
    /// * `z_near`, `z_far` - Clip distances, `0 < z_near < z_far`
    ///
    /// Invalid parameters are logged and leave the projection unchanged.
    pub fn set_perspective(&mut self, fov_y_degrees: f32, width: f32, height: f32, z_near: f32, z_far: f32) {
        if !(width > 0.0 && height > 0.0) {
            log::error!("Invalid viewport {width}x{height}, projection unchanged");
            return;
        }
        if !(z_near > 0.0 && z_far > z_near) {
            log::error!("Invalid clip planes near={z_near} far={z_far}, projection unchanged");
            return;
        }
        if !(fov_y_degrees > 0.0 && fov_y_degrees < 180.0) {
            log::error!("Invalid field of view {fov_y_degrees}, projection unchanged");
            return;
        }

        let tan_half_fov = (utils::deg_to_rad(fov_y_degrees) * 0.5).tan();
        let aspect = width / height;

        let mut matrix = Mat4::zeros();
        matrix[(1, 1)] = 1.0 / tan_half_fov;
        matrix[(0, 0)] = matrix[(1, 1)] / aspect;
        matrix[(2, 2)] = (z_far + z_near) / (z_near - z_far);
        matrix[(2, 3)] = 2.0 * z_far * z_near / (z_near - z_far);
        matrix[(3, 2)] = -1.0;

        self.fov_y_degrees = fov_y_degrees;
        self.z_near = z_near;
        self.z_far = z_far;
        self.width = width;
        self.height = height;
        self.aspect = aspect;
        self.near_half_height = z_near * tan_half_fov;
        self.matrix = matrix;
        log::debug!("Projection set: fov={fov_y_degrees} viewport={width}x{height} near={z_near} far={z_far}");
    }

    /// Keep the lens, change the viewport size
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.set_perspective(self.fov_y_degrees, width, height, self.z_near, self.z_far);
    }

    /// Projection matrix
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Viewport width in pixels
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Viewport height in pixels
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Width divided by height
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near clip distance
    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    /// Far clip distance
    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    /// Vertical field of view in degrees
    pub fn fov_y_degrees(&self) -> f32 {
        self.fov_y_degrees
    }

    /// Half the height of the view frustum at the near plane
    pub fn near_half_height(&self) -> f32 {
        self.near_half_height
    }

    /// Convert pixel coordinates to normalized device coordinates
    ///
    /// NDC range: [-1, 1] where:
    /// - X: -1 = left, +1 = right
    /// - Y: -1 = bottom, +1 = top (screen Y grows downwards)
    pub fn screen_to_ndc(&self, x: f32, y: f32) -> (f32, f32) {
        let half_width = self.width * 0.5;
        let half_height = self.height * 0.5;
        let ndc_x = (x - half_width) / half_width;
        let ndc_y = ((self.height - y) - half_height) / half_height;
        (ndc_x, ndc_y)
    }
}

#[derive(Debug, Clone, Copy)]
struct CameraView {
    model: Mat4,
    position: Vec3,
}

/// Viewpoint into the scene
///
/// Safe to share between the render actor, which reads the model matrix
/// every frame, and the simulation actor, which moves the camera and casts
/// pick rays through it.
#[derive(Debug)]
pub struct Camera {
    projection: SharedProjection,
    view: Mutex<CameraView>,
}

impl Camera {
    /// Create a camera at the origin looking down -Z
    pub fn new(projection: SharedProjection) -> Self {
        Self {
            projection,
            view: Mutex::new(CameraView {
                model: Mat4::identity(),
                position: Vec3::zeros(),
            }),
        }
    }

    /// Projection shared with the other cameras
    pub fn projection(&self) -> &SharedProjection {
        &self.projection
    }

    /// Current projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.read().matrix()
    }

    /// Current model (view) matrix
    pub fn model_matrix(&self) -> Mat4 {
        self.view.lock().model
    }

    /// Eye position in world space
    pub fn position(&self) -> Vec3 {
        self.view.lock().position
    }

    /// Reset to the origin looking down -Z
    pub fn set_identity(&self) {
        let mut view = self.view.lock();
        view.model = Mat4::identity();
        view.position = Vec3::zeros();
    }

    /// Replace the model matrix
    ///
    /// The eye position is recovered from the matrix inverse. A singular
    /// matrix is logged and ignored.
    pub fn set_model_matrix(&self, model: Mat4) {
        let Some(inverse) = model.try_inverse() else {
            log::warn!("Ignoring singular camera model matrix");
            return;
        };
        let mut view = self.view.lock();
        view.model = model;
        view.position = Vec3::new(inverse[(0, 3)], inverse[(1, 3)], inverse[(2, 3)]);
    }

    /// Replace the orientation, keeping the current position
    ///
    /// Only the upper 3x3 part of `rotation` is used.
    pub fn set_rotation_matrix(&self, rotation: &Mat4) {
        let mut orientation = Mat4::identity();
        orientation.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation.fixed_view::<3, 3>(0, 0));

        let mut view = self.view.lock();
        view.model = orientation * Mat4::new_translation(&-view.position);
        log::trace!("Camera rotation replaced at {:?}", view.position);
    }

    /// Point the camera from `eye` at `center` with `up` as the up hint
    ///
    /// Degenerate input (eye equal to center, or up parallel to the view
    /// direction) is logged and ignored.
    pub fn look_at(&self, eye: Vec3, center: Vec3, up: Vec3) {
        let Some(z) = (eye - center).try_normalize(f32::EPSILON) else {
            log::warn!("look_at with eye equal to center ignored");
            return;
        };
        let Some(x) = up.cross(&z).try_normalize(f32::EPSILON) else {
            log::warn!("look_at with up parallel to the view direction ignored");
            return;
        };
        let y = z.cross(&x);

        let rotation = Mat4::new(
            x.x, x.y, x.z, 0.0,
            y.x, y.y, y.z, 0.0,
            z.x, z.y, z.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        let mut view = self.view.lock();
        view.model = rotation * Mat4::new_translation(&-eye);
        view.position = eye;
        log::trace!("Camera looking from {eye:?} at {center:?}");
    }

    /// Move the eye by `offset` in world space
    pub fn translate(&self, offset: Vec3) {
        let mut view = self.view.lock();
        view.model *= Mat4::new_translation(&-offset);
        view.position += offset;
    }

    /// Move the eye to `position`, keeping the orientation
    pub fn set_position(&self, position: Vec3) {
        let mut view = self.view.lock();
        let offset = position - view.position;
        view.model *= Mat4::new_translation(&-offset);
        view.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// World-space ray through the given pixel
    ///
    /// The ray starts at the eye and passes through the pixel's point on the
    /// near plane. Returns `None` when the model matrix cannot be inverted.
    pub fn calculate_pick_ray(&self, x: f32, y: f32) -> Option<Ray> {
        let (unit_x, unit_y, near_half_height, aspect, z_near) = {
            let projection = self.projection.read();
            let (unit_x, unit_y) = projection.screen_to_ndc(x, y);
            (unit_x, unit_y, projection.near_half_height(), projection.aspect(), projection.z_near())
        };

        let model = self.model_matrix();
        let Some(inverse) = model.try_inverse() else {
            log::warn!("Camera model matrix is singular, no pick ray");
            return None;
        };

        let eye_origin = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let eye_direction = Vec4::new(
            unit_x * near_half_height * aspect,
            unit_y * near_half_height,
            -z_near,
            0.0,
        );
        let origin = (inverse * eye_origin).xyz();
        let direction = (inverse * eye_direction).xyz();
        log::trace!("Pick ray at ({x}, {y}): origin {origin:?} direction {direction:?}");
        Some(Ray::new(origin, direction))
    }
}
