//! Camera anchors
//!
//! Places a [`Camera`] in the tree. Moving the anchor moves the camera; the
//! anchor itself draws nothing, has no bound and is not pickable.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::render::camera::Camera;

/// Scene-graph handle on a camera
#[derive(Debug)]
pub struct CameraAnchor {
    camera: RwLock<Arc<Camera>>,
}

impl CameraAnchor {
    /// Anchor the given camera
    pub fn new(camera: Arc<Camera>) -> Self {
        Self {
            camera: RwLock::new(camera),
        }
    }

    /// Anchored camera
    pub fn camera(&self) -> Arc<Camera> {
        Arc::clone(&self.camera.read())
    }

    /// Anchor a different camera
    pub fn set_camera(&self, camera: Arc<Camera>) {
        *self.camera.write() = camera;
    }
}
