//! Render actor

use std::sync::Arc;

use parking_lot::RwLock;

use crate::render::backend::DrawBackend;
use crate::render::camera::Camera;
use crate::scene::spatial::Spatial;

/// Draws a scene tree through the active camera
///
/// The renderer holds the root and the active camera by `Arc`, so the
/// simulation actor can keep mutating both while frames are drawn.
#[derive(Debug)]
pub struct SceneRenderer {
    root: Arc<Spatial>,
    camera: RwLock<Arc<Camera>>,
}

impl SceneRenderer {
    /// Create a renderer for `root` viewed through `camera`
    pub fn new(root: Arc<Spatial>, camera: Arc<Camera>) -> Self {
        Self {
            root,
            camera: RwLock::new(camera),
        }
    }

    /// Root of the drawn tree
    pub fn root(&self) -> &Arc<Spatial> {
        &self.root
    }

    /// Camera frames are drawn through
    pub fn camera(&self) -> Arc<Camera> {
        Arc::clone(&self.camera.read())
    }

    /// Switch the active camera
    pub fn set_camera(&self, camera: Arc<Camera>) {
        *self.camera.write() = camera;
    }

    /// Draw one frame
    pub fn render_frame(&self, backend: &mut dyn DrawBackend) {
        let camera = self.camera();
        let projection = camera.projection_matrix();
        let view = camera.model_matrix();

        backend.begin_frame(&projection, &view);
        self.root.draw(backend);
        backend.end_frame();
    }

    /// The viewport changed size
    pub fn on_surface_changed(&self, width: u32, height: u32) {
        log::info!("Surface changed to {width}x{height}");
        #[allow(clippy::cast_precision_loss)]
        let (width, height) = (width as f32, height as f32);
        self.camera().projection().write().set_viewport(width, height);
    }

    /// A graphics context was created; upload every mesh
    pub fn on_context_created(&self, backend: &mut dyn DrawBackend) {
        log::debug!("Context created, uploading buffers under {}", self.root.name());
        self.root.generate_hardware_buffers(backend);
    }

    /// The graphics context was lost with every buffer in it
    pub fn on_context_lost(&self) {
        log::debug!("Context lost, forgetting buffers under {}", self.root.name());
        self.root.forget_hardware_buffers();
    }

    /// Release every buffer before shutting the backend down
    pub fn release(&self, backend: &mut dyn DrawBackend) {
        self.root.free_hardware_buffers(backend);
    }
}
