//! Draw backend contract
//!
//! The scene graph never talks to a graphics API directly. The render actor
//! hands a [`DrawBackend`] to the tree, and each mesh issues one draw call
//! through it, either from client-side arrays or from hardware buffers the
//! backend created earlier.

use crate::foundation::math::Mat4;
use crate::render::material::Material;
use crate::scene::mesh::{DrawMode, Geometry};

/// Backend-side name of a GPU buffer object
pub type BufferId = u32;

/// Buffer objects holding one mesh's geometry on the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareBuffers {
    /// Vertex positions
    pub vertices: BufferId,
    /// 16-bit triangle indices
    pub indices: BufferId,
    /// Vertex normals, when the mesh has them
    pub normals: Option<BufferId>,
    /// Texture coordinates, when the mesh has them
    pub texcoords: Option<BufferId>,
    /// RGBA8 vertex colors, when the mesh has them
    pub colors: Option<BufferId>,
    /// Number of indices uploaded
    pub index_count: usize,
}

impl HardwareBuffers {
    /// Every buffer name in use, for deletion
    pub fn ids(&self) -> impl Iterator<Item = BufferId> {
        [Some(self.vertices), Some(self.indices), self.normals, self.texcoords, self.colors]
            .into_iter()
            .flatten()
    }
}

/// Everything a backend needs to draw one mesh
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Name of the spatial being drawn
    pub name: &'a str,
    /// World transform to multiply onto the view
    pub world_transform: &'a Mat4,
    /// Primitive assembly mode
    pub draw_mode: DrawMode,
    /// Shared geometry arrays
    pub geometry: &'a Geometry,
    /// Per-instance RGBA8 vertex colors
    pub colors: Option<&'a [u8]>,
    /// Per-instance material
    pub material: Option<&'a Material>,
}

/// Graphics API seam used by the render actor
pub trait DrawBackend {
    /// Start a frame with the shared projection and the active camera's view
    fn begin_frame(&mut self, projection: &Mat4, view: &Mat4);

    /// Draw from client-side arrays
    fn draw_arrays(&mut self, call: &DrawCall<'_>);

    /// Draw from previously uploaded buffers
    fn draw_buffers(&mut self, call: &DrawCall<'_>, buffers: &HardwareBuffers);

    /// Upload a mesh into buffer objects
    ///
    /// Returns `None` when the backend has no buffer support, in which case
    /// the mesh keeps drawing from client arrays.
    fn upload_buffers(&mut self, call: &DrawCall<'_>) -> Option<HardwareBuffers>;

    /// Release buffer objects created by [`DrawBackend::upload_buffers`]
    fn delete_buffers(&mut self, buffers: &HardwareBuffers);

    /// Finish the frame
    fn end_frame(&mut self) {}
}

/// One call observed by a [`HeadlessBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Frame start with the view matrix
    BeginFrame {
        /// View matrix handed in
        view: Mat4,
    },
    /// Client-array draw
    DrawArrays {
        /// Spatial name
        name: String,
        /// Number of indices drawn
        index_count: usize,
    },
    /// Buffer draw
    DrawBuffers {
        /// Spatial name
        name: String,
        /// Buffers used
        buffers: HardwareBuffers,
    },
    /// Buffer upload
    Upload {
        /// Spatial name
        name: String,
    },
    /// Buffer deletion
    Delete {
        /// Buffers released
        buffers: HardwareBuffers,
    },
    /// Frame end
    EndFrame,
}

/// Backend that draws nothing and records every call
///
/// Useful for tools running without a GPU and for checking what the tree
/// submits.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    events: Vec<BackendEvent>,
    next_buffer: BufferId,
    supports_buffers: bool,
    live_buffers: usize,
}

impl HeadlessBackend {
    /// Backend without buffer support
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that hands out fake buffer names on upload
    pub fn with_buffer_support() -> Self {
        Self {
            supports_buffers: true,
            ..Self::default()
        }
    }

    /// Calls recorded so far
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    /// Drain the recorded calls
    pub fn take_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.events)
    }

    /// Buffer objects created and not yet deleted
    pub fn live_buffers(&self) -> usize {
        self.live_buffers
    }

    /// Names of the meshes drawn, in submission order
    pub fn drawn_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BackendEvent::DrawArrays { name, .. } | BackendEvent::DrawBuffers { name, .. } => {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect()
    }

    fn allocate(&mut self) -> BufferId {
        self.next_buffer += 1;
        self.live_buffers += 1;
        self.next_buffer
    }
}

impl DrawBackend for HeadlessBackend {
    fn begin_frame(&mut self, _projection: &Mat4, view: &Mat4) {
        self.events.push(BackendEvent::BeginFrame { view: *view });
    }

    fn draw_arrays(&mut self, call: &DrawCall<'_>) {
        self.events.push(BackendEvent::DrawArrays {
            name: call.name.to_string(),
            index_count: call.geometry.index_count(),
        });
    }

    fn draw_buffers(&mut self, call: &DrawCall<'_>, buffers: &HardwareBuffers) {
        self.events.push(BackendEvent::DrawBuffers {
            name: call.name.to_string(),
            buffers: *buffers,
        });
    }

    fn upload_buffers(&mut self, call: &DrawCall<'_>) -> Option<HardwareBuffers> {
        if !self.supports_buffers {
            return None;
        }
        self.events.push(BackendEvent::Upload { name: call.name.to_string() });
        let geometry = call.geometry;
        Some(HardwareBuffers {
            vertices: self.allocate(),
            indices: self.allocate(),
            normals: geometry.normals().map(|_| self.allocate()),
            texcoords: geometry.texcoords().map(|_| self.allocate()),
            colors: call.colors.map(|_| self.allocate()),
            index_count: geometry.index_count(),
        })
    }

    fn delete_buffers(&mut self, buffers: &HardwareBuffers) {
        self.live_buffers = self.live_buffers.saturating_sub(buffers.ids().count());
        self.events.push(BackendEvent::Delete { buffers: *buffers });
    }

    fn end_frame(&mut self) {
        self.events.push(BackendEvent::EndFrame);
    }
}
