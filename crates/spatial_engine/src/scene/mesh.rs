//! Triangle meshes
//!
//! A [`Mesh`] is the payload of a geometry leaf. Its arrays live in a
//! [`Geometry`] shared behind an `Arc`, so cloned meshes reuse the same
//! vertices, indices and model bound while keeping their own transform,
//! colors, material and hardware buffers.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{DrawBackend, DrawCall, HardwareBuffers};
use crate::render::material::Material;
use crate::scene::bounds::AABBox;

/// Primitive assembly mode, stored with the raw GL enum values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Independent triangles
    #[default]
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
}

impl DrawMode {
    /// Map a raw GL enum value; unknown values yield `None`
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0x0004 => Some(Self::Triangles),
            0x0005 => Some(Self::TriangleStrip),
            0x0006 => Some(Self::TriangleFan),
            _ => None,
        }
    }

    /// Raw GL enum value
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Triangles => 0x0004,
            Self::TriangleStrip => 0x0005,
            Self::TriangleFan => 0x0006,
        }
    }
}

/// Geometry arrays shared between a mesh and its clones
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    draw_mode: DrawMode,
    vertices: Vec<f32>,
    indices: Vec<u16>,
    normals: Vec<f32>,
    texcoords: Vec<f32>,
    center: Option<Vec3>,
    model_bound: Option<AABBox>,
    bound_dirty: bool,
}

impl Geometry {
    /// Primitive assembly mode
    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Flat `[x, y, z, ...]` positions
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Positions as raw bytes in native order, for buffer upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Triangle indices
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Indices as raw bytes in native order, for buffer upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Vertex normals, if any
    pub fn normals(&self) -> Option<&[f32]> {
        (!self.normals.is_empty()).then_some(self.normals.as_slice())
    }

    /// Texture coordinates, if any
    pub fn texcoords(&self) -> Option<&[f32]> {
        (!self.texcoords.is_empty()).then_some(self.texcoords.as_slice())
    }

    /// Local center point, if one was assigned
    pub fn center(&self) -> Option<Vec3> {
        self.center
    }

    /// Number of whole vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Model-space bound as last computed or assigned
    pub fn model_bound(&self) -> Option<AABBox> {
        self.model_bound
    }

    /// Whether the vertices changed since the bound was computed
    pub fn has_dirty_bound(&self) -> bool {
        self.bound_dirty
    }

    fn update_model_bound(&mut self) {
        if self.bound_dirty {
            self.model_bound = AABBox::from_vertices(&self.vertices);
            self.bound_dirty = false;
        }
    }
}

/// Hardware buffer lifecycle of one mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// Never uploaded; drawing uses client arrays
    #[default]
    None,
    /// Uploaded and valid in the current context
    Resident(HardwareBuffers),
    /// The context was lost; the old names are invalid and must not be freed
    Forgotten,
}

/// Triangle mesh payload of a geometry leaf
#[derive(Debug)]
pub struct Mesh {
    geometry: Arc<RwLock<Geometry>>,
    shared: bool,
    colors: RwLock<Option<Vec<u8>>>,
    material: RwLock<Option<Material>>,
    buffers: Mutex<BufferState>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::from_geometry(Geometry::default())
    }

    /// Create a mesh from positions and indices
    ///
    /// A position array whose length is not a multiple of three is rejected
    /// with an error log, leaving the mesh without vertices.
    pub fn with_arrays(vertices: &[f32], indices: &[u16]) -> Self {
        let mesh = Self::new();
        mesh.set_vertices(vertices);
        mesh.set_indices(indices);
        mesh
    }

    pub(crate) fn from_geometry(geometry: Geometry) -> Self {
        Self {
            geometry: Arc::new(RwLock::new(geometry)),
            shared: false,
            colors: RwLock::new(None),
            material: RwLock::new(None),
            buffers: Mutex::new(BufferState::None),
        }
    }

    /// Read access to the geometry arrays
    pub fn geometry(&self) -> RwLockReadGuard<'_, Geometry> {
        self.geometry.read()
    }

    /// Whether this mesh shares its geometry with the mesh it was cloned from
    pub fn is_clone(&self) -> bool {
        self.shared
    }

    /// Whether two meshes use the same geometry arrays
    pub fn shares_geometry_with(&self, other: &Mesh) -> bool {
        Arc::ptr_eq(&self.geometry, &other.geometry)
    }

    /// Clone sharing geometry and bound; colors and material are copied
    ///
    /// Returns `None` when the mesh has no vertices or no indices yet.
    pub fn share(&self) -> Option<Mesh> {
        {
            let geometry = self.geometry.read();
            if geometry.vertices.is_empty() || geometry.indices.is_empty() {
                return None;
            }
        }
        Some(Self {
            geometry: Arc::clone(&self.geometry),
            shared: true,
            colors: RwLock::new(self.colors.read().clone()),
            material: RwLock::new(*self.material.read()),
            buffers: Mutex::new(BufferState::None),
        })
    }

    fn modify(&self, what: &str, apply: impl FnOnce(&mut Geometry) -> Result<(), String>) {
        if self.shared {
            log::error!("Cannot set {what} on a cloned mesh; its geometry is shared read-only");
            return;
        }
        if let Err(message) = apply(&mut self.geometry.write()) {
            log::error!("{message}");
        }
    }

    /// Replace the vertex positions and mark the model bound dirty
    pub fn set_vertices(&self, vertices: &[f32]) {
        self.modify("vertices", |geometry| {
            if vertices.len() % 3 != 0 {
                return Err(format!(
                    "Invalid vertex array length (found {}, not divisible by 3)",
                    vertices.len()
                ));
            }
            geometry.vertices = vertices.to_vec();
            geometry.bound_dirty = true;
            let count = geometry.vertex_count();
            if !geometry.normals.is_empty() && geometry.normals.len() != count * 3 {
                log::warn!("Dropping {} normal floats that no longer match {count} vertices", geometry.normals.len());
                geometry.normals.clear();
            }
            if !geometry.texcoords.is_empty() && geometry.texcoords.len() != count * 2 {
                log::warn!(
                    "Dropping {} texture coordinate floats that no longer match {count} vertices",
                    geometry.texcoords.len()
                );
                geometry.texcoords.clear();
            }
            Ok(())
        });
        let count = self.geometry.read().vertex_count();
        let mut colors = self.colors.write();
        if colors.as_ref().is_some_and(|colors| colors.len() != count * 4) {
            log::warn!("Dropping vertex colors that no longer match {count} vertices");
            *colors = None;
        }
    }

    /// Replace the triangle indices
    pub fn set_indices(&self, indices: &[u16]) {
        self.modify("indices", |geometry| {
            geometry.indices = indices.to_vec();
            Ok(())
        });
    }

    /// Replace the vertex normals (three per vertex)
    pub fn set_normals(&self, normals: &[f32]) {
        self.modify("normals", |geometry| {
            let expected = geometry.vertex_count() * 3;
            if normals.len() != expected {
                return Err(format!(
                    "Invalid normal array length (expected {expected}, found {})",
                    normals.len()
                ));
            }
            geometry.normals = normals.to_vec();
            Ok(())
        });
    }

    /// Replace the texture coordinates (two per vertex)
    pub fn set_texcoords(&self, texcoords: &[f32]) {
        self.modify("texture coordinates", |geometry| {
            let expected = geometry.vertex_count() * 2;
            if texcoords.len() != expected {
                return Err(format!(
                    "Invalid texture coordinate array length (expected {expected}, found {})",
                    texcoords.len()
                ));
            }
            geometry.texcoords = texcoords.to_vec();
            Ok(())
        });
    }

    /// Set the primitive assembly mode
    pub fn set_draw_mode(&self, mode: DrawMode) {
        self.modify("draw mode", |geometry| {
            geometry.draw_mode = mode;
            Ok(())
        });
    }

    /// Set the primitive assembly mode from a raw GL enum value
    pub fn set_draw_mode_raw(&self, raw: i32) {
        match DrawMode::from_raw(raw) {
            Some(mode) => self.set_draw_mode(mode),
            None => log::error!("Unrecognized draw mode {raw:#x}"),
        }
    }

    /// Assign the local center point
    pub fn set_center(&self, center: Vec3) {
        self.modify("center", |geometry| {
            geometry.center = Some(center);
            Ok(())
        });
    }

    /// Assign an explicit model bound; it stays until the vertices change
    pub fn set_model_bound(&self, bound: AABBox) {
        self.modify("model bound", |geometry| {
            geometry.model_bound = Some(bound);
            geometry.bound_dirty = false;
            Ok(())
        });
    }

    /// Recompute the model bound if the vertices changed
    ///
    /// Clones update the shared geometry, which is the same as updating the
    /// mesh they were cloned from.
    pub fn update_model_bound(&self) {
        if self.geometry.read().bound_dirty {
            self.geometry.write().update_model_bound();
        }
    }

    /// Model-space bound, if the mesh has vertices or an assigned bound
    pub fn model_bound(&self) -> Option<AABBox> {
        self.geometry.read().model_bound
    }

    /// Replace the per-vertex RGBA8 colors (four bytes per vertex)
    pub fn set_colors(&self, colors: &[u8]) {
        let expected = self.geometry.read().vertex_count() * 4;
        if colors.len() != expected {
            log::error!("Invalid color array length (expected {expected}, found {})", colors.len());
            return;
        }
        *self.colors.write() = Some(colors.to_vec());
    }

    /// Color every vertex with one RGBA value in `0.0..=1.0`
    pub fn set_solid_color(&self, rgba: [f32; 4]) {
        let bytes = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let count = self.geometry.read().vertex_count();
        *self.colors.write() = Some(bytes.repeat(count));
    }

    /// Remove the vertex colors
    pub fn clear_colors(&self) {
        *self.colors.write() = None;
    }

    /// Per-vertex RGBA8 colors, if any
    pub fn colors(&self) -> Option<Vec<u8>> {
        self.colors.read().clone()
    }

    /// Assign the material
    pub fn set_material(&self, material: Option<Material>) {
        *self.material.write() = material;
    }

    /// Current material, if any
    pub fn material(&self) -> Option<Material> {
        *self.material.read()
    }

    /// Current hardware buffer state
    pub fn buffer_state(&self) -> BufferState {
        *self.buffers.lock()
    }

    /// Issue this mesh's draw call
    pub(crate) fn draw(&self, name: &str, world_transform: &Mat4, backend: &mut dyn DrawBackend) {
        let state = self.buffer_state();
        let geometry = self.geometry.read();
        if geometry.vertices.is_empty() || geometry.indices.is_empty() {
            log::error!("Mesh {name} has no vertices or indices, skipping draw");
            return;
        }
        let colors = self.colors.read();
        let material = *self.material.read();
        let call = DrawCall {
            name,
            world_transform,
            draw_mode: geometry.draw_mode,
            geometry: &geometry,
            colors: colors.as_deref(),
            material: material.as_ref(),
        };

        match state {
            BufferState::Resident(buffers) => backend.draw_buffers(&call, &buffers),
            BufferState::None | BufferState::Forgotten => backend.draw_arrays(&call),
        }
    }

    /// Upload the geometry into buffer objects
    ///
    /// Already resident buffers are kept. A backend without buffer support
    /// leaves the mesh on the client-array path.
    pub(crate) fn generate_hardware_buffers(&self, name: &str, backend: &mut dyn DrawBackend) {
        let mut state = self.buffers.lock();
        if matches!(*state, BufferState::Resident(_)) {
            return;
        }
        let geometry = self.geometry.read();
        if geometry.vertices.is_empty() || geometry.indices.is_empty() {
            log::warn!("Mesh {name} has no geometry to upload");
            return;
        }
        let colors = self.colors.read();
        let material = *self.material.read();
        let identity = Mat4::identity();
        let call = DrawCall {
            name,
            world_transform: &identity,
            draw_mode: geometry.draw_mode,
            geometry: &geometry,
            colors: colors.as_deref(),
            material: material.as_ref(),
        };
        match backend.upload_buffers(&call) {
            Some(buffers) => *state = BufferState::Resident(buffers),
            None => log::debug!("Backend has no buffer support, {name} keeps client arrays"),
        }
    }

    /// Drop buffer names after a context loss without touching the backend
    pub(crate) fn forget_hardware_buffers(&self) {
        let mut state = self.buffers.lock();
        if matches!(*state, BufferState::Resident(_)) {
            *state = BufferState::Forgotten;
        }
    }

    /// Release resident buffers through the backend
    pub(crate) fn free_hardware_buffers(&self, name: &str, backend: &mut dyn DrawBackend) {
        let mut state = self.buffers.lock();
        match *state {
            BufferState::Resident(buffers) => {
                backend.delete_buffers(&buffers);
                *state = BufferState::None;
            }
            BufferState::Forgotten => {
                log::warn!("Mesh {name} buffers belong to a lost context, nothing to free");
                *state = BufferState::None;
            }
            BufferState::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{BackendEvent, HeadlessBackend};

    fn quad() -> Mesh {
        Mesh::with_arrays(
            &[-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0],
            &[0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn test_draw_mode_raw_values() {
        assert_eq!(DrawMode::from_raw(4), Some(DrawMode::Triangles));
        assert_eq!(DrawMode::from_raw(6), Some(DrawMode::TriangleFan));
        assert_eq!(DrawMode::from_raw(1), None);
        assert_eq!(DrawMode::TriangleStrip.as_raw(), 5);
    }

    #[test]
    fn test_bound_is_lazy_and_tracks_vertices() {
        let mesh = quad();
        assert!(mesh.geometry().has_dirty_bound());
        assert!(mesh.model_bound().is_none());

        mesh.update_model_bound();
        let bound = mesh.model_bound().unwrap();
        assert_eq!(bound.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(bound.max, Vec3::new(1.0, 1.0, 0.0));

        mesh.set_vertices(&[0.0, 0.0, 0.0, 5.0, 5.0, 5.0]);
        assert!(mesh.geometry().has_dirty_bound());
        mesh.update_model_bound();
        assert_eq!(mesh.model_bound().unwrap().max, Vec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_malformed_arrays_are_ignored() {
        let mesh = quad();
        mesh.set_vertices(&[1.0, 2.0]);
        assert_eq!(mesh.geometry().vertex_count(), 4);

        mesh.set_normals(&[0.0; 5]);
        assert!(mesh.geometry().normals().is_none());
        mesh.set_normals(&[0.0; 12]);
        assert!(mesh.geometry().normals().is_some());

        mesh.set_texcoords(&[0.0; 7]);
        assert!(mesh.geometry().texcoords().is_none());

        mesh.set_colors(&[255; 3]);
        assert!(mesh.colors().is_none());

        mesh.set_draw_mode_raw(0x1234);
        assert_eq!(mesh.geometry().draw_mode(), DrawMode::Triangles);
    }

    #[test]
    fn test_new_vertex_count_drops_stale_attributes() {
        let mesh = quad();
        mesh.set_normals(&[0.0; 12]);
        mesh.set_texcoords(&[0.0; 8]);
        mesh.set_solid_color([1.0, 1.0, 1.0, 1.0]);

        // Same count keeps everything
        mesh.set_vertices(&[0.0; 12]);
        assert!(mesh.geometry().normals().is_some());
        assert!(mesh.geometry().texcoords().is_some());
        assert!(mesh.colors().is_some());

        mesh.set_vertices(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert!(mesh.geometry().normals().is_none());
        assert!(mesh.geometry().texcoords().is_none());
        assert!(mesh.colors().is_none());
    }

    #[test]
    fn test_explicit_bound_survives_until_vertices_change() {
        let mesh = quad();
        let custom = AABBox::from_extremes(-3.0, -3.0, -3.0, 3.0, 3.0, 3.0);
        mesh.set_model_bound(custom);
        mesh.update_model_bound();
        assert_eq!(mesh.model_bound(), Some(custom));
    }

    #[test]
    fn test_solid_color_fills_every_vertex() {
        let mesh = quad();
        mesh.set_solid_color([1.0, 0.5, 0.0, 1.0]);
        let colors = mesh.colors().unwrap();
        assert_eq!(colors.len(), 16);
        assert_eq!(&colors[4..8], &[255, 128, 0, 255]);
    }

    #[test]
    fn test_share_reuses_geometry() {
        let mesh = quad();
        mesh.update_model_bound();
        let clone = mesh.share().unwrap();
        assert!(clone.is_clone());
        assert!(clone.shares_geometry_with(&mesh));
        assert_eq!(clone.model_bound(), mesh.model_bound());

        // Clones cannot change shared geometry
        clone.set_vertices(&[0.0, 0.0, 0.0]);
        assert_eq!(mesh.geometry().vertex_count(), 4);

        assert!(Mesh::new().share().is_none());
    }

    #[test]
    fn test_buffer_lifecycle() {
        let mesh = quad();
        let identity = Mat4::identity();
        let mut backend = HeadlessBackend::with_buffer_support();

        mesh.draw("quad", &identity, &mut backend);
        mesh.generate_hardware_buffers("quad", &mut backend);
        assert!(matches!(mesh.buffer_state(), BufferState::Resident(_)));
        mesh.draw("quad", &identity, &mut backend);

        mesh.forget_hardware_buffers();
        assert_eq!(mesh.buffer_state(), BufferState::Forgotten);
        mesh.draw("quad", &identity, &mut backend);

        mesh.generate_hardware_buffers("quad", &mut backend);
        mesh.free_hardware_buffers("quad", &mut backend);
        assert_eq!(mesh.buffer_state(), BufferState::None);

        let kinds: Vec<_> = backend
            .events()
            .iter()
            .map(|event| match event {
                BackendEvent::DrawArrays { .. } => "arrays",
                BackendEvent::DrawBuffers { .. } => "buffers",
                BackendEvent::Upload { .. } => "upload",
                BackendEvent::Delete { .. } => "delete",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["arrays", "upload", "buffers", "arrays", "upload", "delete"]);
        assert_eq!(backend.live_buffers(), 2);
    }

    #[test]
    fn test_backend_without_buffers_keeps_arrays() {
        let mesh = quad();
        let mut backend = HeadlessBackend::new();
        mesh.generate_hardware_buffers("quad", &mut backend);
        assert_eq!(mesh.buffer_state(), BufferState::None);
    }
}
