//! Scene graph elements
//!
//! Every element of the tree is a [`Spatial`] shared through `Arc`. The
//! variant-specific part lives in [`SpatialKind`]; everything a spatial has
//! regardless of variant (name, local transform, cached world transform and
//! bound, pickability, controllers, payload, parent link) lives here.
//!
//! Each spatial guards its own state with its own locks, so the render actor
//! can draw while the simulation actor picks and animates. Parents own their
//! children; children point back through a `Weak` link.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::animation::keyframe_animation::{AnimationId, KeyFrameAnimation};
use crate::foundation::math::{utils, LocalTransform, Mat4, Quat, TransformChannel, Vec3};
use crate::intersection::ray::Ray;
use crate::render::backend::DrawBackend;
use crate::render::camera::Camera;
use crate::render::material::Material;
use crate::scene::bounds::AABBox;
use crate::scene::camera_anchor::CameraAnchor;
use crate::scene::mesh::Mesh;
use crate::scene::node::Node;
use crate::scene::pick::PickResult;
use crate::scene::pick_volume::PickVolume;

/// Opaque application payload attached to a spatial
pub type SpatialData = Arc<dyn Any + Send + Sync>;

/// Variant-specific part of a spatial
#[derive(Debug)]
pub enum SpatialKind {
    /// Interior node owning children
    Node(Node),
    /// Triangle mesh leaf
    Mesh(Mesh),
    /// Scene-graph handle on a camera
    CameraAnchor(CameraAnchor),
    /// Invisible pickable box
    PickVolume(PickVolume),
}

impl SpatialKind {
    /// Short name of the variant, for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Mesh(_) => "mesh",
            Self::CameraAnchor(_) => "camera anchor",
            Self::PickVolume(_) => "pick volume",
        }
    }
}

#[derive(Debug)]
struct SpatialState {
    local: LocalTransform,
    world_transform: Mat4,
    world_bound: Option<AABBox>,
    pickable: bool,
}

/// An element of the scene graph
pub struct Spatial {
    name: String,
    kind: SpatialKind,
    state: RwLock<SpatialState>,
    parent: RwLock<Weak<Spatial>>,
    controllers: Mutex<Vec<KeyFrameAnimation>>,
    data: RwLock<Option<SpatialData>>,
}

impl fmt::Debug for Spatial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spatial")
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .field("world_bound", &self.state.read().world_bound)
            .finish_non_exhaustive()
    }
}

/// Two spatials are equal when they share a name and the same payload
impl PartialEq for Spatial {
    fn eq(&self, other: &Self) -> bool {
        let same_data = match (self.data(), other.data()) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::as_ptr(&a).cast::<()>() == Arc::as_ptr(&b).cast::<()>(),
            _ => false,
        };
        self.name == other.name && same_data
    }
}

impl Spatial {
    fn with_kind(name: impl Into<String>, kind: SpatialKind) -> Arc<Self> {
        let pickable = !matches!(kind, SpatialKind::CameraAnchor(_));
        Arc::new(Self {
            name: name.into(),
            kind,
            state: RwLock::new(SpatialState {
                local: LocalTransform::identity(),
                world_transform: Mat4::identity(),
                world_bound: None,
                pickable,
            }),
            parent: RwLock::new(Weak::new()),
            controllers: Mutex::new(Vec::new()),
            data: RwLock::new(None),
        })
    }

    /// Create an empty interior node
    pub fn new_node(name: impl Into<String>) -> Arc<Self> {
        Self::with_kind(name, SpatialKind::Node(Node::default()))
    }

    /// Create a mesh leaf
    pub fn new_mesh(name: impl Into<String>, mesh: Mesh) -> Arc<Self> {
        Self::with_kind(name, SpatialKind::Mesh(mesh))
    }

    /// Create a camera anchor; anchors are not pickable
    pub fn new_camera_anchor(name: impl Into<String>, camera: Arc<Camera>) -> Arc<Self> {
        Self::with_kind(name, SpatialKind::CameraAnchor(CameraAnchor::new(camera)))
    }

    /// Create an invisible pickable box with the given model-space bound
    pub fn new_pick_volume(name: impl Into<String>, bound: AABBox) -> Arc<Self> {
        Self::with_kind(name, SpatialKind::PickVolume(PickVolume::new(bound)))
    }

    /// Name of the spatial
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant-specific part
    pub fn kind(&self) -> &SpatialKind {
        &self.kind
    }

    /// Node part, if this is an interior node
    pub fn as_node(&self) -> Option<&Node> {
        match &self.kind {
            SpatialKind::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Mesh part, if this is a mesh leaf
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            SpatialKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Camera anchor part, if this is a camera anchor
    pub fn as_camera_anchor(&self) -> Option<&CameraAnchor> {
        match &self.kind {
            SpatialKind::CameraAnchor(anchor) => Some(anchor),
            _ => None,
        }
    }

    /// Pick volume part, if this is a pick volume
    pub fn as_pick_volume(&self) -> Option<&PickVolume> {
        match &self.kind {
            SpatialKind::PickVolume(volume) => Some(volume),
            _ => None,
        }
    }

    /// Whether this spatial can own children
    pub fn is_node(&self) -> bool {
        matches!(self.kind, SpatialKind::Node(_))
    }

    // ---------------------------------------------------------------------
    // Local transform
    // ---------------------------------------------------------------------

    /// Local transform relative to the parent
    ///
    /// For a camera anchor the translation is the camera position.
    pub fn local_transform(&self) -> LocalTransform {
        let mut local = self.state.read().local;
        if let SpatialKind::CameraAnchor(anchor) = &self.kind {
            local.translation = TransformChannel::Set(anchor.camera().position());
        }
        local
    }

    /// Replace the whole local transform
    pub fn set_local_transform(&self, local: LocalTransform) {
        if let (SpatialKind::CameraAnchor(anchor), Some(position)) = (&self.kind, local.translation.get()) {
            anchor.camera().set_position(position);
        }
        self.state.write().local = local;
    }

    /// Local translation, if set
    pub fn local_translation(&self) -> Option<Vec3> {
        self.local_transform().translation.get()
    }

    /// Set the local translation
    ///
    /// On a camera anchor this moves the camera instead.
    pub fn set_local_translation(&self, translation: Vec3) {
        if let SpatialKind::CameraAnchor(anchor) = &self.kind {
            anchor.camera().set_position(translation);
            return;
        }
        self.state.write().local.translation = TransformChannel::Set(translation);
    }

    /// Unset the local translation
    pub fn clear_local_translation(&self) {
        self.state.write().local.translation = TransformChannel::Unset;
    }

    /// Local rotation, if set
    pub fn local_rotation(&self) -> Option<Quat> {
        self.state.read().local.rotation.get()
    }

    /// Set the local rotation
    pub fn set_local_rotation(&self, rotation: Quat) {
        self.state.write().local.rotation = TransformChannel::Set(rotation);
    }

    /// Set the local rotation as `angle_degrees` around `axis`
    pub fn set_local_rotation_degrees(&self, angle_degrees: f32, axis: Vec3) {
        self.set_local_rotation(utils::rotation_degrees(angle_degrees, axis));
    }

    /// Unset the local rotation
    pub fn clear_local_rotation(&self) {
        self.state.write().local.rotation = TransformChannel::Unset;
    }

    /// Local scale, if set
    pub fn local_scale(&self) -> Option<Vec3> {
        self.state.read().local.scale.get()
    }

    /// Set the per-axis local scale
    pub fn set_local_scale(&self, scale: Vec3) {
        self.state.write().local.scale = TransformChannel::Set(scale);
    }

    /// Unset the local scale
    pub fn clear_local_scale(&self) {
        self.state.write().local.scale = TransformChannel::Unset;
    }

    // ---------------------------------------------------------------------
    // World state
    // ---------------------------------------------------------------------

    /// Cached world transform
    pub fn world_transform(&self) -> Mat4 {
        self.state.read().world_transform
    }

    /// Override the cached world transform directly
    ///
    /// The next [`Spatial::update_transform`] rebuilds it from the local
    /// channels again.
    pub fn set_transform(&self, world_transform: Mat4) {
        self.state.write().world_transform = world_transform;
    }

    /// Translation part of the cached world transform
    pub fn world_translation(&self) -> Vec3 {
        let world = self.world_transform();
        Vec3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)])
    }

    /// Cached world-space bound; `None` for spatials with nothing to bound
    pub fn world_bound(&self) -> Option<AABBox> {
        self.state.read().world_bound
    }

    /// Whether picking considers this spatial
    pub fn is_pickable(&self) -> bool {
        self.state.read().pickable
    }

    /// Include or exclude this spatial (and, for nodes, its subtree) from picking
    pub fn set_pickable(&self, pickable: bool) {
        self.state.write().pickable = pickable;
    }

    /// Recompute world transforms for this spatial and its descendants
    ///
    /// The world transform is the parent's world transform (identity at a
    /// root) times translate, rotate and scale of the set local channels.
    /// Camera anchors keep no world transform; the camera owns its matrix.
    pub fn update_transform(&self) {
        if matches!(self.kind, SpatialKind::CameraAnchor(_)) {
            return;
        }
        let parent_world = self.parent().map_or_else(Mat4::identity, |parent| parent.world_transform());
        {
            let mut state = self.state.write();
            state.world_transform = parent_world * state.local.to_matrix();
        }
        if let SpatialKind::Node(node) = &self.kind {
            for child in node.read_children().iter() {
                child.update_transform();
            }
        }
    }

    /// Recompute mesh model bounds whose vertices changed, recursively
    pub fn update_model_bound(&self) {
        match &self.kind {
            SpatialKind::Mesh(mesh) => mesh.update_model_bound(),
            SpatialKind::Node(node) => {
                for child in node.read_children().iter() {
                    child.update_model_bound();
                }
            }
            SpatialKind::CameraAnchor(_) | SpatialKind::PickVolume(_) => {}
        }
    }

    /// Recompute the world bound of this spatial and its descendants
    ///
    /// Leaves carry their model bound through the world transform; nodes
    /// take the union of their children. With `propagate`, every ancestor
    /// then recomputes the union over its children, so ancestors both grow
    /// and shrink to fit.
    pub fn update_world_bound(&self, propagate: bool) {
        let bound = match &self.kind {
            SpatialKind::Node(node) => {
                let children = node.read_children();
                for child in children.iter() {
                    child.update_world_bound(false);
                }
                union_of_children(&children)
            }
            SpatialKind::Mesh(mesh) => {
                mesh.update_model_bound();
                mesh.model_bound().map(|bound| bound.transformed(&self.world_transform()))
            }
            SpatialKind::PickVolume(volume) => {
                Some(volume.model_bound().transformed(&self.world_transform()))
            }
            SpatialKind::CameraAnchor(_) => None,
        };
        self.state.write().world_bound = bound;

        if propagate {
            self.propagate_bound_to_ancestors();
        }
    }

    fn propagate_bound_to_ancestors(&self) {
        let mut current = self.parent();
        while let Some(ancestor) = current {
            if let SpatialKind::Node(node) = &ancestor.kind {
                let bound = union_of_children(&node.read_children());
                ancestor.state.write().world_bound = bound;
            }
            current = ancestor.parent();
        }
    }

    /// Refresh transforms and bounds of this subtree, then its ancestors' bounds
    pub fn update_geometric_state(&self) {
        self.update_transform();
        self.update_world_bound(true);
    }

    // ---------------------------------------------------------------------
    // Hierarchy
    // ---------------------------------------------------------------------

    /// Parent node, if attached
    pub fn parent(&self) -> Option<Arc<Spatial>> {
        self.parent.read().upgrade()
    }

    pub(crate) fn set_parent(&self, parent: Weak<Spatial>) {
        *self.parent.write() = parent;
    }

    /// Whether `candidate` is a strict ancestor of this spatial
    pub fn has_ancestor(&self, candidate: &Spatial) -> bool {
        let mut current = self.parent();
        while let Some(ancestor) = current {
            if std::ptr::eq(Arc::as_ptr(&ancestor), candidate) {
                return true;
            }
            current = ancestor.parent();
        }
        false
    }

    /// Topmost ancestor, or this spatial when detached
    pub fn root(self: &Arc<Self>) -> Arc<Spatial> {
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Detach this spatial from its parent; `false` when it had none
    pub fn detach_from_parent(&self) -> bool {
        self.parent().is_some_and(|parent| parent.detach_child(self))
    }

    // ---------------------------------------------------------------------
    // Picking and drawing
    // ---------------------------------------------------------------------

    /// Collect the pickable leaves of this subtree hit by `ray`
    ///
    /// A node whose bound the ray misses is skipped with its whole subtree,
    /// as is a node that is not pickable.
    pub fn calculate_pick(self: &Arc<Self>, ray: &Ray, result: &mut PickResult) {
        result.record_visit();
        let (bound, pickable) = {
            let state = self.state.read();
            (state.world_bound, state.pickable)
        };
        let Some(bound) = bound.filter(|_| pickable) else {
            return;
        };

        match &self.kind {
            SpatialKind::Node(node) => {
                if !ray.intersects(&bound) {
                    return;
                }
                for child in node.read_children().iter() {
                    child.calculate_pick(ray, result);
                }
            }
            _ => {
                if let Some(distance) = ray.intersection_distance(&bound) {
                    log::trace!("Pick ray hit {} at {distance}", self.name);
                    result.add(distance, Arc::clone(self));
                }
            }
        }
    }

    /// Cast `ray` into this subtree and return the hits
    pub fn pick(self: &Arc<Self>, ray: &Ray) -> PickResult {
        let mut result = PickResult::for_ray(*ray);
        self.calculate_pick(ray, &mut result);
        result
    }

    /// Draw this subtree through the backend
    pub fn draw(&self, backend: &mut dyn DrawBackend) {
        match &self.kind {
            SpatialKind::Node(node) => {
                for child in node.read_children().iter() {
                    child.draw(backend);
                }
            }
            SpatialKind::Mesh(mesh) => mesh.draw(&self.name, &self.world_transform(), backend),
            SpatialKind::CameraAnchor(_) | SpatialKind::PickVolume(_) => {}
        }
    }

    /// Upload mesh geometry of this subtree into buffer objects
    pub fn generate_hardware_buffers(&self, backend: &mut dyn DrawBackend) {
        match &self.kind {
            SpatialKind::Node(node) => {
                for child in node.read_children().iter() {
                    child.generate_hardware_buffers(backend);
                }
            }
            SpatialKind::Mesh(mesh) => mesh.generate_hardware_buffers(&self.name, backend),
            SpatialKind::CameraAnchor(_) | SpatialKind::PickVolume(_) => {}
        }
    }

    /// Forget buffer names of this subtree after the graphics context was lost
    pub fn forget_hardware_buffers(&self) {
        match &self.kind {
            SpatialKind::Node(node) => {
                for child in node.read_children().iter() {
                    child.forget_hardware_buffers();
                }
            }
            SpatialKind::Mesh(mesh) => mesh.forget_hardware_buffers(),
            SpatialKind::CameraAnchor(_) | SpatialKind::PickVolume(_) => {}
        }
    }

    /// Release buffer objects of this subtree
    pub fn free_hardware_buffers(&self, backend: &mut dyn DrawBackend) {
        match &self.kind {
            SpatialKind::Node(node) => {
                for child in node.read_children().iter() {
                    child.free_hardware_buffers(backend);
                }
            }
            SpatialKind::Mesh(mesh) => mesh.free_hardware_buffers(&self.name, backend),
            SpatialKind::CameraAnchor(_) | SpatialKind::PickVolume(_) => {}
        }
    }

    /// Assign a material to every mesh in this subtree
    pub fn set_material(&self, material: Option<Material>) {
        match &self.kind {
            SpatialKind::Node(node) => {
                for child in node.read_children().iter() {
                    child.set_material(material);
                }
            }
            SpatialKind::Mesh(mesh) => mesh.set_material(material),
            SpatialKind::CameraAnchor(_) | SpatialKind::PickVolume(_) => {}
        }
    }

    /// Create a mesh leaf sharing this mesh's geometry
    ///
    /// The clone copies the local transform, colors and material. Returns
    /// `None` when this is not a mesh or the mesh has no vertices or indices.
    pub fn clone_mesh(&self, name: impl Into<String>) -> Option<Arc<Spatial>> {
        let Some(mesh) = self.as_mesh() else {
            log::error!("Cannot clone {} {}: not a mesh", self.kind.label(), self.name);
            return None;
        };
        let Some(shared) = mesh.share() else {
            log::error!("Cannot clone mesh {} with no vertices or indices", self.name);
            return None;
        };
        let clone = Self::new_mesh(name, shared);
        let local = self.state.read().local;
        clone.state.write().local = local;
        Some(clone)
    }

    // ---------------------------------------------------------------------
    // Controllers
    // ---------------------------------------------------------------------

    /// Prepare `animation` against this spatial and start running it
    ///
    /// Returns `None` (with an error log) when the animation cannot be
    /// prepared, for example when it has too few frames.
    pub fn add_controller(&self, mut animation: KeyFrameAnimation) -> Option<AnimationId> {
        if let Err(err) = animation.prepare(self) {
            log::error!("Animation not attached to {}: {err}", self.name);
            return None;
        }
        let id = animation.id();
        self.controllers.lock().push(animation);
        Some(id)
    }

    /// Remove a controller without firing its listener
    pub fn remove_controller(&self, id: AnimationId) -> Option<KeyFrameAnimation> {
        let mut controllers = self.controllers.lock();
        let index = controllers.iter().position(|controller| controller.id() == id)?;
        Some(controllers.remove(index))
    }

    /// Remove every controller without firing listeners
    pub fn clear_controllers(&self) {
        self.controllers.lock().clear();
    }

    /// Number of attached controllers
    pub fn controller_count(&self) -> usize {
        self.controllers.lock().len()
    }

    /// Advance the controllers of this subtree by `dt`
    ///
    /// Finished animations are removed before their listener runs, so each
    /// listener fires exactly once and may freely modify the tree.
    pub fn update(self: &Arc<Self>, dt: Duration) {
        self.run_controllers(dt);
        if let SpatialKind::Node(node) = &self.kind {
            for child in node.children() {
                child.update(dt);
            }
        }
    }

    fn run_controllers(self: &Arc<Self>, dt: Duration) {
        let finished: Vec<KeyFrameAnimation> = {
            let mut controllers = self.controllers.lock();
            if controllers.is_empty() {
                return;
            }
            for controller in controllers.iter_mut() {
                controller.update(dt, self);
            }
            let (finished, running) = std::mem::take(&mut *controllers)
                .into_iter()
                .partition(KeyFrameAnimation::is_finished);
            *controllers = running;
            finished
        };

        for animation in &finished {
            log::debug!("Animation {:?} on {} finished", animation.id(), self.name);
            if let Some(listener) = animation.listener() {
                listener.on_animation_end(animation, self);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Payload
    // ---------------------------------------------------------------------

    /// Attach an application payload
    pub fn set_data<T: Any + Send + Sync>(&self, value: T) {
        *self.data.write() = Some(Arc::new(value));
    }

    /// Attach an already shared payload
    pub fn set_shared_data(&self, data: SpatialData) {
        *self.data.write() = Some(data);
    }

    /// Payload, if any
    pub fn data(&self) -> Option<SpatialData> {
        self.data.read().clone()
    }

    /// Payload downcast to `T`, if present and of that type
    pub fn data_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.data().and_then(|data| data.downcast::<T>().ok())
    }

    /// Whether a payload is attached
    pub fn has_data(&self) -> bool {
        self.data.read().is_some()
    }

    /// Remove the payload
    pub fn clear_data(&self) {
        *self.data.write() = None;
    }
}

fn union_of_children(children: &[Arc<Spatial>]) -> Option<AABBox> {
    children
        .iter()
        .filter_map(|child| child.world_bound())
        .reduce(|acc, bound| acc.union(&bound))
}
