//! Scene graph
//!
//! A tree of [`Spatial`]s: interior [`Node`]s, [`Mesh`] leaves, camera
//! anchors and pick volumes. Each spatial caches its world transform and a
//! world-space [`AABBox`]; picking walks the tree, pruning subtrees whose
//! bound the ray misses.

pub mod bounds;
pub mod camera_anchor;
pub mod mesh;
pub mod node;
pub mod pick;
pub mod pick_volume;
pub mod spatial;

#[cfg(test)]
mod tests;

pub use bounds::AABBox;
pub use camera_anchor::CameraAnchor;
pub use mesh::{BufferState, DrawMode, Geometry, Mesh};
pub use node::Node;
pub use pick::{PickCandidate, PickResult};
pub use pick_volume::PickVolume;
pub use spatial::{Spatial, SpatialData, SpatialKind};
