//! Asset interchange
//!
//! Pre-baked meshes are stored in a compact big-endian binary record, see
//! [`mesh_format`].

pub mod mesh_format;

pub use mesh_format::{export_mesh, import_mesh, load_mesh, save_mesh, MeshFormatError};
