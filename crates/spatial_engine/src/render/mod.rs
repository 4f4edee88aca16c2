//! # Rendering
//!
//! The render actor's side of the engine. Nothing here talks to a graphics
//! API: a [`DrawBackend`] implementation receives one [`DrawCall`] per mesh
//! and owns whatever GPU state it needs.
//!
//! - **Camera**: view matrix, eye position and pick-ray unprojection
//! - **Projection**: perspective matrix shared by every camera of a scene
//! - **SceneRenderer**: draws a tree through a backend and drives the
//!   hardware buffer lifecycle across context loss

pub mod backend;
pub mod camera;
pub mod material;
pub mod scene_renderer;

pub use backend::{BackendEvent, BufferId, DrawBackend, DrawCall, HardwareBuffers, HeadlessBackend};
pub use camera::{Camera, Projection, SharedProjection};
pub use material::Material;
pub use scene_renderer::SceneRenderer;
