//! # Spatial Engine
//!
//! A thread-safe retained-mode scene graph with ray picking and keyframe
//! animation.
//!
//! ## Features
//!
//! - **Scene Graph**: Nodes, meshes, camera anchors and pick volumes with
//!   cached world transforms and axis-aligned bounds
//! - **Picking**: Slope-classified ray/box tests that prune whole subtrees
//! - **Animation**: Keyframe controllers with easing and completion listeners
//! - **Actors**: A render actor and a fixed-rate simulation actor sharing
//!   one tree through per-node locks
//! - **Sensors**: Moving-average smoothing and orientation fusion for
//!   device-linked cameras
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use spatial_engine::prelude::*;
//!
//! let config = EngineConfig::default();
//! config.init_logging();
//!
//! let root = Spatial::new_node("root");
//! let crate_box = Spatial::new_pick_volume("crate", AABBox::from_extremes(-1.0, -1.0, -1.0, 1.0, 1.0, 1.0));
//! root.attach_child(&crate_box);
//! root.update_geometric_state();
//!
//! let projection = Projection::from_config(&config.projection).shared();
//! projection.write().set_viewport(640.0, 480.0);
//! let camera = Arc::new(Camera::new(projection));
//! camera.set_position(Vec3::new(0.0, 0.0, 10.0));
//!
//! let ray = camera.calculate_pick_ray(320.0, 240.0).unwrap();
//! let hit = root.pick(&ray).closest_spatial().unwrap();
//! assert_eq!(hit.name(), "crate");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod config;
pub mod foundation;

pub mod animation;
pub mod assets;
pub mod input;
pub mod intersection;
pub mod render;
pub mod scene;
pub mod sensors;
pub mod simulation;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        animation::{AnimationListener, AnimationState, Easing, KeyFrame, KeyFrameAnimation},
        assets::{export_mesh, import_mesh, MeshFormatError},
        config::Config,
        core::config::{EngineConfig, ProjectionConfig, SensorConfig, SimulationConfig},
        foundation::math::{Mat4, Quat, TransformChannel, Vec3},
        input::{InputState, Tap, TapKind, TrackballInput},
        intersection::Ray,
        render::{Camera, DrawBackend, HeadlessBackend, Material, Projection, SceneRenderer},
        scene::{AABBox, DrawMode, Mesh, PickResult, Spatial, SpatialKind},
        sensors::{MovingAverageFilter, SensorFusion},
        simulation::{SimulationHandle, SimulationLoop, SimulationWorld, TickHandler},
    };
}
