//! # Simulation Actor
//!
//! A fixed-rate loop that owns every mutation of the scene tree. Each tick
//! it drains the input cells, casts pick rays through the active camera,
//! lets the application react through a [`TickHandler`], advances the
//! animation controllers and, when the sensor camera is active, points it
//! along the device orientation.
//!
//! Picking and tree edits both happen on this actor, so a pick walk never
//! races an attach or detach.

pub mod handle;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::config::SimulationConfig;
use crate::foundation::time::TickRate;
use crate::input::{InputState, Tap, TrackballInput};
use crate::render::camera::Camera;
use crate::render::scene_renderer::SceneRenderer;
use crate::scene::pick::PickResult;
use crate::scene::spatial::Spatial;
use crate::sensors::fusion::SharedSensorFusion;

pub use handle::SimulationHandle;

/// Errors raised by the simulation actor's thread plumbing
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The OS refused to start the thread
    #[error("Failed to spawn simulation thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// The loop panicked
    #[error("Simulation thread panicked")]
    Panicked,
}

/// Application hooks called from the simulation tick
///
/// Every method has an empty default, so handlers implement only what they
/// need.
pub trait TickHandler: Send {
    /// A tap hit at least one pickable spatial
    fn on_pick(&mut self, _world: &mut SimulationWorld, _tap: Tap, _result: &PickResult) {}

    /// Trackball input arrived since the last tick
    fn on_trackball(&mut self, _world: &mut SimulationWorld, _input: TrackballInput) {}

    /// End of a tick, after animations advanced
    fn on_tick(&mut self, _world: &mut SimulationWorld, _dt: Duration) {}
}

/// Handler that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl TickHandler for NoopHandler {}

/// Scene state the simulation actor works on
pub struct SimulationWorld {
    root: Arc<Spatial>,
    cameras: Vec<Arc<Camera>>,
    active_camera: usize,
    sensor_camera: Option<usize>,
    input: Arc<InputState>,
    sensors: Option<SharedSensorFusion>,
    renderer: Option<Arc<SceneRenderer>>,
}

impl SimulationWorld {
    /// Create a world over `root` viewed through `camera`
    pub fn new(root: Arc<Spatial>, camera: Arc<Camera>, input: Arc<InputState>) -> Self {
        Self {
            root,
            cameras: vec![camera],
            active_camera: 0,
            sensor_camera: None,
            input,
            sensors: None,
            renderer: None,
        }
    }

    /// Add a camera to the cycle; returns its index
    pub fn add_camera(&mut self, camera: Arc<Camera>) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    /// Drive the camera at `index` from `sensors` while it is active
    pub fn set_sensor_camera(&mut self, index: usize, sensors: SharedSensorFusion) {
        if index >= self.cameras.len() {
            log::error!("No camera {index} to link with the sensors");
            return;
        }
        self.sensor_camera = Some(index);
        self.sensors = Some(sensors);
    }

    /// Keep `renderer` drawing through the active camera
    pub fn set_renderer(&mut self, renderer: Arc<SceneRenderer>) {
        renderer.set_camera(self.active_camera());
        self.renderer = Some(renderer);
    }

    /// Root of the tree
    pub fn root(&self) -> &Arc<Spatial> {
        &self.root
    }

    /// Input cells drained every tick
    pub fn input(&self) -> &Arc<InputState> {
        &self.input
    }

    /// Every camera, in cycle order
    pub fn cameras(&self) -> &[Arc<Camera>] {
        &self.cameras
    }

    /// Camera picks and frames go through
    pub fn active_camera(&self) -> Arc<Camera> {
        Arc::clone(&self.cameras[self.active_camera])
    }

    /// Index of the active camera
    pub fn active_camera_index(&self) -> usize {
        self.active_camera
    }

    /// Whether the sensor-driven camera is active
    pub fn is_sensor_camera_active(&self) -> bool {
        self.sensor_camera == Some(self.active_camera)
    }

    /// Make the camera at `index` active
    pub fn set_active_camera(&mut self, index: usize) {
        if index >= self.cameras.len() {
            log::error!("No camera {index}, {} registered", self.cameras.len());
            return;
        }
        self.active_camera = index;
        if let Some(renderer) = &self.renderer {
            renderer.set_camera(self.active_camera());
        }
        log::debug!("Active camera is now {index}");
    }

    /// Make the next camera active, wrapping around
    pub fn cycle_camera(&mut self) {
        self.set_active_camera((self.active_camera + 1) % self.cameras.len());
    }

    fn apply_sensor_rotation(&self) {
        if !self.is_sensor_camera_active() {
            return;
        }
        let Some(sensors) = &self.sensors else {
            return;
        };
        let rotation = sensors.lock().rotation_matrix();
        if let Some(rotation) = rotation {
            self.cameras[self.active_camera].set_rotation_matrix(&rotation);
        }
    }
}

/// Fixed-rate driver of a [`SimulationWorld`]
pub struct SimulationLoop {
    world: SimulationWorld,
    handler: Box<dyn TickHandler>,
    rate: TickRate,
    ticks: u64,
}

impl SimulationLoop {
    /// Create a loop ticking at the configured rate
    pub fn new(world: SimulationWorld, handler: impl TickHandler + 'static, config: &SimulationConfig) -> Self {
        Self {
            world,
            handler: Box::new(handler),
            rate: TickRate::new(config.target_tick_rate),
            ticks: 0,
        }
    }

    /// Scene state
    pub fn world(&self) -> &SimulationWorld {
        &self.world
    }

    /// Mutable scene state
    pub fn world_mut(&mut self) -> &mut SimulationWorld {
        &mut self.world
    }

    /// Target length of one tick
    pub fn period(&self) -> Duration {
        self.rate.period()
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick covering `dt` of simulated time
    pub fn tick(&mut self, dt: Duration) {
        self.handle_tap();

        let trackball = self.world.input.take_trackball();
        if !trackball.is_idle() {
            self.handler.on_trackball(&mut self.world, trackball);
        }

        self.world.root.update(dt);
        self.world.apply_sensor_rotation();
        self.handler.on_tick(&mut self.world, dt);
        self.ticks += 1;
    }

    fn handle_tap(&mut self) {
        let Some(tap) = self.world.input.take_tap() else {
            return;
        };
        let Some(ray) = self.world.active_camera().calculate_pick_ray(tap.x, tap.y) else {
            return;
        };
        let result = self.world.root.pick(&ray);
        log::debug!(
            "{:?} tap at ({}, {}) hit {} of {} visited",
            tap.kind,
            tap.x,
            tap.y,
            result.len(),
            result.visited()
        );
        if result.has_hits() {
            self.handler.on_pick(&mut self.world, tap, &result);
        }
    }
}
