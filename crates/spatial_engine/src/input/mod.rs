//! # Input Cells
//!
//! The platform input layer runs on its own thread and drops taps and
//! trackball motion into small lock-guarded cells. The simulation actor
//! drains each cell once per tick, so input is never handled mid-tick.
//!
//! - A newer tap replaces an unconsumed older one
//! - Trackball motion accumulates until consumed; clicks latch

use std::sync::Arc;

use parking_lot::Mutex;

/// Kind of screen tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapKind {
    /// Single tap
    Single,
    /// Double tap
    Double,
}

/// A screen tap in pixel coordinates, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    /// Single or double tap
    pub kind: TapKind,
    /// Pixels from the left edge
    pub x: f32,
    /// Pixels from the top edge
    pub y: f32,
}

/// Trackball input gathered since the last tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackballInput {
    /// Accumulated relative motion along x
    pub dx: f32,
    /// Accumulated relative motion along y
    pub dy: f32,
    /// Whether any motion was reported
    pub moved: bool,
    /// Whether the trackball was clicked
    pub clicked: bool,
}

impl TrackballInput {
    /// Whether nothing happened
    pub fn is_idle(&self) -> bool {
        !self.moved && !self.clicked
    }
}

/// Input shared between the platform thread and the simulation actor
#[derive(Debug, Default)]
pub struct InputState {
    tap: Mutex<Option<Tap>>,
    trackball: Mutex<TrackballInput>,
}

impl InputState {
    /// Create empty cells
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty cells ready to share
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a single tap at pixel `(x, y)`
    pub fn on_single_tap(&self, x: f32, y: f32) {
        self.record_tap(TapKind::Single, x, y);
    }

    /// Register a double tap at pixel `(x, y)`
    pub fn on_double_tap(&self, x: f32, y: f32) {
        self.record_tap(TapKind::Double, x, y);
    }

    /// Register relative trackball motion
    pub fn on_trackball_move(&self, dx: f32, dy: f32) {
        let mut trackball = self.trackball.lock();
        trackball.dx += dx;
        trackball.dy += dy;
        trackball.moved = true;
    }

    /// Register a trackball click
    pub fn on_trackball_click(&self) {
        self.trackball.lock().clicked = true;
    }

    /// Consume the pending tap, if any
    pub fn take_tap(&self) -> Option<Tap> {
        self.tap.lock().take()
    }

    /// Consume the trackball input gathered so far
    pub fn take_trackball(&self) -> TrackballInput {
        std::mem::take(&mut *self.trackball.lock())
    }

    fn record_tap(&self, kind: TapKind, x: f32, y: f32) {
        log::trace!("{kind:?} tap at ({x}, {y})");
        *self.tap.lock() = Some(Tap { kind, x, y });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_latest_tap_wins_and_is_consumed_once() {
        let input = InputState::new();
        input.on_single_tap(10.0, 20.0);
        input.on_double_tap(30.0, 40.0);

        assert_eq!(input.take_tap(), Some(Tap { kind: TapKind::Double, x: 30.0, y: 40.0 }));
        assert_eq!(input.take_tap(), None);
    }

    #[test]
    fn test_trackball_accumulates_until_taken() {
        let input = InputState::new();
        assert!(input.take_trackball().is_idle());

        input.on_trackball_move(1.0, -0.5);
        input.on_trackball_move(0.5, -0.5);
        input.on_trackball_click();

        let trackball = input.take_trackball();
        assert_eq!(trackball, TrackballInput { dx: 1.5, dy: -1.0, moved: true, clicked: true });
        assert!(input.take_trackball().is_idle());
    }

    #[test]
    fn test_cells_accept_input_from_another_thread() {
        let input = InputState::shared();
        let producer = Arc::clone(&input);
        thread::spawn(move || {
            for _ in 0..100 {
                producer.on_trackball_move(0.0, 1.0);
            }
        })
        .join()
        .unwrap();
        assert!((input.take_trackball().dy - 100.0).abs() < f32::EPSILON);
    }
}
