//! Keyframe animation controller
//!
//! Lifecycle: `Unprepared` until [`KeyFrameAnimation::prepare`] succeeds
//! against a target, then `Running` while ticks advance it, then `Finished`
//! once the elapsed time reaches the last frame. A finished animation has
//! snapped its target onto the last frame and ignores further updates.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::animation::easing::Easing;
use crate::animation::keyframe::KeyFrame;
use crate::foundation::math::{Quat, TransformChannel, Vec3};
use crate::scene::spatial::Spatial;

static NEXT_ANIMATION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies an animation attached to a spatial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(u64);

/// Lifecycle state of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    /// Not yet prepared against a target
    Unprepared,
    /// Advancing on every update
    Running,
    /// Reached the last frame
    Finished,
}

/// Reasons an animation cannot be prepared
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnimationError {
    /// No frames were added
    #[error("animation has no frames")]
    NoFrames,
    /// Only a frame at time zero exists
    #[error("animation needs at least one frame after time zero")]
    Incomplete,
}

/// Callback fired once when an animation finishes
///
/// The animation has already been removed from `spatial` when this runs, so
/// the listener may attach a new animation or change the tree.
pub trait AnimationListener: Send + Sync {
    /// Called after `animation` finished on `spatial`
    fn on_animation_end(&self, animation: &KeyFrameAnimation, spatial: &Arc<Spatial>);
}

impl<F> AnimationListener for F
where
    F: Fn(&KeyFrameAnimation, &Arc<Spatial>) + Send + Sync,
{
    fn on_animation_end(&self, animation: &KeyFrameAnimation, spatial: &Arc<Spatial>) {
        self(animation, spatial);
    }
}

/// Interpolates a spatial's local transform through a list of keyframes
pub struct KeyFrameAnimation {
    id: AnimationId,
    frames: Vec<KeyFrame>,
    easing: Easing,
    listener: Option<Arc<dyn AnimationListener>>,
    state: AnimationState,
    elapsed: Duration,
    // Index of the frame opening the current bracket
    bracket: usize,
}

impl fmt::Debug for KeyFrameAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFrameAnimation")
            .field("id", &self.id)
            .field("frames", &self.frames.len())
            .field("easing", &self.easing)
            .field("state", &self.state)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl Default for KeyFrameAnimation {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyFrameAnimation {
    /// Create an empty, unprepared animation
    pub fn new() -> Self {
        Self {
            id: AnimationId(NEXT_ANIMATION_ID.fetch_add(1, Ordering::Relaxed)),
            frames: Vec::new(),
            easing: Easing::Linear,
            listener: None,
            state: AnimationState::Unprepared,
            elapsed: Duration::ZERO,
            bracket: 0,
        }
    }

    /// Use `easing` between every pair of frames
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Fire `listener` when the animation finishes
    pub fn with_listener(mut self, listener: impl AnimationListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Add a frame, builder style
    pub fn with_frame(mut self, frame: KeyFrame) -> Self {
        self.add_frame(frame);
        self
    }

    /// Replace the completion listener
    pub fn set_listener(&mut self, listener: Option<Arc<dyn AnimationListener>>) {
        self.listener = listener;
    }

    /// Completion listener, if any
    pub fn listener(&self) -> Option<&Arc<dyn AnimationListener>> {
        self.listener.as_ref()
    }

    /// Identifier, unique within the process
    pub fn id(&self) -> AnimationId {
        self.id
    }

    /// Lifecycle state
    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Whether the animation advances on update
    pub fn is_running(&self) -> bool {
        self.state == AnimationState::Running
    }

    /// Whether the animation reached its last frame
    pub fn is_finished(&self) -> bool {
        self.state == AnimationState::Finished
    }

    /// Time advanced since the animation was prepared
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Frames ordered by time
    pub fn frames(&self) -> &[KeyFrame] {
        &self.frames
    }

    /// Time of the last frame
    pub fn duration(&self) -> Duration {
        self.frames.last().map_or(Duration::ZERO, KeyFrame::time)
    }

    /// Insert a frame in time order, replacing any frame at the same time
    ///
    /// Ignored (with a warning) while the animation is running.
    pub fn add_frame(&mut self, frame: KeyFrame) {
        if self.is_running() {
            log::warn!("Cannot add a frame to running animation {:?}", self.id);
            return;
        }
        match self.frames.binary_search_by_key(&frame.time(), KeyFrame::time) {
            Ok(index) => self.frames[index] = frame,
            Err(index) => self.frames.insert(index, frame),
        }
    }

    /// Remove the frame at exactly `time`
    pub fn remove_frame(&mut self, time: Duration) -> Option<KeyFrame> {
        if self.is_running() {
            log::warn!("Cannot remove a frame from running animation {:?}", self.id);
            return None;
        }
        let index = self.frames.binary_search_by_key(&time, KeyFrame::time).ok()?;
        Some(self.frames.remove(index))
    }

    /// Bind the animation to `target`'s current pose and start it
    ///
    /// When no frame sits at time zero, one is synthesized from the
    /// target's current local transform. Frames without a translation get a
    /// zero translation.
    pub fn prepare(&mut self, target: &Spatial) -> Result<(), AnimationError> {
        if self.frames.is_empty() {
            return Err(AnimationError::NoFrames);
        }
        if self.frames[0].time() != Duration::ZERO {
            let mut start = KeyFrame::new(Duration::ZERO)
                .with_translation(target.local_translation().unwrap_or_else(Vec3::zeros));
            if self.frames.iter().any(|frame| frame.rotation.is_set()) {
                start = start.with_rotation(target.local_rotation().unwrap_or_else(Quat::identity));
            }
            if self.frames.iter().any(|frame| frame.scale.is_set()) {
                start = start.with_scale(target.local_scale().unwrap_or_else(|| Vec3::repeat(1.0)));
            }
            self.frames.insert(0, start);
        }
        if self.frames.len() < 2 {
            return Err(AnimationError::Incomplete);
        }
        for frame in &mut self.frames {
            if !frame.translation.is_set() {
                frame.translation = TransformChannel::Set(Vec3::zeros());
            }
        }

        self.elapsed = Duration::ZERO;
        self.bracket = 0;
        self.state = AnimationState::Running;
        log::debug!("Animation {:?} prepared on {} with {} frames", self.id, target.name(), self.frames.len());
        Ok(())
    }

    /// Advance by `dt` and pose `target`
    ///
    /// Does nothing unless the animation is running. When the elapsed time
    /// reaches the last frame the target snaps onto it and the animation
    /// finishes.
    pub fn update(&mut self, dt: Duration, target: &Spatial) -> AnimationState {
        if !self.is_running() {
            return self.state;
        }
        self.elapsed += dt;

        let Some(&last) = self.frames.last() else {
            self.state = AnimationState::Finished;
            return self.state;
        };
        if self.elapsed >= last.time() {
            pose(target, last.translation.get(), last.rotation.get(), last.scale.get());
            self.state = AnimationState::Finished;
            return self.state;
        }

        while self.frames[self.bracket + 1].time() < self.elapsed {
            self.bracket += 1;
        }
        let from = self.frames[self.bracket];
        let to = self.frames[self.bracket + 1];
        let span = (to.time() - from.time()).as_secs_f32();
        let progress = (self.elapsed - from.time()).as_secs_f32() / span;
        let t = self.easing.apply(progress);

        let translation = match (from.translation.get(), to.translation.get()) {
            (Some(a), Some(b)) => Some(a.lerp(&b, t)),
            _ => None,
        };
        let rotation = match (from.rotation.get(), to.rotation.get()) {
            (Some(a), Some(b)) => Some(a.slerp(&b, t)),
            _ => None,
        };
        let scale = match (from.scale.get(), to.scale.get()) {
            (Some(a), Some(b)) => Some(a.lerp(&b, t)),
            _ => None,
        };
        pose(target, translation, rotation, scale);
        self.state
    }
}

fn pose(target: &Spatial, translation: Option<Vec3>, rotation: Option<Quat>, scale: Option<Vec3>) {
    if let Some(translation) = translation {
        target.set_local_translation(translation);
    }
    if let Some(rotation) = rotation {
        target.set_local_rotation(rotation);
    }
    if let Some(scale) = scale {
        target.set_local_scale(scale);
    }
    target.update_transform();
    target.update_world_bound(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::bounds::AABBox;
    use approx::assert_relative_eq;
    use std::sync::atomic::AtomicUsize;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn piece() -> Arc<Spatial> {
        let piece = Spatial::new_pick_volume("piece", AABBox::from_extremes(-0.5, -0.5, -0.5, 0.5, 0.5, 0.5));
        piece.set_local_translation(Vec3::new(1.0, 0.0, 0.0));
        piece
    }

    #[test]
    fn test_add_frame_keeps_order_and_replaces() {
        let mut animation = KeyFrameAnimation::new();
        animation.add_frame(KeyFrame::new(ms(300)).with_translation(Vec3::x()));
        animation.add_frame(KeyFrame::new(ms(100)).with_translation(Vec3::y()));
        animation.add_frame(KeyFrame::new(ms(200)));
        animation.add_frame(KeyFrame::new(ms(100)).with_translation(Vec3::z()));

        let times: Vec<_> = animation.frames().iter().map(KeyFrame::time).collect();
        assert_eq!(times, [ms(100), ms(200), ms(300)]);
        assert_eq!(animation.frames()[0].translation.get(), Some(Vec3::z()));

        assert!(animation.remove_frame(ms(200)).is_some());
        assert!(animation.remove_frame(ms(250)).is_none());
        assert_eq!(animation.frames().len(), 2);
    }

    #[test]
    fn test_prepare_synthesizes_start_frame() {
        let target = piece();
        let mut animation = KeyFrameAnimation::new()
            .with_frame(KeyFrame::new(ms(500)).with_translation(Vec3::new(3.0, 0.0, 0.0)))
            .with_frame(KeyFrame::new(ms(1000)));

        animation.prepare(&target).unwrap();
        assert_eq!(animation.state(), AnimationState::Running);
        assert_eq!(animation.frames().len(), 3);
        assert_eq!(animation.frames()[0].time(), Duration::ZERO);
        assert_eq!(animation.frames()[0].translation.get(), Some(Vec3::new(1.0, 0.0, 0.0)));
        // Missing translation filled with zero
        assert_eq!(animation.frames()[2].translation.get(), Some(Vec3::zeros()));
    }

    #[test]
    fn test_prepare_rejects_incomplete_timelines() {
        let target = piece();
        let mut empty = KeyFrameAnimation::new();
        assert_eq!(empty.prepare(&target), Err(AnimationError::NoFrames));

        let mut lone = KeyFrameAnimation::new().with_frame(KeyFrame::new(Duration::ZERO));
        assert_eq!(lone.prepare(&target), Err(AnimationError::Incomplete));
        assert_eq!(lone.state(), AnimationState::Unprepared);
    }

    #[test]
    fn test_update_interpolates_then_finishes_on_last_frame() {
        let target = piece();
        let mut animation = KeyFrameAnimation::new()
            .with_frame(KeyFrame::new(ms(1000)).with_translation(Vec3::new(5.0, 0.0, 0.0)));
        animation.prepare(&target).unwrap();

        animation.update(ms(250), &target);
        assert_relative_eq!(target.local_translation().unwrap(), Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(target.world_bound().unwrap().center(), Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-5);

        // Overshoot in uneven steps
        animation.update(ms(500), &target);
        let state = animation.update(ms(333), &target);
        assert_eq!(state, AnimationState::Finished);
        assert_eq!(target.local_translation(), Some(Vec3::new(5.0, 0.0, 0.0)));

        // Further updates are no-ops
        target.set_local_translation(Vec3::zeros());
        assert_eq!(animation.update(ms(100), &target), AnimationState::Finished);
        assert_eq!(target.local_translation(), Some(Vec3::zeros()));
    }

    #[test]
    fn test_exact_end_time_finishes() {
        let target = piece();
        let mut animation = KeyFrameAnimation::new()
            .with_frame(KeyFrame::new(ms(100)).with_translation(Vec3::new(0.0, 1.0, 0.0)))
            .with_frame(KeyFrame::new(ms(200)).with_translation(Vec3::new(0.0, 2.0, 0.0)));
        animation.prepare(&target).unwrap();

        animation.update(ms(150), &target);
        assert_relative_eq!(target.local_translation().unwrap(), Vec3::new(0.0, 1.5, 0.0), epsilon = 1e-5);
        assert_eq!(animation.update(ms(50), &target), AnimationState::Finished);
        assert_eq!(target.local_translation(), Some(Vec3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn test_easing_shapes_progress() {
        let target = piece();
        let mut animation = KeyFrameAnimation::new()
            .with_easing(Easing::AccelerateDecelerate)
            .with_frame(KeyFrame::new(ms(1000)).with_translation(Vec3::new(1.0, 10.0, 0.0)));
        animation.prepare(&target).unwrap();

        animation.update(ms(100), &target);
        let y = target.local_translation().unwrap().y;
        assert!(y > 0.0 && y < 1.0, "eased start should lag linear progress, got {y}");
    }

    #[test]
    fn test_rotation_and_scale_channels() {
        let target = piece();
        let mut animation = KeyFrameAnimation::new()
            .with_frame(KeyFrame::new(ms(100)).with_rotation_degrees(90.0, Vec3::z()).with_scale(Vec3::repeat(3.0)));
        animation.prepare(&target).unwrap();

        animation.update(ms(50), &target);
        assert_relative_eq!(target.local_rotation().unwrap().angle(), std::f32::consts::FRAC_PI_4, epsilon = 1e-4);
        assert_relative_eq!(target.local_scale().unwrap(), Vec3::repeat(2.0), epsilon = 1e-5);
    }

    #[test]
    fn test_listener_sees_finished_animation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let animation = KeyFrameAnimation::new()
            .with_frame(KeyFrame::new(ms(40)).with_translation(Vec3::x()))
            .with_listener(move |animation: &KeyFrameAnimation, spatial: &Arc<Spatial>| {
                assert!(animation.is_finished());
                assert_eq!(spatial.controller_count(), 0);
                seen.fetch_add(1, Ordering::SeqCst);
            });

        let target = piece();
        target.add_controller(animation).unwrap();
        for _ in 0..5 {
            target.update(ms(40));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(target.local_translation(), Some(Vec3::x()));
    }
}
