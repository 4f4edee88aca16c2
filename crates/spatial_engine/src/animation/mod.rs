//! Keyframe animation
//!
//! Animations are controllers attached to a spatial. Each simulation tick
//! advances them, interpolates the spatial's local transform between the
//! bracketing keyframes and refreshes its world state.

pub mod easing;
pub mod keyframe;
pub mod keyframe_animation;

pub use easing::Easing;
pub use keyframe::KeyFrame;
pub use keyframe_animation::{
    AnimationError, AnimationId, AnimationListener, AnimationState, KeyFrameAnimation,
};
