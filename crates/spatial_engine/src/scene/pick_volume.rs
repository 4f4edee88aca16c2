//! Pick volumes
//!
//! An invisible box that makes a region pickable, for example the inside
//! of a hollow mesh. Its world bound is its model box carried through the
//! world transform.

use parking_lot::RwLock;

use crate::scene::bounds::AABBox;

/// Invisible pickable box
#[derive(Debug)]
pub struct PickVolume {
    model_bound: RwLock<AABBox>,
}

impl PickVolume {
    /// Create a volume with the given model-space box
    pub fn new(model_bound: AABBox) -> Self {
        Self {
            model_bound: RwLock::new(model_bound),
        }
    }

    /// Model-space box
    pub fn model_bound(&self) -> AABBox {
        *self.model_bound.read()
    }

    /// Replace the model-space box; takes effect on the next world bound update
    pub fn set_model_bound(&self, bound: AABBox) {
        *self.model_bound.write() = bound;
    }
}
