//! Pick results
//!
//! A [`PickResult`] collects every pickable leaf a ray hit during one tree
//! traversal, together with the entry distance along the ray.

use std::sync::Arc;

use crate::intersection::ray::Ray;
use crate::scene::spatial::Spatial;

/// One hit recorded during picking
#[derive(Clone)]
pub struct PickCandidate {
    /// Entry distance along the ray
    pub distance: f32,
    /// The leaf that was hit
    pub spatial: Arc<Spatial>,
}

impl std::fmt::Debug for PickCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickCandidate")
            .field("distance", &self.distance)
            .field("spatial", &self.spatial.name())
            .finish()
    }
}

/// Candidates hit by one pick ray
#[derive(Debug, Default)]
pub struct PickResult {
    ray: Option<Ray>,
    candidates: Vec<PickCandidate>,
    visited: usize,
}

impl PickResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty result remembering the ray it was cast with
    pub fn for_ray(ray: Ray) -> Self {
        Self {
            ray: Some(ray),
            ..Self::default()
        }
    }

    /// Ray this result was cast with, if recorded
    pub fn ray(&self) -> Option<&Ray> {
        self.ray.as_ref()
    }

    /// Record a hit
    pub fn add(&mut self, distance: f32, spatial: Arc<Spatial>) {
        self.candidates.push(PickCandidate { distance, spatial });
    }

    pub(crate) fn record_visit(&mut self) {
        self.visited += 1;
    }

    /// Number of spatials whose bound was tested during traversal
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Whether anything was hit
    pub fn has_hits(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Number of hits
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether nothing was hit
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Closest hit; on equal distances the first one recorded wins
    pub fn closest(&self) -> Option<&PickCandidate> {
        self.candidates
            .iter()
            .reduce(|best, candidate| if candidate.distance < best.distance { candidate } else { best })
    }

    /// Closest hit spatial
    pub fn closest_spatial(&self) -> Option<Arc<Spatial>> {
        self.closest().map(|candidate| Arc::clone(&candidate.spatial))
    }

    /// All hits ordered by increasing distance, ties in recording order
    pub fn sorted(&self) -> Vec<&PickCandidate> {
        let mut sorted: Vec<_> = self.candidates.iter().collect();
        sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        sorted
    }

    /// Forget all hits, keeping the ray
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.visited = 0;
    }
}
