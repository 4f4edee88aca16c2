//! Axis-aligned bounding boxes
//!
//! Every spatial caches a world-space [`AABBox`]. Meshes compute a model-space
//! box from their vertices and carry it into world space with
//! [`AABBox::transform_from`]; nodes union the world boxes of their children.

use crate::foundation::math::{Mat4, Vec3};

/// Axis-Aligned Bounding Box
///
/// A default box has `min == max == 0` on every axis and reports itself as
/// empty until a real extent is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AABBox {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABBox {
    /// Create a box from two corners given in any order
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Create a box from per-axis extremes given in any order
    pub fn from_extremes(x0: f32, y0: f32, z0: f32, x1: f32, y1: f32, z1: f32) -> Self {
        Self::new(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self::new(center - extents, center + extents)
    }

    /// Tight box around a flat `[x, y, z, x, y, z, ...]` array
    ///
    /// Returns `None` for an empty array. Trailing components that do not
    /// form a whole vertex are ignored.
    pub fn from_vertices(vertices: &[f32]) -> Option<Self> {
        let mut points = vertices.chunks_exact(3).map(|v| Vec3::new(v[0], v[1], v[2]));
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |bound, p| Self {
            min: bound.min.inf(&p),
            max: bound.max.sup(&p),
        }))
    }

    /// Whether the box has no extent on any axis, as a default box does
    ///
    /// Scene code does not use this to mean "unset": a spatial without a
    /// bound reports `None` from its bound accessors instead.
    pub fn is_empty(&self) -> bool {
        self.min == self.max
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB encloses another one
    pub fn contains_box(&self, other: &AABBox) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Smallest box enclosing both boxes
    pub fn union(&self, other: &AABBox) -> AABBox {
        AABBox {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Overwrite this box with `source` carried through `matrix`
    ///
    /// Interval arithmetic over the rotation/scale part (Arvo's method): each
    /// output axis starts at the matrix translation and accumulates, per input
    /// axis, the smaller and larger of `m[i][j] * min[j]` and `m[i][j] * max[j]`.
    /// The result encloses all eight transformed corners.
    pub fn transform_from(&mut self, source: &AABBox, matrix: &Mat4) {
        let mut min = Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        let mut max = min;

        for i in 0..3 {
            for j in 0..3 {
                let a = matrix[(i, j)] * source.min[j];
                let b = matrix[(i, j)] * source.max[j];
                if a < b {
                    min[i] += a;
                    max[i] += b;
                } else {
                    min[i] += b;
                    max[i] += a;
                }
            }
        }

        self.min = min;
        self.max = max;
    }

    /// Transform this box in place
    pub fn transform(&mut self, matrix: &Mat4) {
        let source = *self;
        self.transform_from(&source, matrix);
    }

    /// Copy of this box carried through `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> AABBox {
        let mut result = *self;
        result.transform(matrix);
        result
    }
}
