//! Rays with slope-based box tests
//!
//! Implements "Fast Ray / Axis-Aligned Bounding Box Overlap Tests using Ray
//! Slopes" (Eisemann, Grosch, Müller, Magnor). Each ray classifies its
//! direction once into one of 26 sign patterns and precomputes the slopes
//! and intercepts of its projections onto the three axis planes, so a box
//! test is a handful of comparisons with no division.

use std::fmt;

use crate::foundation::math::Vec3;
use crate::scene::bounds::AABBox;

/// Sign of one direction component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Negative component
    Minus,
    /// Zero component: the ray is parallel to this axis' planes
    Zero,
    /// Positive component
    Plus,
}

impl Sign {
    fn of(value: f32) -> Self {
        if value < 0.0 {
            Self::Minus
        } else if value > 0.0 {
            Self::Plus
        } else {
            Self::Zero
        }
    }

    fn letter(self) -> char {
        match self {
            Self::Minus => 'M',
            Self::Zero => 'O',
            Self::Plus => 'P',
        }
    }
}

/// Sign pattern of a non-zero ray direction (MMM, MMP, ..., OOP, PPO, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification([Sign; 3]);

impl Classification {
    /// Classify a direction; `None` when every component is zero
    pub fn of(direction: &Vec3) -> Option<Self> {
        let signs = [Sign::of(direction.x), Sign::of(direction.y), Sign::of(direction.z)];
        if signs.iter().all(|&sign| sign == Sign::Zero) {
            None
        } else {
            Some(Self(signs))
        }
    }

    /// Sign of the given axis (0 = x, 1 = y, 2 = z)
    pub fn axis(&self, axis: usize) -> Sign {
        self.0[axis]
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|sign| write!(f, "{}", sign.letter()))
    }
}

/// Box test plan fixed by a ray's sign pattern
///
/// Corner selectors index `[min, max]`; `sign` is -1 or +1 on moving axes.
/// The lists hold the axes the ray moves along, the axes it is parallel to,
/// and the (a, b) plane pairs whose slope comparison can reject a box.
#[derive(Debug, Clone, Copy)]
struct SlopePlan {
    near: [usize; 3],
    far: [usize; 3],
    sign: [f32; 3],
    moving: [usize; 3],
    moving_len: usize,
    parallel: [usize; 3],
    parallel_len: usize,
    pairs: [(usize, usize); 6],
    pairs_len: usize,
}

impl SlopePlan {
    fn new(class: Classification) -> Self {
        let mut plan = Self {
            near: [0; 3],
            far: [1; 3],
            sign: [0.0; 3],
            moving: [0; 3],
            moving_len: 0,
            parallel: [0; 3],
            parallel_len: 0,
            pairs: [(0, 0); 6],
            pairs_len: 0,
        };
        for axis in 0..3 {
            match class.axis(axis) {
                Sign::Minus => {
                    plan.near[axis] = 1;
                    plan.far[axis] = 0;
                    plan.sign[axis] = -1.0;
                }
                Sign::Plus => plan.sign[axis] = 1.0,
                Sign::Zero => {
                    plan.parallel[plan.parallel_len] = axis;
                    plan.parallel_len += 1;
                    continue;
                }
            }
            plan.moving[plan.moving_len] = axis;
            plan.moving_len += 1;
        }
        for &a in &plan.moving[..plan.moving_len] {
            for &b in &plan.moving[..plan.moving_len] {
                if a != b {
                    plan.pairs[plan.pairs_len] = (a, b);
                    plan.pairs_len += 1;
                }
            }
        }
        plan
    }

    fn moving(&self) -> &[usize] {
        &self.moving[..self.moving_len]
    }

    fn parallel(&self) -> &[usize] {
        &self.parallel[..self.parallel_len]
    }

    fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs[..self.pairs_len]
    }
}

/// A ray with precomputed classification for fast box tests
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
    classification: Option<Classification>,
    plan: Option<SlopePlan>,
    // slopes[a][b] = d_b / d_a, intercepts[a][b] = o_b - slopes[a][b] * o_a
    slopes: [[f32; 3]; 3],
    intercepts: [[f32; 3]; 3],
}

impl Ray {
    /// Create a ray; the direction is normalized
    ///
    /// A zero or non-finite direction produces a degenerate ray that never
    /// hits anything.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = if direction.iter().all(|c| c.is_finite()) {
            direction.try_normalize(0.0).unwrap_or_else(Vec3::zeros)
        } else {
            Vec3::zeros()
        };
        let classification = Classification::of(&direction);
        if classification.is_none() {
            log::warn!("Ray at {origin:?} has no usable direction and will not hit anything");
        }

        let inv_direction = direction.map(|c| 1.0 / c);
        let mut slopes = [[0.0; 3]; 3];
        let mut intercepts = [[0.0; 3]; 3];
        for a in 0..3 {
            for b in 0..3 {
                if a != b {
                    slopes[a][b] = direction[b] * inv_direction[a];
                    intercepts[a][b] = origin[b] - slopes[a][b] * origin[a];
                }
            }
        }

        Self {
            origin,
            direction,
            inv_direction,
            classification,
            plan: classification.map(SlopePlan::new),
            slopes,
            intercepts,
        }
    }

    /// Origin of the ray
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Unit direction of the ray (zero for a degenerate ray)
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Sign pattern of the direction, `None` for a degenerate ray
    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    /// Point at `distance` along the ray
    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Whether the ray hits the box
    pub fn intersects(&self, bound: &AABBox) -> bool {
        self.intersection_distance(bound).is_some()
    }

    /// Entry distance into the box, or `None` on a miss
    ///
    /// The distance is the largest per-axis entry time over the axes the
    /// ray is not parallel to. It is negative when the origin lies inside
    /// the box.
    pub fn intersection_distance(&self, bound: &AABBox) -> Option<f32> {
        let plan = self.plan.as_ref()?;
        let corners = [bound.min, bound.max];
        let near = |axis: usize| corners[plan.near[axis]][axis];
        let far = |axis: usize| corners[plan.far[axis]][axis];

        // Origin already past the exit plane of a moving axis
        for &axis in plan.moving() {
            if (far(axis) - self.origin[axis]) * plan.sign[axis] < 0.0 {
                return None;
            }
        }
        for &axis in plan.parallel() {
            let o = self.origin[axis];
            if o < bound.min[axis] || o > bound.max[axis] {
                return None;
            }
        }

        // Height of the projected ray in the (a, b) plane where it leaves slab a
        for &(a, b) in plan.pairs() {
            let value = self.slopes[a][b] * far(a) - near(b) + self.intercepts[a][b];
            if value * plan.sign[b] < 0.0 {
                return None;
            }
        }

        let distance = plan
            .moving()
            .iter()
            .map(|&axis| (near(axis) - self.origin[axis]) * self.inv_direction[axis])
            .fold(f32::NEG_INFINITY, f32::max);
        Some(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> AABBox {
        AABBox::from_extremes(-1.0, -1.0, -1.0, 1.0, 1.0, 1.0)
    }

    #[test]
    fn test_axis_ray_hits_unit_box() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(ray.classification().unwrap().to_string(), "OOM");
        let distance = ray.intersection_distance(&unit_box()).unwrap();
        assert_relative_eq!(distance, 4.0);
    }

    #[test]
    fn test_axis_ray_misses_moved_box() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let moved = AABBox::from_center_extents(Vec3::new(10.0, 10.0, 10.0), Vec3::repeat(1.0));
        assert!(!ray.intersects(&moved));
    }

    #[test]
    fn test_box_behind_origin_is_missed() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(!ray.intersects(&unit_box()));
    }

    #[test]
    fn test_diagonal_ray_distance() {
        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(ray.classification().unwrap().to_string(), "MMM");
        let distance = ray.intersection_distance(&unit_box()).unwrap();
        assert_relative_eq!(ray.point_at(distance), Vec3::new(1.0, 1.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_planar_ray_hits_and_misses() {
        // MPO: travels in the z = 0.5 plane
        let ray = Ray::new(Vec3::new(4.0, -3.0, 0.5), Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(ray.classification().unwrap().to_string(), "MPO");
        assert!(ray.intersects(&unit_box()));

        let above = Ray::new(Vec3::new(4.0, -3.0, 1.5), Vec3::new(-1.0, 1.0, 0.0));
        assert!(!above.intersects(&unit_box()));

        let skew = Ray::new(Vec3::new(4.0, -6.0, 0.5), Vec3::new(-1.0, 1.0, 0.0));
        assert!(!skew.intersects(&unit_box()));
    }

    #[test]
    fn test_plan_lists_follow_sign_pattern() {
        let planar = SlopePlan::new(Classification::of(&Vec3::new(-1.0, 1.0, 0.0)).unwrap());
        assert_eq!(planar.moving(), &[0, 1]);
        assert_eq!(planar.parallel(), &[2]);
        assert_eq!(planar.pairs(), &[(0, 1), (1, 0)]);
        assert_eq!((planar.near[0], planar.far[0]), (1, 0));
        assert_eq!((planar.near[1], planar.far[1]), (0, 1));

        let diagonal = SlopePlan::new(Classification::of(&Vec3::new(1.0, -1.0, 1.0)).unwrap());
        assert_eq!(diagonal.moving(), &[0, 1, 2]);
        assert!(diagonal.parallel().is_empty());
        assert_eq!(diagonal.pairs().len(), 6);

        let axial = SlopePlan::new(Classification::of(&Vec3::new(0.0, 0.0, -1.0)).unwrap());
        assert_eq!(axial.moving(), &[2]);
        assert!(axial.pairs().is_empty());
    }

    #[test]
    fn test_zero_direction_never_hits() {
        let ray = Ray::new(Vec3::zeros(), Vec3::zeros());
        assert!(ray.classification().is_none());
        assert!(!ray.intersects(&unit_box()));
    }

    #[test]
    fn test_all_sign_patterns_are_distinct() {
        let mut seen = Vec::new();
        for x in [-1.0, 0.0, 1.0] {
            for y in [-1.0, 0.0, 1.0] {
                for z in [-1.0, 0.0, 1.0] {
                    if let Some(class) = Classification::of(&Vec3::new(x, y, z)) {
                        assert!(!seen.contains(&class));
                        seen.push(class);
                    }
                }
            }
        }
        assert_eq!(seen.len(), 26);
    }

    /// Reference slab test for comparison: (entry, exit)
    fn slab(origin: Vec3, direction: Vec3, bound: &AABBox) -> Option<(f32, f32)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            if direction[axis] == 0.0 {
                if origin[axis] < bound.min[axis] || origin[axis] > bound.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (bound.min[axis] - origin[axis]) / direction[axis];
            let t2 = (bound.max[axis] - origin[axis]) / direction[axis];
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }
        Some((t_min, t_max))
    }

    #[test]
    fn test_agrees_with_slab_method() {
        let bound = AABBox::from_extremes(-1.0, -0.5, -2.0, 1.5, 1.0, 0.5);
        let mut seed: u32 = 0x1234_5678;
        let mut next = move || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
        };

        let mut hits = 0;
        for n in 0..3000 {
            let origin = Vec3::new(next() * 6.0, next() * 6.0, next() * 6.0);
            let mut direction = Vec3::new(next(), next(), next());
            // Exercise the planar and axis-aligned classes too
            if n % 3 == 1 {
                direction[n % 5 % 3] = 0.0;
            }
            if n % 7 == 2 {
                direction[(n + 1) % 3] = 0.0;
                direction[(n + 2) % 3] = 0.0;
            }
            let ray = Ray::new(origin, direction);
            if ray.classification().is_none() || bound.contains_point(origin) {
                continue;
            }

            let expected = slab(origin, ray.direction(), &bound);
            match expected {
                // Skip grazing rays where rounding decides the outcome
                Some((t_min, t_max)) if (t_max - t_min).abs() < 1e-3 || t_max.abs() < 1e-3 => continue,
                Some((t_min, t_max)) if t_max >= t_min && t_max > 0.0 => {
                    let distance = ray.intersection_distance(&bound)
                        .unwrap_or_else(|| panic!("expected hit for {origin:?} {direction:?}"));
                    assert_relative_eq!(distance, t_min, epsilon = 1e-3);
                    hits += 1;
                }
                _ => assert!(!ray.intersects(&bound), "unexpected hit for {origin:?} {direction:?}"),
            }
        }
        assert!(hits > 0);
    }
}
