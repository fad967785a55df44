use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box stored as its two extreme corners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// A box containing nothing; growing it by any point yields that point.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Bounds of a triangle.
    pub fn from_triangle(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Grow the box so that it contains `p`.
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        if extent.x > extent.y && extent.x > extent.z {
            0
        } else if extent.y > extent.z {
            1
        } else {
            2
        }
    }

    /// Slab test against a ray.
    ///
    /// `inv_dir` is the component-wise reciprocal of the ray direction,
    /// computed once per ray by the caller. Flat boxes (zero extent on one
    /// axis) are accepted, which matters for axis-aligned quads.
    #[inline]
    pub fn hit(&self, ray: &Ray, inv_dir: Vec3, ray_t: Interval) -> bool {
        let mut t_near = ray_t.min;
        let mut t_far = ray_t.max;

        for axis in 0..3 {
            let t0 = (self.min[axis] - ray.origin[axis]) * inv_dir[axis];
            let t1 = (self.max[axis] - ray.origin[axis]) * inv_dir[axis];

            // f32::min/max drop the NaN of an origin lying on a slab plane
            // of an axis the ray is parallel to.
            t_near = t_near.max(t0.min(t1));
            t_far = t_far.min(t0.max(t1));
        }

        t_near <= t_far
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
