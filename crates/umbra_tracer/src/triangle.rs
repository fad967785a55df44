//! Ray-triangle intersection.
//!
//! Uses the Möller-Trumbore algorithm. Triangles are two-sided.

use umbra_core::Barycentric;
use umbra_math::{Aabb, Interval, Ray, Vec3};

/// Hit parameters of a single ray-triangle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub barycentric: Barycentric,
}

/// A triangle of a committed shape.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    /// Owning shape (submission index)
    pub shape: u32,
    /// Face index within the shape
    pub primitive: u32,
}

impl Triangle {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_triangle(self.v0, self.v1, self.v2)
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Intersect a ray, accepting only `t` strictly inside `ray_t`.
    ///
    /// The returned `u` weights `v1` and `v` weights `v2`.
    #[inline]
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-12 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(TriangleHit {
            t,
            barycentric: Barycentric::new(u, v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy_triangle(z: f32) -> Triangle {
        Triangle {
            v0: Vec3::new(-1.0, -1.0, z),
            v1: Vec3::new(1.0, -1.0, z),
            v2: Vec3::new(0.0, 1.0, z),
            shape: 0,
            primitive: 0,
        }
    }

    #[test]
    fn test_triangle_hit() {
        let tri = xy_triangle(-1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        let hit = tri.intersect(&ray, ray.extent()).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);

        // Barycentric coordinates reproduce the hit point.
        let p = hit.barycentric.blend(tri.v0, tri.v1, tri.v2);
        assert!(p.abs_diff_eq(ray.at(hit.t), 1e-5));
    }

    #[test]
    fn test_triangle_back_face_hit() {
        let tri = xy_triangle(-1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);

        assert!(tri.intersect(&ray, ray.extent()).is_some());
    }

    #[test]
    fn test_triangle_miss() {
        let tri = xy_triangle(-1.0);

        let away = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(tri.intersect(&away, away.extent()).is_none());

        let beside = Ray::new(Vec3::new(5.0, 0.0, 0.0), -Vec3::Z);
        assert!(tri.intersect(&beside, beside.extent()).is_none());

        let parallel = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::X);
        assert!(tri.intersect(&parallel, parallel.extent()).is_none());
    }

    #[test]
    fn test_triangle_extent_is_exclusive() {
        let tri = xy_triangle(-1.0);
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);

        // Exactly at t_max is not a hit.
        assert!(tri.intersect(&ray, Interval::new(0.0, 1.0)).is_none());
        assert!(tri.intersect(&ray, Interval::new(0.0, 1.001)).is_some());
        assert!(tri.intersect(&ray, Interval::new(1.5, 10.0)).is_none());
    }

    #[test]
    fn test_triangle_bounds_and_centroid() {
        let tri = xy_triangle(2.0);

        assert_eq!(tri.bounds().min, Vec3::new(-1.0, -1.0, 2.0));
        assert_eq!(tri.bounds().max, Vec3::new(1.0, 1.0, 2.0));
        assert!(tri.centroid().abs_diff_eq(Vec3::new(0.0, -1.0 / 3.0, 2.0), 1e-6));
    }
}
