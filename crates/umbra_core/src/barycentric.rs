//! Barycentric reconstruction of per-vertex attributes at a hit point.

use std::ops::{Add, Mul};

use crate::ids::PrimitiveId;
use crate::mesh::Face;

/// Barycentric coordinates of a point inside a triangle.
///
/// `u` weights the face's second vertex, `v` the third, and the first vertex
/// gets the remaining `1 - u - v`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Barycentric {
    pub u: f32,
    pub v: f32,
}

impl Barycentric {
    pub fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }

    /// The three vertex weights `(1 - u - v, u, v)`.
    #[inline]
    pub fn weights(&self) -> [f32; 3] {
        [1.0 - self.u - self.v, self.u, self.v]
    }

    /// Blend three values as `a*(1-u-v) + b*u + c*v`.
    #[inline]
    pub fn blend<T>(&self, a: T, b: T, c: T) -> T
    where
        T: Copy + Mul<f32, Output = T> + Add<Output = T>,
    {
        let [wa, wb, wc] = self.weights();
        a * wa + b * wb + c * wc
    }
}

/// Interpolate a per-vertex attribute over face `primitive`.
///
/// `attributes` is indexed by vertex (positions or normals) and `faces`
/// holds the vertex indices of each triangle in declaration order.
///
/// # Panics
///
/// Panics if `primitive` or one of its vertex indices is out of range. A
/// `PrimitiveId` only comes out of a real hit, so this is a caller bug.
pub fn interpolate<T>(attributes: &[T], faces: &[Face], primitive: PrimitiveId, bary: Barycentric) -> T
where
    T: Copy + Mul<f32, Output = T> + Add<Output = T>,
{
    let [i0, i1, i2] = faces[primitive.index()];
    bary.blend(
        attributes[i0 as usize],
        attributes[i1 as usize],
        attributes[i2 as usize],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_math::Vec3;

    fn triangle() -> (Vec<Vec3>, Vec<Face>) {
        let positions = vec![
            Vec3::new(9.0, 9.0, 9.0), // unused vertex, keeps indices non-trivial
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, -1.0),
        ];
        (positions, vec![[0, 0, 0], [1, 2, 3]])
    }

    #[test]
    fn test_corners_are_exact() {
        let (positions, faces) = triangle();
        let prim = PrimitiveId(1);

        assert_eq!(interpolate(&positions, &faces, prim, Barycentric::new(0.0, 0.0)), positions[1]);
        assert_eq!(interpolate(&positions, &faces, prim, Barycentric::new(1.0, 0.0)), positions[2]);
        assert_eq!(interpolate(&positions, &faces, prim, Barycentric::new(0.0, 1.0)), positions[3]);
    }

    #[test]
    fn test_centroid() {
        let (positions, faces) = triangle();
        let third = 1.0 / 3.0;
        let p = interpolate(&positions, &faces, PrimitiveId(1), Barycentric::new(third, third));

        let expected = (positions[1] + positions[2] + positions[3]) / 3.0;
        assert!(p.abs_diff_eq(expected, 1e-6), "got {p:?}, expected {expected:?}");
    }

    #[test]
    fn test_follows_declared_vertex_order() {
        let (positions, _) = triangle();
        let reversed = vec![[3, 2, 1]];

        let p = interpolate(&positions, &reversed, PrimitiveId(0), Barycentric::new(0.0, 0.0));
        assert_eq!(p, positions[3]);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let bary = Barycentric::new(0.25, 0.5);
        let w = bary.weights();
        assert_eq!(w, [0.25, 0.25, 0.5]);
        assert_eq!(w.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_blend_scalar() {
        let bary = Barycentric::new(0.5, 0.25);
        assert_eq!(bary.blend(4.0_f32, 8.0, 16.0), 4.0 * 0.25 + 8.0 * 0.5 + 16.0 * 0.25);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_primitive_panics() {
        let (positions, faces) = triangle();
        interpolate(&positions, &faces, PrimitiveId(7), Barycentric::default());
    }
}
