//! Triangle mesh geometry.
//!
//! A mesh holds everything the tracer needs to submit a shape and to shade
//! its hits: positions, per-vertex normals, faces and per-face material ids.

use umbra_math::{Aabb, Vec3};

use crate::barycentric::{interpolate, Barycentric};
use crate::ids::PrimitiveId;

/// Three vertex indices of one triangle, in declaration order.
pub type Face = [u32; 3];

/// An indexed triangle mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Mesh name (OBJ object/group name or built-in name)
    pub name: String,

    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals, same length as `positions`
    pub normals: Vec<Vec3>,

    /// Triangles
    pub faces: Vec<Face>,

    /// Index into the material table, one per face
    pub material_ids: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh.
    ///
    /// Normals that are missing, or whose count does not match the vertex
    /// count (face-varying data), are replaced by smooth normals.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        faces: Vec<Face>,
        normals: Option<Vec<Vec3>>,
        material_ids: Vec<u32>,
    ) -> Self {
        let name = name.into();
        let normals = match normals {
            Some(normals) if normals.len() == positions.len() => normals,
            Some(normals) => {
                log::debug!(
                    "Mesh '{}': normal count ({}) doesn't match vertex count ({}), computing smooth normals",
                    name,
                    normals.len(),
                    positions.len()
                );
                compute_normals(&positions, &faces)
            }
            None => compute_normals(&positions, &faces),
        };
        let bounds = compute_bounds(&positions);

        Self {
            name,
            positions,
            normals,
            faces,
            material_ids,
            bounds,
        }
    }

    /// Create a mesh whose faces all use one material.
    pub fn with_material(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        faces: Vec<Face>,
        normals: Option<Vec<Vec3>>,
        material: u32,
    ) -> Self {
        let material_ids = vec![material; faces.len()];
        Self::new(name, positions, faces, normals, material_ids)
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Corner positions of a triangle.
    pub fn triangle(&self, primitive: PrimitiveId) -> [Vec3; 3] {
        let [a, b, c] = self.faces[primitive.index()];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Material id of a triangle.
    pub fn material_id(&self, primitive: PrimitiveId) -> u32 {
        self.material_ids[primitive.index()]
    }

    /// Surface position at a hit.
    pub fn position_at(&self, primitive: PrimitiveId, bary: Barycentric) -> Vec3 {
        interpolate(&self.positions, &self.faces, primitive, bary)
    }

    /// Unit shading normal at a hit.
    pub fn normal_at(&self, primitive: PrimitiveId, bary: Barycentric) -> Vec3 {
        interpolate(&self.normals, &self.faces, primitive, bary).normalize_or_zero()
    }
}

/// Compute the axis-aligned bounding box of a point set.
fn compute_bounds(positions: &[Vec3]) -> Aabb {
    positions.iter().fold(Aabb::EMPTY, |mut bounds, p| {
        bounds.grow(*p);
        bounds
    })
}

/// Smooth vertex normals: the normalized, area-weighted sum of the normals
/// of every face touching the vertex. Faces are counter-clockwise when seen
/// from the side their normal points to.
pub fn compute_normals(positions: &[Vec3], faces: &[Face]) -> Vec<Vec3> {
    let vertex_count = positions.len();
    let mut normals = vec![Vec3::ZERO; vertex_count];

    for face in faces {
        let [i0, i1, i2] = face.map(|i| i as usize);
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            // Reported by GeometryStore validation.
            continue;
        }

        let face_normal = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    for normal in &mut normals {
        *normal = normal.try_normalize().unwrap_or(Vec3::Y);
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        Mesh::with_material("quad", positions, vec![[0, 1, 2], [0, 2, 3]], None, 0)
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = unit_quad();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.material_ids, vec![0, 0]);
        assert_eq!(mesh.normals.len(), 4);
    }

    #[test]
    fn test_computed_normals_follow_ccw_winding() {
        let mesh = unit_quad();
        for normal in &mesh.normals {
            assert!(normal.abs_diff_eq(Vec3::Z, 1e-6), "normal {normal:?}");
        }
    }

    #[test]
    fn test_mismatched_normals_are_recomputed() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let mesh = Mesh::with_material("tri", positions, vec![[0, 1, 2]], Some(vec![-Vec3::X]), 0);

        assert_eq!(mesh.normals.len(), 3);
        assert!(mesh.normals[0].abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_provided_normals_are_kept() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = vec![Vec3::X, Vec3::Y, Vec3::Z];
        let mesh = Mesh::with_material("tri", positions, vec![[0, 1, 2]], Some(normals.clone()), 0);

        assert_eq!(mesh.normals, normals);
    }

    #[test]
    fn test_bounds_computation() {
        let positions = vec![
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(0.0, 0.0, 0.0),
        ];
        let mesh = Mesh::with_material("tri", positions, vec![[0, 1, 2]], None, 0);

        assert_eq!(mesh.bounds.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(mesh.bounds.max, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_position_and_normal_at_hit() {
        let mesh = unit_quad();
        let prim = PrimitiveId(1);

        // Second triangle is [0, 2, 3]; u weights vertex 2, v weights vertex 3.
        let p = mesh.position_at(prim, Barycentric::new(0.5, 0.5));
        assert!(p.abs_diff_eq(Vec3::new(0.5, 1.0, 0.0), 1e-6));
        assert!(mesh.normal_at(prim, Barycentric::new(0.2, 0.3)).abs_diff_eq(Vec3::Z, 1e-6));
        assert_eq!(mesh.triangle(prim), [Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), Vec3::Y]);
    }
}
