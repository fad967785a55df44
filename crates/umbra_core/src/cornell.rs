//! Built-in Cornell Box.
//!
//! Same layout as the classic "CornellBox-Original" asset: a room spanning
//! x in [-1, 1], y in [0, 2], z in [-1, 1] with an open front at z = 1, a
//! red left wall, a green right wall, two white boxes and a light panel
//! just below the ceiling. The default camera at (0, 1, 3) looks into it.

use umbra_math::Vec3;

use crate::material::Material;
use crate::mesh::{Face, Mesh};
use crate::store::GeometryStore;

const WHITE: u32 = 0;
const RED: u32 = 1;
const GREEN: u32 = 2;
const LIGHT: u32 = 3;

/// Build the built-in Cornell Box scene.
pub fn cornell_box() -> GeometryStore {
    let materials = vec![
        Material::new("white", Vec3::new(0.725, 0.71, 0.68)),
        Material::new("red", Vec3::new(0.63, 0.065, 0.05)),
        Material::new("green", Vec3::new(0.14, 0.45, 0.091)),
        Material::new("light", Vec3::new(0.78, 0.78, 0.78)),
    ];

    let meshes = vec![
        quad(
            "floor",
            [
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            Vec3::Y,
            WHITE,
        ),
        quad(
            "ceiling",
            [
                Vec3::new(-1.0, 2.0, -1.0),
                Vec3::new(1.0, 2.0, -1.0),
                Vec3::new(1.0, 2.0, 1.0),
                Vec3::new(-1.0, 2.0, 1.0),
            ],
            -Vec3::Y,
            WHITE,
        ),
        quad(
            "back_wall",
            [
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 2.0, -1.0),
                Vec3::new(-1.0, 2.0, -1.0),
            ],
            Vec3::Z,
            WHITE,
        ),
        quad(
            "left_wall",
            [
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(-1.0, 2.0, -1.0),
                Vec3::new(-1.0, 2.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            Vec3::X,
            RED,
        ),
        quad(
            "right_wall",
            [
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 2.0, -1.0),
                Vec3::new(1.0, 2.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
            ],
            -Vec3::X,
            GREEN,
        ),
        quad(
            "light",
            [
                Vec3::new(-0.24, 1.98, -0.22),
                Vec3::new(0.23, 1.98, -0.22),
                Vec3::new(0.23, 1.98, 0.16),
                Vec3::new(-0.24, 1.98, 0.16),
            ],
            -Vec3::Y,
            LIGHT,
        ),
        block(
            "short_box",
            [
                Vec3::new(0.53, 0.6, 0.75),
                Vec3::new(0.7, 0.6, 0.17),
                Vec3::new(0.13, 0.6, 0.0),
                Vec3::new(-0.05, 0.6, 0.57),
            ],
            WHITE,
        ),
        block(
            "tall_box",
            [
                Vec3::new(-0.53, 1.2, 0.09),
                Vec3::new(0.04, 1.2, -0.09),
                Vec3::new(-0.14, 1.2, -0.67),
                Vec3::new(-0.71, 1.2, -0.49),
            ],
            WHITE,
        ),
    ];

    // Indices and material ids above are constructed in range.
    GeometryStore::new(meshes, materials).unwrap_or_else(|e| unreachable!("built-in scene is invalid: {e}"))
}

/// Two counter-clockwise triangles for a planar quad, flat-shaded with the
/// normal on the `facing` side.
fn quad(name: &str, corners: [Vec3; 4], facing: Vec3, material: u32) -> Mesh {
    let mut positions = Vec::with_capacity(4);
    let mut normals = Vec::with_capacity(4);
    let mut faces = Vec::with_capacity(2);
    push_quad(&mut positions, &mut normals, &mut faces, corners, facing);
    Mesh::with_material(name, positions, faces, Some(normals), material)
}

/// A box standing on the floor: the top face plus four sides, no bottom.
fn block(name: &str, top: [Vec3; 4], material: u32) -> Mesh {
    let mut positions = Vec::with_capacity(20);
    let mut normals = Vec::with_capacity(20);
    let mut faces = Vec::with_capacity(10);

    let center = (top[0] + top[1] + top[2] + top[3]) * 0.25;
    push_quad(&mut positions, &mut normals, &mut faces, top, Vec3::Y);

    for i in 0..4 {
        let a = top[i];
        let b = top[(i + 1) % 4];
        let side = [
            Vec3::new(a.x, 0.0, a.z),
            Vec3::new(b.x, 0.0, b.z),
            b,
            a,
        ];
        let mut outward = (a + b) * 0.5 - center;
        outward.y = 0.0;
        push_quad(&mut positions, &mut normals, &mut faces, side, outward);
    }

    Mesh::with_material(name, positions, faces, Some(normals), material)
}

fn push_quad(
    positions: &mut Vec<Vec3>,
    normals: &mut Vec<Vec3>,
    faces: &mut Vec<Face>,
    corners: [Vec3; 4],
    facing: Vec3,
) {
    let base = positions.len() as u32;
    let mut normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize();

    if normal.dot(facing) < 0.0 {
        normal = -normal;
        faces.push([base, base + 2, base + 1]);
        faces.push([base, base + 3, base + 2]);
    } else {
        faces.push([base, base + 1, base + 2]);
        faces.push([base, base + 2, base + 3]);
    }

    positions.extend_from_slice(&corners);
    normals.extend(std::iter::repeat(normal).take(4));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PrimitiveId, ShapeId};

    #[test]
    fn test_cornell_box_layout() {
        let store = cornell_box();

        assert_eq!(store.meshes().len(), 8);
        assert_eq!(store.materials().len(), 4);
        // 6 quads + 2 boxes of 5 quads each
        assert_eq!(store.triangle_count(), 6 * 2 + 2 * 10);

        let bounds = store.bounds();
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_walls_face_into_the_room() {
        let store = cornell_box();
        let center = Vec3::new(0.0, 1.0, 0.0);

        for (_, mesh) in store.shapes().take(5) {
            let p = mesh.positions[0];
            let n = mesh.normals[0];
            assert!(n.dot(center - p) > 0.0, "{} faces outward", mesh.name);
        }
    }

    #[test]
    fn test_winding_matches_normals() {
        let store = cornell_box();

        for (_, mesh) in store.shapes() {
            for prim in 0..mesh.triangle_count() as u32 {
                let [a, b, c] = mesh.triangle(PrimitiveId(prim));
                let geometric = (b - a).cross(c - a).normalize();
                let [i0, _, _] = mesh.faces[prim as usize];
                assert!(
                    geometric.dot(mesh.normals[i0 as usize]) > 0.99,
                    "{} triangle {} winding disagrees with its normal",
                    mesh.name,
                    prim
                );
            }
        }
    }

    #[test]
    fn test_wall_colors() {
        let store = cornell_box();
        assert_eq!(store.material_for(ShapeId(3), PrimitiveId(0)).name, "red");
        assert_eq!(store.material_for(ShapeId(4), PrimitiveId(0)).name, "green");
    }
}
