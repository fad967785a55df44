//! The geometry store: every mesh of the scene plus the material table.

use thiserror::Error;
use umbra_math::Aabb;

use crate::ids::{PrimitiveId, ShapeId};
use crate::material::Material;
use crate::mesh::Mesh;

/// Invariant violations found while building a `GeometryStore`.
#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("mesh '{mesh}': face {face} references vertex {index}, but there are only {vertex_count} vertices")]
    VertexIndexOutOfRange {
        mesh: String,
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("mesh '{mesh}': face {face} uses material {material}, but the table has {material_count} entries")]
    MaterialOutOfRange {
        mesh: String,
        face: usize,
        material: u32,
        material_count: usize,
    },

    #[error("mesh '{mesh}': {material_ids} material ids for {faces} faces")]
    MaterialCountMismatch {
        mesh: String,
        material_ids: usize,
        faces: usize,
    },

    #[error("mesh '{mesh}': {normals} normals for {vertices} vertices")]
    NormalCountMismatch {
        mesh: String,
        normals: usize,
        vertices: usize,
    },

    #[error("too many meshes for 32-bit shape ids: {0}")]
    TooManyShapes(usize),
}

/// Loaded scene data. Immutable once built; shape ids are mesh indices.
#[derive(Clone, Debug, Default)]
pub struct GeometryStore {
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
}

impl GeometryStore {
    /// Build a store, checking every mesh against the material table.
    pub fn new(meshes: Vec<Mesh>, materials: Vec<Material>) -> Result<Self, GeometryError> {
        if u32::try_from(meshes.len()).is_err() {
            return Err(GeometryError::TooManyShapes(meshes.len()));
        }
        for mesh in &meshes {
            validate_mesh(mesh, materials.len())?;
        }

        log::debug!(
            "Geometry store: {} meshes, {} triangles, {} materials",
            meshes.len(),
            meshes.iter().map(Mesh::triangle_count).sum::<usize>(),
            materials.len()
        );

        Ok(Self { meshes, materials })
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Mesh for a shape id handed out by the intersector.
    pub fn mesh(&self, shape: ShapeId) -> &Mesh {
        &self.meshes[shape.index()]
    }

    pub fn material(&self, id: u32) -> &Material {
        &self.materials[id as usize]
    }

    /// Material of one face of one shape.
    pub fn material_for(&self, shape: ShapeId, primitive: PrimitiveId) -> &Material {
        self.material(self.mesh(shape).material_id(primitive))
    }

    /// Meshes paired with the shape id they will receive when submitted in order.
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeId, &Mesh)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| (ShapeId(i as u32), mesh))
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Bounds of all meshes.
    pub fn bounds(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, mesh| Aabb::surrounding(&acc, &mesh.bounds))
    }
}

fn validate_mesh(mesh: &Mesh, material_count: usize) -> Result<(), GeometryError> {
    let vertex_count = mesh.positions.len();

    if mesh.normals.len() != vertex_count {
        return Err(GeometryError::NormalCountMismatch {
            mesh: mesh.name.clone(),
            normals: mesh.normals.len(),
            vertices: vertex_count,
        });
    }
    if mesh.material_ids.len() != mesh.faces.len() {
        return Err(GeometryError::MaterialCountMismatch {
            mesh: mesh.name.clone(),
            material_ids: mesh.material_ids.len(),
            faces: mesh.faces.len(),
        });
    }

    for (face, indices) in mesh.faces.iter().enumerate() {
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(GeometryError::VertexIndexOutOfRange {
                mesh: mesh.name.clone(),
                face,
                index,
                vertex_count,
            });
        }
    }

    for (face, &material) in mesh.material_ids.iter().enumerate() {
        if material as usize >= material_count {
            return Err(GeometryError::MaterialOutOfRange {
                mesh: mesh.name.clone(),
                face,
                material,
                material_count,
            });
        }
    }

    Ok(())
}
