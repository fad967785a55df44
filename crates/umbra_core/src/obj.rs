//! OBJ/MTL scene loading via `tobj`.
//!
//! Every OBJ object becomes one mesh (and therefore one shape, in file
//! order). Faces are triangulated and re-indexed so that positions and
//! normals share one index stream.

use std::io::BufReader;
use std::path::Path;

use thiserror::Error;
use umbra_math::Vec3;

use crate::material::Material;
use crate::mesh::{Face, Mesh};
use crate::store::{GeometryError, GeometryStore};

/// Errors that can occur while loading a scene.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ parse error in {source_name}: {error}")]
    Obj {
        source_name: String,
        #[source]
        error: tobj::LoadError,
    },

    #[error("No geometry found in {0}")]
    NoGeometry(String),

    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Load an OBJ file (and the MTL libraries it references).
///
/// # Example
///
/// ```ignore
/// let store = umbra_core::load_obj("assets/CornellBox/orig.obj")?;
/// ```
pub fn load_obj<P: AsRef<Path>>(path: P) -> LoadResult<GeometryStore> {
    let path = path.as_ref();
    let source_name = path.display().to_string();

    if !path.is_file() {
        return Err(LoadError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("scene file not found: {}", source_name),
        )));
    }

    log::info!("Loading OBJ: {}", source_name);
    let (models, materials) = tobj::load_obj(path, &load_options()).map_err(|error| LoadError::Obj {
        source_name: source_name.clone(),
        error,
    })?;

    build_store(models, materials, &source_name)
}

/// Load an OBJ document held in memory. `mtl` is served for any `mtllib`
/// statement in the document.
pub fn load_obj_from_str(obj: &str, mtl: Option<&str>) -> LoadResult<GeometryStore> {
    let source_name = "<memory>";
    let mut reader = BufReader::new(obj.as_bytes());

    let (models, materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_| match mtl {
        Some(src) => tobj::load_mtl_buf(&mut src.as_bytes()),
        None => Err(tobj::LoadError::OpenFileFailed),
    })
    .map_err(|error| LoadError::Obj {
        source_name: source_name.to_string(),
        error,
    })?;

    build_store(models, materials, source_name)
}

fn build_store(
    models: Vec<tobj::Model>,
    materials: Result<Vec<tobj::Material>, tobj::LoadError>,
    source_name: &str,
) -> LoadResult<GeometryStore> {
    let mut table: Vec<Material> = match materials {
        Ok(materials) => materials.iter().map(convert_material).collect(),
        Err(e) => {
            log::warn!("{}: failed to load materials ({}), using default material", source_name, e);
            Vec::new()
        }
    };

    // Appended on first use by a mesh without a usable material.
    let mut fallback: Option<u32> = None;
    let mut meshes = Vec::with_capacity(models.len());

    for model in models {
        let mesh = &model.mesh;
        if mesh.indices.is_empty() {
            log::debug!("{}: skipping '{}' (no faces)", source_name, model.name);
            continue;
        }

        let material = match mesh.material_id {
            Some(id) if id < table.len() => id as u32,
            other => {
                if let Some(id) = other {
                    log::warn!("{}: '{}' references unknown material {}", source_name, model.name, id);
                }
                *fallback.get_or_insert_with(|| {
                    table.push(Material::default());
                    (table.len() - 1) as u32
                })
            }
        };

        let positions: Vec<Vec3> = mesh.positions.chunks_exact(3).map(Vec3::from_slice).collect();
        let normals = if mesh.normals.is_empty() {
            None
        } else {
            Some(mesh.normals.chunks_exact(3).map(Vec3::from_slice).collect())
        };
        let faces: Vec<Face> = mesh
            .indices
            .chunks_exact(3)
            .map(|f| [f[0], f[1], f[2]])
            .collect();

        log::debug!(
            "{}: '{}' {} vertices, {} triangles, material {}",
            source_name,
            model.name,
            positions.len(),
            faces.len(),
            material
        );

        meshes.push(Mesh::with_material(model.name, positions, faces, normals, material));
    }

    if meshes.is_empty() {
        return Err(LoadError::NoGeometry(source_name.to_string()));
    }

    let store = GeometryStore::new(meshes, table)?;
    log::info!(
        "Loaded {}: {} meshes, {} triangles, {} materials",
        source_name,
        store.meshes().len(),
        store.triangle_count(),
        store.materials().len()
    );
    Ok(store)
}

fn convert_material(material: &tobj::Material) -> Material {
    let diffuse = material.diffuse.map(Vec3::from_array).unwrap_or(Vec3::splat(0.5));
    Material::new(material.name.clone(), diffuse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PrimitiveId, ShapeId};

    const QUAD_OBJ: &str = "\
mtllib scene.mtl
o floor
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
vn 0 1 0
usemtl white
f 1//1 3//1 2//1
f 1//1 4//1 3//1
o wall
v -1 0 -1
v -1 2 -1
v -1 2 1
usemtl red
f 5 6 7
";

    const QUAD_MTL: &str = "\
newmtl white
Kd 0.8 0.8 0.8
newmtl red
Kd 0.6 0.05 0.05
";

    #[test]
    fn test_load_objects_as_shapes() {
        let store = load_obj_from_str(QUAD_OBJ, Some(QUAD_MTL)).unwrap();

        assert_eq!(store.meshes().len(), 2);
        assert_eq!(store.mesh(ShapeId(0)).name, "floor");
        assert_eq!(store.mesh(ShapeId(0)).triangle_count(), 2);
        assert_eq!(store.mesh(ShapeId(1)).triangle_count(), 1);

        let red = store.material_for(ShapeId(1), PrimitiveId(0));
        assert_eq!(red.name, "red");
        assert!(red.diffuse.abs_diff_eq(Vec3::new(0.6, 0.05, 0.05), 1e-6));
    }

    #[test]
    fn test_loaded_normals() {
        let store = load_obj_from_str(QUAD_OBJ, Some(QUAD_MTL)).unwrap();

        let floor = store.mesh(ShapeId(0));
        assert!(floor.normals.iter().all(|n| n.abs_diff_eq(Vec3::Y, 1e-6)));

        // The wall has no normals in the file; they are computed.
        let wall = store.mesh(ShapeId(1));
        assert_eq!(wall.normals.len(), wall.positions.len());
        assert!(wall.normals[0].abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_missing_mtl_uses_default_material() {
        let store = load_obj_from_str(QUAD_OBJ, None).unwrap();

        assert_eq!(store.materials().len(), 1);
        assert_eq!(store.material_for(ShapeId(0), PrimitiveId(0)), &Material::default());
        assert_eq!(store.material_for(ShapeId(1), PrimitiveId(0)), &Material::default());
    }

    #[test]
    fn test_malformed_obj_is_a_load_error() {
        let err = load_obj_from_str("v 1 x 3\nf 1 2 3\n", None).unwrap_err();
        assert!(matches!(err, LoadError::Obj { .. }), "got {err:?}");
    }

    #[test]
    fn test_no_faces_is_no_geometry() {
        let err = load_obj_from_str("v 0 0 0\nv 1 0 0\n", None).unwrap_err();
        assert!(matches!(err, LoadError::NoGeometry(_)), "got {err:?}");
    }

    #[test]
    fn test_missing_file() {
        let err = load_obj("/definitely/not/here.obj").unwrap_err();
        match err {
            LoadError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
