//! Umbra Core - geometry store and scene loading.
//!
//! This crate provides:
//!
//! - **Geometry store**: `Mesh`, `Material`, `GeometryStore` and the
//!   `ShapeId` / `PrimitiveId` handles used by hit records
//! - **Barycentric reconstruction** of per-vertex attributes at a hit point
//! - **Loading**: OBJ/MTL files via `tobj`, plus a built-in Cornell Box
//!
//! # Example
//!
//! ```ignore
//! use umbra_core::{cornell_box, load_obj};
//!
//! let store = match std::env::args().nth(1) {
//!     Some(path) => load_obj(path)?,
//!     None => cornell_box(),
//! };
//! println!("{} meshes, {} triangles", store.meshes().len(), store.triangle_count());
//! ```

pub mod barycentric;
pub mod cornell;
pub mod ids;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod store;

// Re-export commonly used types
pub use barycentric::{interpolate, Barycentric};
pub use cornell::cornell_box;
pub use ids::{PrimitiveId, ShapeId};
pub use material::Material;
pub use mesh::{Face, Mesh};
pub use obj::{load_obj, load_obj_from_str, LoadError, LoadResult};
pub use store::{GeometryError, GeometryStore};
