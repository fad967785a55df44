//! Intersection devices, scene commit and batched asynchronous queries.
//!
//! Usage is strictly staged: pick a device with [`IntersectionApi::create`],
//! attach meshes to the returned [`SceneBuilder`], then [`SceneBuilder::commit`]
//! it. Only a [`CommittedScene`] can be queried. Each query takes its ray
//! buffer by value, runs on the rayon pool, and hands both buffers back
//! through [`PendingQuery::wait`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use umbra_core::{Face, GeometryError, Mesh, ShapeId};
use umbra_math::{Ray, Vec3};

use crate::buffer::Buffer;
use crate::bvh::BvhScene;
use crate::error::{QueryKind, TraceError, TraceResult};
use crate::hit::{HitRecord, Occlusion};

/// A backend able to answer batched nearest-hit and any-hit queries.
///
/// `rays[k]` produces `results[k]`; both slices have the same length.
pub trait Intersector: Send + Sync {
    fn device(&self) -> DeviceKind;

    fn intersect(&self, rays: &[Ray], hits: &mut [HitRecord]) -> TraceResult<()>;

    fn occluded(&self, rays: &[Ray], occlusion: &mut [Occlusion]) -> TraceResult<()>;
}

/// Available intersection backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Built-in BVH, always available
    Cpu,
    /// Intel Embree 4 (`embree` feature)
    Embree,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => f.write_str("cpu"),
            DeviceKind::Embree => f.write_str("embree"),
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" | "bvh" => Ok(DeviceKind::Cpu),
            "embree" => Ok(DeviceKind::Embree),
            other => Err(TraceError::DeviceUnavailable(format!(
                "unknown device '{other}' (expected cpu or embree)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    pub name: String,
    pub threads: usize,
}

/// List the devices usable in this build, preferred first.
pub fn enumerate_devices() -> Vec<DeviceInfo> {
    let threads = rayon::current_num_threads();
    let mut devices = Vec::with_capacity(2);

    #[cfg(feature = "embree")]
    match crate::embree::probe() {
        Ok(()) => devices.push(DeviceInfo {
            kind: DeviceKind::Embree,
            name: "Intel Embree 4".to_string(),
            threads,
        }),
        Err(e) => log::warn!("Embree compiled in but unusable: {}", e),
    }

    devices.push(DeviceInfo {
        kind: DeviceKind::Cpu,
        name: "CPU BVH".to_string(),
        threads,
    });

    devices
}

/// Entry point of the intersection API.
pub struct IntersectionApi;

impl IntersectionApi {
    /// Select a device and start building a scene on it.
    ///
    /// With no preference the first enumerated device is used.
    pub fn create(preference: Option<DeviceKind>) -> TraceResult<SceneBuilder> {
        let devices = enumerate_devices();

        let device = match preference {
            Some(kind) => devices.into_iter().find(|d| d.kind == kind).ok_or_else(|| {
                TraceError::DeviceUnavailable(format!("{kind} is not available in this build"))
            })?,
            None => devices.into_iter().next().ok_or_else(|| {
                TraceError::DeviceUnavailable("no intersection device found".to_string())
            })?,
        };

        log::info!(
            "Using intersection device: {} ({} threads)",
            device.name,
            device.threads
        );

        Ok(SceneBuilder {
            device,
            shapes: Vec::new(),
        })
    }
}

/// Geometry of one attached shape, as handed to a backend.
#[derive(Debug, Clone)]
pub struct ShapeGeometry {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Face>,
}

/// A scene that is still accepting shapes.
pub struct SceneBuilder {
    device: DeviceInfo,
    shapes: Vec<ShapeGeometry>,
}

impl SceneBuilder {
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Attach a mesh; shape ids follow attach order starting at 0.
    pub fn attach(&mut self, mesh: &Mesh) -> TraceResult<ShapeId> {
        let id = u32::try_from(self.shapes.len())
            .map_err(|_| GeometryError::TooManyShapes(self.shapes.len()))?;

        let vertex_count = mesh.positions.len();
        for (face, indices) in mesh.faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(GeometryError::VertexIndexOutOfRange {
                    mesh: mesh.name.clone(),
                    face,
                    index,
                    vertex_count,
                }
                .into());
            }
        }

        self.shapes.push(ShapeGeometry {
            positions: mesh.positions.clone(),
            faces: mesh.faces.clone(),
        });

        log::debug!(
            "Attached shape {} '{}' ({} triangles)",
            id,
            mesh.name,
            mesh.faces.len()
        );
        Ok(ShapeId(id))
    }

    /// Build the acceleration structure. The scene is immutable afterwards.
    pub fn commit(self) -> TraceResult<CommittedScene> {
        let start = std::time::Instant::now();
        let shape_count = self.shapes.len();

        if shape_count == 0 {
            log::warn!("Committing an empty scene; every query will miss");
        }

        let backend: Arc<dyn Intersector> = match self.device.kind {
            DeviceKind::Cpu => Arc::new(BvhScene::build(&self.shapes)),
            #[cfg(feature = "embree")]
            DeviceKind::Embree => Arc::new(crate::embree::EmbreeScene::new(self.shapes)?),
            #[cfg(not(feature = "embree"))]
            DeviceKind::Embree => {
                return Err(TraceError::DeviceUnavailable(
                    "built without the embree feature".to_string(),
                ))
            }
        };

        log::info!(
            "Committed {} shapes on {} in {:?}",
            shape_count,
            backend.device(),
            start.elapsed()
        );

        Ok(CommittedScene {
            device: self.device,
            shape_count,
            backend,
        })
    }
}

/// An immutable, queryable scene.
#[derive(Clone)]
pub struct CommittedScene {
    device: DeviceInfo,
    shape_count: usize,
    backend: Arc<dyn Intersector>,
}

impl CommittedScene {
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn shape_count(&self) -> usize {
        self.shape_count
    }

    /// Start a nearest-hit query over `rays`.
    pub fn query_intersection(&self, rays: Buffer<Ray>) -> PendingQuery<HitRecord> {
        self.dispatch(QueryKind::Intersection, rays, |backend, rays, hits| {
            backend.intersect(rays, hits)
        })
    }

    /// Start an any-hit query over `rays`.
    pub fn query_occlusion(&self, rays: Buffer<Ray>) -> PendingQuery<Occlusion> {
        self.dispatch(QueryKind::Occlusion, rays, |backend, rays, flags| {
            backend.occluded(rays, flags)
        })
    }

    fn dispatch<T, F>(&self, kind: QueryKind, rays: Buffer<Ray>, kernel: F) -> PendingQuery<T>
    where
        T: Clone + Default + Send + 'static,
        F: FnOnce(&dyn Intersector, &[Ray], &mut [T]) -> TraceResult<()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(1);

        if rays.is_empty() {
            // Nothing to spawn; the error surfaces from wait().
            let _ = sender.send(Err(TraceError::query(kind, "empty ray batch")));
            return PendingQuery { kind, receiver };
        }

        let backend = Arc::clone(&self.backend);
        rayon::spawn(move || {
            let start = std::time::Instant::now();
            let mut results = Buffer::<T>::new(kind.result_label(), rays.len());

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                kernel(backend.as_ref(), &rays.map()[..], &mut results.map_mut()[..])
            }));

            let completed = match outcome {
                Ok(Ok(())) => Ok(Completed { rays, results }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(TraceError::query(kind, "worker panicked")),
            };

            log::debug!("{} query finished in {:?}", kind, start.elapsed());

            // The receiver may already be gone if the caller dropped the handle.
            let _ = sender.send(completed);
        });

        PendingQuery { kind, receiver }
    }
}

impl fmt::Debug for CommittedScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommittedScene")
            .field("device", &self.device)
            .field("shape_count", &self.shape_count)
            .finish()
    }
}

/// Completion handle of an in-flight query.
#[must_use = "a query must be waited on to get its buffers back"]
pub struct PendingQuery<T> {
    kind: QueryKind,
    receiver: mpsc::Receiver<TraceResult<Completed<T>>>,
}

impl<T> PendingQuery<T> {
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Block until the query completes.
    pub fn wait(self) -> TraceResult<Completed<T>> {
        self.receiver
            .recv()
            .map_err(|_| TraceError::query(self.kind, "query worker disconnected"))?
    }
}

/// Buffers handed back by a finished query.
#[derive(Debug)]
pub struct Completed<T> {
    pub rays: Buffer<Ray>,
    pub results: Buffer<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(z: f32) -> Mesh {
        let positions = vec![
            Vec3::new(-1.0, -1.0, z),
            Vec3::new(1.0, -1.0, z),
            Vec3::new(1.0, 1.0, z),
            Vec3::new(-1.0, 1.0, z),
        ];
        Mesh::with_material("wall", positions, vec![[0, 1, 2], [0, 2, 3]], None, 0)
    }

    fn committed(meshes: &[Mesh]) -> CommittedScene {
        let mut builder = IntersectionApi::create(Some(DeviceKind::Cpu)).unwrap();
        for mesh in meshes {
            builder.attach(mesh).unwrap();
        }
        builder.commit().unwrap()
    }

    #[test]
    fn test_cpu_device_always_listed() {
        let devices = enumerate_devices();
        assert!(devices.iter().any(|d| d.kind == DeviceKind::Cpu));
        assert!(devices.iter().all(|d| d.threads > 0));
    }

    #[test]
    fn test_default_device_is_first_enumerated() {
        let builder = IntersectionApi::create(None).unwrap();
        assert_eq!(builder.device().kind, enumerate_devices()[0].kind);
    }

    #[cfg(not(feature = "embree"))]
    #[test]
    fn test_missing_device_is_unavailable() {
        let result = IntersectionApi::create(Some(DeviceKind::Embree));
        assert!(matches!(result, Err(TraceError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_device_kind_parsing() {
        assert_eq!("cpu".parse::<DeviceKind>().unwrap(), DeviceKind::Cpu);
        assert_eq!("Embree".parse::<DeviceKind>().unwrap(), DeviceKind::Embree);
        assert!("gpu".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_shape_ids_follow_attach_order() {
        let mut builder = IntersectionApi::create(Some(DeviceKind::Cpu)).unwrap();
        assert_eq!(builder.attach(&wall(-1.0)).unwrap(), ShapeId(0));
        assert_eq!(builder.attach(&wall(-2.0)).unwrap(), ShapeId(1));
        assert_eq!(builder.shape_count(), 2);
    }

    #[test]
    fn test_attach_rejects_bad_indices() {
        let mut mesh = wall(-1.0);
        mesh.faces[1] = [0, 2, 9];

        let mut builder = IntersectionApi::create(Some(DeviceKind::Cpu)).unwrap();
        let err = builder.attach(&mesh).unwrap_err();
        assert!(matches!(
            err,
            TraceError::Geometry(GeometryError::VertexIndexOutOfRange { face: 1, index: 9, .. })
        ));
    }

    #[test]
    fn test_query_returns_buffers_in_order() {
        let scene = committed(&[wall(-1.0), wall(-3.0)]);
        let rays = Buffer::from_vec(
            "rays",
            vec![
                Ray::new(Vec3::ZERO, -Vec3::Z),
                Ray::new(Vec3::new(5.0, 0.0, 0.0), -Vec3::Z),
                Ray::new(Vec3::new(0.2, 0.1, -2.0), -Vec3::Z),
            ],
        );

        let done = scene.query_intersection(rays).wait().unwrap();
        assert_eq!(done.rays.len(), 3);

        let hits = done.results.map();
        assert_eq!(hits[0].hit().unwrap().shape, ShapeId(0));
        assert_eq!(hits[1], HitRecord::Miss);
        assert_eq!(hits[2].hit().unwrap().shape, ShapeId(1));
    }

    #[test]
    fn test_occlusion_query() {
        let scene = committed(&[wall(-1.0)]);
        let rays = Buffer::from_vec(
            "shadow rays",
            vec![
                Ray::new(Vec3::ZERO, -Vec3::Z).with_max_t(5.0),
                Ray::new(Vec3::ZERO, -Vec3::Z).with_max_t(0.5),
                Ray::inactive(),
            ],
        );

        let done = scene.query_occlusion(rays).wait().unwrap();
        assert_eq!(
            &*done.results.map(),
            &[Occlusion::Occluded, Occlusion::Clear, Occlusion::Inactive]
        );
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let scene = committed(&[wall(-1.0)]);
        let err = scene
            .query_intersection(Buffer::from_vec("rays", Vec::new()))
            .wait()
            .unwrap_err();

        assert!(matches!(
            err,
            TraceError::QueryFailure { query: QueryKind::Intersection, .. }
        ));
    }

    #[test]
    fn test_empty_scene_always_misses() {
        let scene = committed(&[]);
        assert_eq!(scene.shape_count(), 0);

        let rays = Buffer::from_vec("rays", vec![Ray::new(Vec3::ZERO, -Vec3::Z); 4]);
        let done = scene.query_intersection(rays).wait().unwrap();
        assert!(done.results.map().iter().all(|h| *h == HitRecord::Miss));
    }
}
