//! Primary visibility: nearest hit for every primary ray.

use umbra_math::Ray;

use crate::buffer::Buffer;
use crate::error::{QueryKind, TraceError, TraceResult};
use crate::hit::HitRecord;
use crate::intersector::CommittedScene;

/// Submit `rays` as a nearest-hit query and block until it completes.
///
/// The returned buffer has one record per ray, in ray order.
pub fn resolve_visibility(scene: &CommittedScene, rays: Buffer<Ray>) -> TraceResult<Buffer<HitRecord>> {
    let expected = rays.len();
    let done = scene.query_intersection(rays).wait()?;

    if done.results.len() != expected {
        return Err(TraceError::query(
            QueryKind::Intersection,
            format!("{} records for {} rays", done.results.len(), expected),
        ));
    }

    Ok(done.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{generate_primary_rays, PinholeCamera};
    use crate::intersector::{DeviceKind, IntersectionApi};
    use umbra_core::{Mesh, ShapeId};
    use umbra_math::Vec3;

    fn backdrop() -> CommittedScene {
        // Facing +Z, covering the whole view of a camera at (0, 1, 3)
        let mesh = Mesh::with_material(
            "backdrop",
            vec![
                Vec3::new(-10.0, -10.0, 0.0),
                Vec3::new(10.0, -10.0, 0.0),
                Vec3::new(10.0, 10.0, 0.0),
                Vec3::new(-10.0, 10.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            None,
            0,
        );
        let mut builder = IntersectionApi::create(Some(DeviceKind::Cpu)).unwrap();
        builder.attach(&mesh).unwrap();
        builder.commit().unwrap()
    }

    #[test]
    fn test_every_ray_gets_a_record() {
        let scene = backdrop();
        let rays = generate_primary_rays(&PinholeCamera::default(), 8, 6);

        let hits = resolve_visibility(&scene, rays).unwrap();
        assert_eq!(hits.len(), 48);
        assert!(hits.map().iter().all(|h| h.hit().map(|h| h.shape) == Some(ShapeId(0))));
    }

    #[test]
    fn test_hit_t_matches_plane_distance() {
        let scene = backdrop();
        let camera = PinholeCamera::default();
        let rays = generate_primary_rays(&camera, 4, 4);
        let directions: Vec<Vec3> = rays.map().iter().map(|r| r.direction).collect();

        let hits = resolve_visibility(&scene, rays).unwrap();
        for (hit, dir) in hits.map().iter().zip(directions) {
            let hit = hit.hit().unwrap();
            // z = 3 + t * dir.z hits the z = 0 plane
            assert!((hit.t - (-3.0 / dir.z)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_batch_fails() {
        let err = resolve_visibility(&backdrop(), Buffer::from_vec("rays", Vec::new())).unwrap_err();
        assert!(matches!(err, TraceError::QueryFailure { .. }));
    }
}
