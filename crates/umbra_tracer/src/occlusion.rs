//! Shadow visibility: any-hit test for every shadow ray.

use umbra_math::Ray;

use crate::buffer::Buffer;
use crate::error::{QueryKind, TraceError, TraceResult};
use crate::hit::Occlusion;
use crate::intersector::CommittedScene;

/// Submit `rays` as an occlusion query and block until it completes.
///
/// Inactive rays come back as [`Occlusion::Inactive`].
pub fn resolve_occlusion(scene: &CommittedScene, rays: Buffer<Ray>) -> TraceResult<Buffer<Occlusion>> {
    let expected = rays.len();
    let done = scene.query_occlusion(rays).wait()?;

    if done.results.len() != expected {
        return Err(TraceError::query(
            QueryKind::Occlusion,
            format!("{} flags for {} rays", done.results.len(), expected),
        ));
    }

    Ok(done.results)
}
