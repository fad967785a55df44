//! Shadow ray generation toward the point light.

use rayon::prelude::*;
use umbra_math::{Ray, Vec3};

use crate::buffer::Buffer;
use crate::context::{PointLight, RenderContext};
use crate::hit::HitRecord;

/// Ray from surface point `p` toward `light`.
///
/// The origin is pushed `bias` along the ray to avoid self-intersection and
/// the extent ends at the light, so geometry behind it never occludes.
pub fn shadow_ray(p: Vec3, light: &PointLight, bias: f32) -> Ray {
    let to_light = light.position - p;
    let dir = to_light.normalize_or_zero();

    Ray::new(p + dir * bias, dir).with_max_t(to_light.length())
}

/// One shadow ray per hit record, in the same order. Misses get an inactive
/// ray so slot `k` still lines up with pixel `k`.
pub fn generate_shadow_rays(ctx: &RenderContext, hits: &Buffer<HitRecord>) -> Buffer<Ray> {
    let rays: Vec<Ray> = hits
        .map()
        .par_iter()
        .map(|record| match record {
            HitRecord::Hit(hit) => shadow_ray(ctx.position(hit), &ctx.light, ctx.shadow_bias),
            HitRecord::Miss => Ray::inactive(),
        })
        .collect();

    Buffer::from_vec("shadow rays", rays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::hit::Hit;
    use umbra_core::{Barycentric, GeometryStore, Material, Mesh, PrimitiveId, ShapeId};

    fn floor_context() -> RenderContext {
        let floor = Mesh::with_material(
            "floor",
            vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2]],
            None,
            0,
        );
        let store = GeometryStore::new(vec![floor], vec![Material::default()]).unwrap();
        let config = RenderConfig {
            light_position: Vec3::new(0.0, 4.0, 0.0),
            ..RenderConfig::default()
        };
        RenderContext::new(store, &config)
    }

    #[test]
    fn test_shadow_ray_points_at_light() {
        let light = PointLight {
            position: Vec3::new(0.0, 3.0, 4.0),
        };
        let ray = shadow_ray(Vec3::ZERO, &light, 1e-4);

        assert!(ray.is_active());
        assert!(ray.direction.abs_diff_eq(Vec3::new(0.0, 0.6, 0.8), 1e-6));
        assert!((ray.t_max - 5.0).abs() < 1e-6);
        assert_eq!(ray.t_min, 0.0);
        assert!(ray.origin.abs_diff_eq(Vec3::new(0.0, 0.6e-4, 0.8e-4), 1e-9));
    }

    #[test]
    fn test_t_max_is_distance_to_light() {
        let ctx = floor_context();
        let hit = Hit {
            shape: ShapeId(0),
            primitive: PrimitiveId(0),
            barycentric: Barycentric::new(0.25, 0.25),
            t: 1.0,
        };
        let hits = Buffer::from_vec("hits", vec![HitRecord::Hit(hit)]);

        let rays = generate_shadow_rays(&ctx, &hits);
        let ray = rays.map()[0];
        let p = ctx.position(&hit);

        assert!((ray.t_max - (ctx.light.position - p).length()).abs() < 1e-6);
    }

    #[test]
    fn test_misses_become_inactive() {
        let ctx = floor_context();
        let hit = Hit {
            shape: ShapeId(0),
            primitive: PrimitiveId(0),
            barycentric: Barycentric::new(0.0, 0.0),
            t: 1.0,
        };
        let hits = Buffer::from_vec(
            "hits",
            vec![HitRecord::Miss, HitRecord::Hit(hit), HitRecord::Miss],
        );

        let rays = generate_shadow_rays(&ctx, &hits);
        let active: Vec<bool> = rays.map().iter().map(Ray::is_active).collect();
        assert_eq!(active, vec![false, true, false]);
    }
}
