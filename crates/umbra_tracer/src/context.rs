//! Per-frame render inputs shared by every stage.

use umbra_core::{Barycentric, GeometryStore, Material, PrimitiveId, ShapeId};
use umbra_math::Vec3;

use crate::camera::PinholeCamera;
use crate::config::RenderConfig;
use crate::hit::Hit;

/// A point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
}

/// Everything a frame needs, passed by reference into each stage.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub store: GeometryStore,
    pub camera: PinholeCamera,
    pub light: PointLight,
    pub width: u32,
    pub height: u32,
    pub shadow_bias: f32,
    pub background: [u8; 4],
}

impl RenderContext {
    pub fn new(store: GeometryStore, config: &RenderConfig) -> Self {
        Self {
            store,
            camera: PinholeCamera::new(config.camera_origin),
            light: PointLight {
                position: config.light_position,
            },
            width: config.width,
            height: config.height,
            shadow_bias: config.shadow_bias,
            background: config.background,
        }
    }

    /// Surface position at a hit.
    pub fn position(&self, hit: &Hit) -> Vec3 {
        self.position_at(hit.shape, hit.primitive, hit.barycentric)
    }

    pub fn position_at(&self, shape: ShapeId, primitive: PrimitiveId, bary: Barycentric) -> Vec3 {
        self.store.mesh(shape).position_at(primitive, bary)
    }

    /// Unit shading normal at a hit.
    pub fn normal(&self, hit: &Hit) -> Vec3 {
        self.store.mesh(hit.shape).normal_at(hit.primitive, hit.barycentric)
    }

    pub fn material(&self, hit: &Hit) -> &Material {
        self.store.material_for(hit.shape, hit.primitive)
    }
}
