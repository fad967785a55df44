//! Umbra Tracer - ray-traced visibility and shadows.
//!
//! Renders one frame of a triangle scene lit by a point light: primary rays
//! find the nearest surface per pixel, shadow rays test whether that surface
//! sees the light, and a Lambert term colors the result.
//!
//! Queries go through an [`Intersector`] backend: a CPU BVH that is always
//! available, or Intel Embree 4 with the `embree` feature.
//!
//! # Example
//!
//! ```ignore
//! use umbra_core::cornell_box;
//! use umbra_tracer::{FrameSink, PngSink, RenderConfig, RenderContext, Renderer};
//!
//! let config = RenderConfig::default();
//! let renderer = Renderer::new(RenderContext::new(cornell_box(), &config), config.device)?;
//! let frame = renderer.render_frame()?;
//! PngSink::new("cornell.png").present(&frame.image)?;
//! ```

mod buffer;
mod bvh;
mod camera;
mod config;
mod context;
#[cfg(feature = "embree")]
mod embree;
mod error;
mod frame;
mod hit;
mod intersector;
mod occlusion;
mod renderer;
mod shade;
mod shadow;
mod triangle;
mod visibility;

pub use buffer::{Buffer, BufferView, BufferViewMut};
pub use bvh::{BvhNode, BvhScene};
pub use camera::{generate_primary_rays, PinholeCamera};
pub use config::{ConfigError, RenderConfig};
pub use context::{PointLight, RenderContext};
pub use error::{QueryKind, TraceError, TraceResult};
pub use frame::{FrameBuffer, FrameSink, PngSink, SinkError};
pub use hit::{Hit, HitRecord, Occlusion};
pub use intersector::{
    enumerate_devices, Completed, CommittedScene, DeviceInfo, DeviceKind, IntersectionApi,
    Intersector, PendingQuery, SceneBuilder, ShapeGeometry,
};
pub use occlusion::resolve_occlusion;
pub use renderer::{Frame, Renderer};
pub use shade::{composite, shade_pixel, to_rgba8, FrameStats, PixelKind};
pub use shadow::{generate_shadow_rays, shadow_ray};
pub use triangle::{Triangle, TriangleHit};
pub use visibility::resolve_visibility;

/// Re-export math types from umbra_math
pub use umbra_math::{Aabb, Interval, Ray, Vec3};
