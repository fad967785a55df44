//! Single-frame renderer.
//!
//! Runs the pipeline in order:
//! - Primary rays from the camera through every pixel
//! - Nearest-hit query for every primary ray
//! - Shadow rays from every hit toward the light
//! - Occlusion query for every shadow ray
//! - Lambert shading into an RGBA frame

use std::time::Instant;

use crate::camera::generate_primary_rays;
use crate::context::RenderContext;
use crate::error::TraceResult;
use crate::frame::FrameBuffer;
use crate::intersector::{CommittedScene, DeviceKind, IntersectionApi};
use crate::occlusion::resolve_occlusion;
use crate::shade::{composite, FrameStats};
use crate::shadow::generate_shadow_rays;
use crate::visibility::resolve_visibility;

/// A rendered frame and its shading counters.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: FrameBuffer,
    pub stats: FrameStats,
}

/// Owns the render context and the committed scene built from it.
pub struct Renderer {
    context: RenderContext,
    scene: CommittedScene,
}

impl Renderer {
    /// Attach every mesh of the store in order and commit.
    pub fn new(context: RenderContext, device: Option<DeviceKind>) -> TraceResult<Self> {
        let start = Instant::now();
        let mut builder = IntersectionApi::create(device)?;

        for (shape, mesh) in context.store.shapes() {
            let attached = builder.attach(mesh)?;
            debug_assert_eq!(attached, shape);
        }
        let scene = builder.commit()?;

        log::info!(
            "Scene ready: {} shapes, {} triangles ({:?})",
            scene.shape_count(),
            context.store.triangle_count(),
            start.elapsed()
        );

        Ok(Self { context, scene })
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn scene(&self) -> &CommittedScene {
        &self.scene
    }

    /// Render one frame.
    pub fn render_frame(&self) -> TraceResult<Frame> {
        let ctx = &self.context;
        let frame_start = Instant::now();
        log::info!("Rendering {}x{} frame", ctx.width, ctx.height);

        let stage = Instant::now();
        let primary = generate_primary_rays(&ctx.camera, ctx.width, ctx.height);
        log::debug!("Generated {} primary rays in {:?}", primary.len(), stage.elapsed());

        let stage = Instant::now();
        let hits = resolve_visibility(&self.scene, primary)?;
        log::debug!("Visibility resolved in {:?}", stage.elapsed());

        let stage = Instant::now();
        let shadow_rays = generate_shadow_rays(ctx, &hits);
        log::debug!("Generated shadow rays in {:?}", stage.elapsed());

        let stage = Instant::now();
        let occlusion = resolve_occlusion(&self.scene, shadow_rays)?;
        log::debug!("Occlusion resolved in {:?}", stage.elapsed());

        let stage = Instant::now();
        let (image, stats) = composite(ctx, &hits, &occlusion);
        log::debug!("Composited in {:?}", stage.elapsed());

        log::info!(
            "Frame done in {:?}: {} hits, {} lit, {} shadowed, {} facing away",
            frame_start.elapsed(),
            stats.hits,
            stats.lit,
            stats.shadowed,
            stats.facing_away
        );

        Ok(Frame { image, stats })
    }
}
