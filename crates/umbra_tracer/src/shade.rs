//! Lambert shading and final compositing.

use rayon::prelude::*;
use umbra_math::Vec3;

use crate::buffer::Buffer;
use crate::context::RenderContext;
use crate::frame::FrameBuffer;
use crate::hit::{HitRecord, Occlusion};

const BLACK: [u8; 4] = [0, 0, 0, 255];

/// How a pixel ended up with its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelKind {
    Background,
    Shadowed,
    /// Surface faces away from the light
    FacingAway,
    Lit,
}

/// Per-frame shading counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub hits: usize,
    pub lit: usize,
    pub shadowed: usize,
    pub facing_away: usize,
}

impl FrameStats {
    fn record(mut self, kind: PixelKind) -> Self {
        match kind {
            PixelKind::Background => {}
            PixelKind::Shadowed => self.shadowed += 1,
            PixelKind::FacingAway => self.facing_away += 1,
            PixelKind::Lit => self.lit += 1,
        }
        if kind != PixelKind::Background {
            self.hits += 1;
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            hits: self.hits + other.hits,
            lit: self.lit + other.lit,
            shadowed: self.shadowed + other.shadowed,
            facing_away: self.facing_away + other.facing_away,
        }
    }
}

/// Convert a linear color to RGBA8: clamp to [0, 1], scale by 255, truncate.
#[inline]
pub fn to_rgba8(color: Vec3) -> [u8; 4] {
    let c = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

/// Color of one pixel from its hit record and shadow result.
pub fn shade_pixel(ctx: &RenderContext, record: &HitRecord, occlusion: Occlusion) -> (PixelKind, [u8; 4]) {
    let hit = match record {
        HitRecord::Miss => return (PixelKind::Background, ctx.background),
        HitRecord::Hit(hit) => hit,
    };

    debug_assert!(
        occlusion != Occlusion::Inactive,
        "hit on shape {} has no shadow result",
        hit.shape
    );

    if occlusion.is_occluded() {
        return (PixelKind::Shadowed, BLACK);
    }

    let p = ctx.position(hit);
    let n = ctx.normal(hit);
    let l = (ctx.light.position - p).normalize_or_zero();
    let ndotl = n.dot(l);

    if ndotl > 0.0 {
        let diffuse = ctx.material(hit).diffuse;
        (PixelKind::Lit, to_rgba8(diffuse * ndotl))
    } else {
        (PixelKind::FacingAway, BLACK)
    }
}

/// Shade every pixel into a new frame.
pub fn composite(
    ctx: &RenderContext,
    hits: &Buffer<HitRecord>,
    occlusion: &Buffer<Occlusion>,
) -> (FrameBuffer, FrameStats) {
    let hits = hits.map();
    let occlusion = occlusion.map();
    debug_assert_eq!(hits.len(), occlusion.len());

    let mut frame = FrameBuffer::new(ctx.width, ctx.height, ctx.background);

    let stats = frame
        .pixels
        .par_iter_mut()
        .zip(hits.par_iter().zip(occlusion.par_iter()))
        .map(|(pixel, (record, flag))| {
            let (kind, color) = shade_pixel(ctx, record, *flag);
            *pixel = color;
            FrameStats::default().record(kind)
        })
        .reduce(FrameStats::default, FrameStats::merge);

    (frame, stats)
}
