//! Pinhole camera and primary ray generation.

use rayon::prelude::*;
use umbra_math::{Ray, Vec3};

use crate::buffer::Buffer;

/// A pinhole camera looking down a fixed view plane.
///
/// The view plane sits at `z = 1` and spans `x` in `[-1, 1)` and `y` in
/// `[0, 2)`; only the origin moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    pub origin: Vec3,
}

impl PinholeCamera {
    pub fn new(origin: Vec3) -> Self {
        Self { origin }
    }

    /// Point on the view plane for pixel (`row`, `col`) of a `width` x `height`
    /// image. Row 0 is the bottom scanline.
    #[inline]
    pub fn plane_point(row: u32, col: u32, width: u32, height: u32) -> Vec3 {
        Vec3::new(
            -1.0 + col as f32 * (2.0 / width as f32),
            row as f32 * (2.0 / height as f32),
            1.0,
        )
    }

    /// Primary ray through pixel (`row`, `col`). The direction is left
    /// unnormalized, so `t = 1` lands on the view plane.
    #[inline]
    pub fn primary_ray(&self, row: u32, col: u32, width: u32, height: u32) -> Ray {
        let target = Self::plane_point(row, col, width, height);
        Ray::new(self.origin, target - self.origin)
    }
}

impl Default for PinholeCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 1.0, 3.0))
    }
}

/// One primary ray per pixel; ray `i * width + j` belongs to row `i`, column `j`.
pub fn generate_primary_rays(camera: &PinholeCamera, width: u32, height: u32) -> Buffer<Ray> {
    let w = width as usize;
    let rays: Vec<Ray> = (0..w * height as usize)
        .into_par_iter()
        .map(|k| {
            let row = (k / w) as u32;
            let col = (k % w) as u32;
            camera.primary_ray(row, col, width, height)
        })
        .collect();

    Buffer::from_vec("primary rays", rays)
}
