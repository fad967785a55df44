use crate::{Interval, Vec3};

/// A ray in a query batch.
///
/// The parametric extent `[t_min, t_max]` bounds where hits are reported.
/// Inactive rays keep their slot in a batch but are skipped by every query
/// and never produce a hit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Not necessarily normalized.
    pub direction: Vec3,
    pub t_min: f32,
    pub t_max: f32,
    active: bool,
}

impl Ray {
    /// Create an active ray with an unbounded extent `[0, inf)`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            t_min: 0.0,
            t_max: f32::INFINITY,
            active: true,
        }
    }

    /// A placeholder ray that queries must skip.
    pub fn inactive() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            t_min: 0.0,
            t_max: 0.0,
            active: false,
        }
    }

    /// Bound the ray so that nothing beyond `t_max` is reported.
    pub fn with_max_t(mut self, t_max: f32) -> Self {
        self.t_max = t_max;
        self
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// The parametric range `[t_min, t_max]` of this ray.
    #[inline]
    pub fn extent(&self) -> Interval {
        Interval::new(self.t_min, self.t_max)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::inactive()
    }
}
