//! Per-ray query results.

use umbra_core::{Barycentric, PrimitiveId, ShapeId};

/// Where a ray struck the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub shape: ShapeId,
    pub primitive: PrimitiveId,
    pub barycentric: Barycentric,
    /// Ray parameter of the hit
    pub t: f32,
}

/// Result of a nearest-hit query for one ray.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HitRecord {
    Hit(Hit),
    #[default]
    Miss,
}

impl HitRecord {
    #[inline]
    pub fn hit(&self) -> Option<&Hit> {
        match self {
            HitRecord::Hit(hit) => Some(hit),
            HitRecord::Miss => None,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, HitRecord::Hit(_))
    }
}

/// Result of an any-hit (occlusion) query for one ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occlusion {
    /// The ray was inactive and was not traced.
    #[default]
    Inactive,
    /// Nothing lies between the ray origin and `t_max`.
    Clear,
    /// Some geometry lies strictly inside the ray extent.
    Occluded,
}

impl Occlusion {
    #[inline]
    pub fn is_occluded(self) -> bool {
        self == Occlusion::Occluded
    }

    pub(crate) fn from_blocked(blocked: bool) -> Self {
        if blocked {
            Occlusion::Occluded
        } else {
            Occlusion::Clear
        }
    }
}
