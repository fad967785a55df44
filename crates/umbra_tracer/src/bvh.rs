//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! The CPU intersector backend: a binary tree over every triangle of every
//! committed shape, answering nearest-hit and any-hit queries. Batches are
//! processed in parallel with rayon.

use rayon::prelude::*;
use umbra_core::{PrimitiveId, ShapeId};
use umbra_math::{Aabb, Interval, Ray, Vec3};

use crate::error::TraceResult;
use crate::hit::{Hit, HitRecord, Occlusion};
use crate::intersector::{DeviceKind, Intersector, ShapeGeometry};
use crate::triangle::Triangle;

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with triangles.
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with indices into the scene's triangle list.
    Leaf { triangles: Vec<u32>, bbox: Aabb },
    /// Empty scene.
    Empty,
}

impl BvhNode {
    /// Build a BVH over `triangles`.
    pub fn new(triangles: &[Triangle]) -> Self {
        if triangles.is_empty() {
            return BvhNode::Empty;
        }
        let indices = (0..triangles.len() as u32).collect();
        Self::build(triangles, indices)
    }

    /// Recursive construction.
    ///
    /// Median split: sort by centroid on the longest centroid axis,
    /// split in half, recurse.
    fn build(triangles: &[Triangle], mut indices: Vec<u32>) -> Self {
        let bounds = indices.iter().fold(Aabb::EMPTY, |acc, &i| {
            Aabb::surrounding(&acc, &triangles[i as usize].bounds())
        });

        if indices.len() <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                triangles: indices,
                bbox: bounds,
            };
        }

        let mut centroid_bounds = Aabb::EMPTY;
        for &i in &indices {
            centroid_bounds.grow(triangles[i as usize].centroid());
        }
        let axis = centroid_bounds.longest_axis();

        indices.sort_unstable_by(|&a, &b| {
            let a = triangles[a as usize].centroid()[axis];
            let b = triangles[b as usize].centroid()[axis];
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_indices = indices.split_off(indices.len() / 2);

        BvhNode::Branch {
            left: Box::new(Self::build(triangles, indices)),
            right: Box::new(Self::build(triangles, right_indices)),
            bbox: bounds,
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    /// Nearest hit below this node. `closest` holds the best `t` so far and
    /// shrinks as closer triangles are found.
    fn closest_hit(
        &self,
        triangles: &[Triangle],
        ray: &Ray,
        inv_dir: Vec3,
        closest: &mut f32,
        best: &mut Option<Hit>,
    ) {
        let range = Interval::new(ray.t_min, *closest);

        match self {
            BvhNode::Empty => {}

            BvhNode::Leaf { triangles: leaf, bbox } => {
                if !bbox.hit(ray, inv_dir, range) {
                    return;
                }
                for &i in leaf {
                    let tri = &triangles[i as usize];
                    if let Some(h) = tri.intersect(ray, Interval::new(ray.t_min, *closest)) {
                        *closest = h.t;
                        *best = Some(Hit {
                            shape: ShapeId(tri.shape),
                            primitive: PrimitiveId(tri.primitive),
                            barycentric: h.barycentric,
                            t: h.t,
                        });
                    }
                }
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, inv_dir, range) {
                    return;
                }
                left.closest_hit(triangles, ray, inv_dir, closest, best);
                // Right child only checked up to the closest hit so far
                right.closest_hit(triangles, ray, inv_dir, closest, best);
            }
        }
    }

    /// Whether any triangle lies strictly inside the ray extent.
    fn any_hit(&self, triangles: &[Triangle], ray: &Ray, inv_dir: Vec3) -> bool {
        let range = ray.extent();

        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { triangles: leaf, bbox } => {
                bbox.hit(ray, inv_dir, range)
                    && leaf
                        .iter()
                        .any(|&i| triangles[i as usize].intersect(ray, range).is_some())
            }
            BvhNode::Branch { left, right, bbox } => {
                bbox.hit(ray, inv_dir, range)
                    && (left.any_hit(triangles, ray, inv_dir) || right.any_hit(triangles, ray, inv_dir))
            }
        }
    }
}

/// The CPU intersector: all committed triangles plus their BVH.
pub struct BvhScene {
    triangles: Vec<Triangle>,
    root: BvhNode,
}

impl BvhScene {
    /// Flatten every shape into one triangle list and build the tree.
    /// `shapes[i]` becomes shape id `i`.
    pub fn build(shapes: &[ShapeGeometry]) -> Self {
        let mut triangles = Vec::with_capacity(shapes.iter().map(|s| s.faces.len()).sum());

        for (shape, geometry) in shapes.iter().enumerate() {
            for (primitive, face) in geometry.faces.iter().enumerate() {
                let [a, b, c] = face.map(|i| geometry.positions[i as usize]);
                triangles.push(Triangle {
                    v0: a,
                    v1: b,
                    v2: c,
                    shape: shape as u32,
                    primitive: primitive as u32,
                });
            }
        }

        let start = std::time::Instant::now();
        let root = BvhNode::new(&triangles);
        log::info!(
            "BVH built over {} shapes, {} triangles in {:?}",
            shapes.len(),
            triangles.len(),
            start.elapsed()
        );

        Self { triangles, root }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounds(&self) -> Aabb {
        self.root.bounding_box()
    }

    /// Nearest hit for one ray. Inactive rays always miss.
    pub fn closest_hit(&self, ray: &Ray) -> HitRecord {
        if !ray.is_active() {
            return HitRecord::Miss;
        }

        let inv_dir = Vec3::ONE / ray.direction;
        let mut closest = ray.t_max;
        let mut best = None;
        self.root
            .closest_hit(&self.triangles, ray, inv_dir, &mut closest, &mut best);

        best.map_or(HitRecord::Miss, HitRecord::Hit)
    }

    /// Any-hit test for one ray. Inactive rays are not traced.
    pub fn occlusion(&self, ray: &Ray) -> Occlusion {
        if !ray.is_active() {
            return Occlusion::Inactive;
        }

        let inv_dir = Vec3::ONE / ray.direction;
        Occlusion::from_blocked(self.root.any_hit(&self.triangles, ray, inv_dir))
    }
}

impl Intersector for BvhScene {
    fn device(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn intersect(&self, rays: &[Ray], hits: &mut [HitRecord]) -> TraceResult<()> {
        hits.par_iter_mut()
            .zip(rays.par_iter())
            .for_each(|(hit, ray)| *hit = self.closest_hit(ray));
        Ok(())
    }

    fn occluded(&self, rays: &[Ray], occlusion: &mut [Occlusion]) -> TraceResult<()> {
        occlusion
            .par_iter_mut()
            .zip(rays.par_iter())
            .for_each(|(flag, ray)| *flag = self.occlusion(ray));
        Ok(())
    }
}
