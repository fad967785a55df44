//! Intel Embree 4 intersector backend.
//!
//! Manual FFI bindings to the Embree 4 C API, avoiding a bindgen dependency.
//! Only the calls needed for single-level triangle scenes with nearest-hit
//! and occlusion queries are declared. Each attached shape becomes one
//! triangle geometry whose Embree geometry id equals its shape id.

use rayon::prelude::*;
use umbra_core::{Barycentric, PrimitiveId, ShapeId};
use umbra_math::Ray;

use crate::error::{TraceError, TraceResult};
use crate::hit::{Hit, HitRecord, Occlusion};
use crate::intersector::{DeviceKind, Intersector, ShapeGeometry};

// ============================================================================
// Embree FFI Bindings
// ============================================================================

#[allow(non_camel_case_types)]
type RTCDevice = *mut std::ffi::c_void;

#[allow(non_camel_case_types)]
type RTCScene = *mut std::ffi::c_void;

#[allow(non_camel_case_types)]
type RTCGeometry = *mut std::ffi::c_void;

// RTC_GEOMETRY_TYPE_TRIANGLE
const RTC_GEOMETRY_TYPE_TRIANGLE: u32 = 0;

// rtcore_buffer.h
const RTC_BUFFER_TYPE_INDEX: u32 = 0;
const RTC_BUFFER_TYPE_VERTEX: u32 = 1;

// rtcore_common.h
const RTC_FORMAT_UINT3: u32 = 0x5003;
const RTC_FORMAT_FLOAT3: u32 = 0x9003;

const RTC_INVALID_GEOMETRY_ID: u32 = 0xFFFF_FFFF;

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRay {
    org_x: f32,
    org_y: f32,
    org_z: f32,
    tnear: f32,

    dir_x: f32,
    dir_y: f32,
    dir_z: f32,
    time: f32,

    tfar: f32,
    mask: u32,
    id: u32,
    flags: u32,
}

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCHit {
    ng_x: f32,
    ng_y: f32,
    ng_z: f32,

    u: f32,
    v: f32,

    prim_id: u32,
    geom_id: u32,
    inst_id: [u32; 1],
}

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRayHit {
    ray: RTCRay,
    hit: RTCHit,
}

#[link(name = "embree4")]
extern "C" {
    fn rtcNewDevice(config: *const std::ffi::c_char) -> RTCDevice;
    fn rtcReleaseDevice(device: RTCDevice);
    fn rtcGetDeviceError(device: RTCDevice) -> i32;

    fn rtcNewScene(device: RTCDevice) -> RTCScene;
    fn rtcReleaseScene(scene: RTCScene);
    fn rtcCommitScene(scene: RTCScene);

    fn rtcNewGeometry(device: RTCDevice, geom_type: u32) -> RTCGeometry;
    fn rtcReleaseGeometry(geom: RTCGeometry);
    fn rtcCommitGeometry(geom: RTCGeometry);
    fn rtcAttachGeometry(scene: RTCScene, geom: RTCGeometry) -> u32;

    fn rtcSetSharedGeometryBuffer(
        geom: RTCGeometry,
        buffer_type: u32,
        slot: u32,
        format: u32,
        ptr: *const std::ffi::c_void,
        byte_offset: usize,
        byte_stride: usize,
        item_count: usize,
    );

    fn rtcIntersect1(
        scene: RTCScene,
        rayhit: *mut RTCRayHit,
        args: *const std::ffi::c_void, // RTCIntersectArguments*, can be NULL
    );

    fn rtcOccluded1(
        scene: RTCScene,
        ray: *mut RTCRay,
        args: *const std::ffi::c_void, // RTCOccludedArguments*, can be NULL
    );
}

fn error_name(code: i32) -> &'static str {
    match code {
        1 => "RTC_ERROR_UNKNOWN",
        2 => "RTC_ERROR_INVALID_ARGUMENT",
        3 => "RTC_ERROR_INVALID_OPERATION",
        4 => "RTC_ERROR_OUT_OF_MEMORY",
        5 => "RTC_ERROR_UNSUPPORTED_CPU",
        6 => "RTC_ERROR_CANCELLED",
        _ => "UNKNOWN_ERROR",
    }
}

/// Turn the device's pending error, if any, into a commit error.
unsafe fn check(device: RTCDevice, stage: &str) -> TraceResult<()> {
    match rtcGetDeviceError(device) {
        0 => Ok(()),
        code => Err(TraceError::Commit(format!(
            "Embree error after {stage}: {code} ({})",
            error_name(code)
        ))),
    }
}

impl RTCRay {
    fn from_ray(ray: &Ray) -> Self {
        Self {
            org_x: ray.origin.x,
            org_y: ray.origin.y,
            org_z: ray.origin.z,
            tnear: open_near(ray.t_min),

            dir_x: ray.direction.x,
            dir_y: ray.direction.y,
            dir_z: ray.direction.z,
            time: 0.0,

            tfar: open_far(ray.t_max),
            mask: 0xFFFF_FFFF,
            id: 0,
            flags: 0,
        }
    }
}

// Embree accepts hits on the closed range [tnear, tfar]; the CPU backend only
// accepts t strictly inside (t_min, t_max). Step each bound one ulp inward.
fn open_near(t: f32) -> f32 {
    if t == 0.0 {
        f32::from_bits(1)
    } else if t.is_finite() && t > 0.0 {
        f32::from_bits(t.to_bits() + 1)
    } else {
        t
    }
}

fn open_far(t: f32) -> f32 {
    if t.is_finite() && t > 0.0 {
        f32::from_bits(t.to_bits() - 1)
    } else {
        t
    }
}

impl RTCRayHit {
    fn from_ray(ray: &Ray) -> Self {
        Self {
            ray: RTCRay::from_ray(ray),
            hit: RTCHit {
                ng_x: 0.0,
                ng_y: 0.0,
                ng_z: 0.0,
                u: 0.0,
                v: 0.0,
                prim_id: RTC_INVALID_GEOMETRY_ID,
                geom_id: RTC_INVALID_GEOMETRY_ID,
                inst_id: [RTC_INVALID_GEOMETRY_ID],
            },
        }
    }
}

/// Check that an Embree device can be created on this machine.
pub fn probe() -> TraceResult<()> {
    unsafe {
        let device = rtcNewDevice(std::ptr::null());
        if device.is_null() {
            return Err(TraceError::DeviceUnavailable(
                "rtcNewDevice returned null".to_string(),
            ));
        }
        let err = rtcGetDeviceError(device);
        rtcReleaseDevice(device);

        if err != 0 {
            return Err(TraceError::DeviceUnavailable(format!(
                "Embree device error: {} ({})",
                err,
                error_name(err)
            )));
        }
    }
    Ok(())
}

/// Geometry buffers shared with Embree; must outlive the scene.
struct SharedBuffers {
    // One padding float so Embree may read 16 bytes at the last vertex.
    _vertices: Vec<f32>,
    _indices: Vec<u32>,
}

/// A committed Embree scene.
pub struct EmbreeScene {
    device: RTCDevice,
    scene: RTCScene,
    buffers: Vec<SharedBuffers>,
    triangle_count: usize,
}

impl EmbreeScene {
    /// Upload every shape and commit. Shape `i` gets geometry id `i`.
    pub fn new(shapes: Vec<ShapeGeometry>) -> TraceResult<Self> {
        unsafe {
            let device = rtcNewDevice(std::ptr::null());
            if device.is_null() {
                return Err(TraceError::DeviceUnavailable(
                    "Failed to create Embree device".to_string(),
                ));
            }
            if let Err(e) = check(device, "device creation") {
                rtcReleaseDevice(device);
                return Err(e);
            }

            let scene = rtcNewScene(device);
            if scene.is_null() {
                rtcReleaseDevice(device);
                return Err(TraceError::Commit("Failed to create Embree scene".to_string()));
            }

            // From here on Drop releases the scene and device on early return.
            let mut this = Self {
                device,
                scene,
                buffers: Vec::with_capacity(shapes.len()),
                triangle_count: 0,
            };

            for (shape_index, shape) in shapes.into_iter().enumerate() {
                let mut vertices = Vec::with_capacity(shape.positions.len() * 3 + 1);
                for p in &shape.positions {
                    vertices.extend_from_slice(&[p.x, p.y, p.z]);
                }
                vertices.push(0.0);

                let indices: Vec<u32> = shape.faces.iter().flatten().copied().collect();

                let geom = rtcNewGeometry(device, RTC_GEOMETRY_TYPE_TRIANGLE);
                if geom.is_null() {
                    return Err(TraceError::Commit(format!(
                        "Failed to create Embree geometry for shape {shape_index}"
                    )));
                }

                rtcSetSharedGeometryBuffer(
                    geom,
                    RTC_BUFFER_TYPE_VERTEX,
                    0,
                    RTC_FORMAT_FLOAT3,
                    vertices.as_ptr() as *const std::ffi::c_void,
                    0,
                    12, // 3 * f32
                    shape.positions.len(),
                );
                rtcSetSharedGeometryBuffer(
                    geom,
                    RTC_BUFFER_TYPE_INDEX,
                    0,
                    RTC_FORMAT_UINT3,
                    indices.as_ptr() as *const std::ffi::c_void,
                    0,
                    12, // 3 * u32
                    shape.faces.len(),
                );
                if let Err(e) = check(device, "setting geometry buffers") {
                    rtcReleaseGeometry(geom);
                    return Err(e);
                }

                rtcCommitGeometry(geom);
                let geom_id = rtcAttachGeometry(scene, geom);
                rtcReleaseGeometry(geom);
                check(device, "attaching geometry")?;

                if geom_id as usize != shape_index {
                    return Err(TraceError::Commit(format!(
                        "Embree assigned geometry id {geom_id} to shape {shape_index}"
                    )));
                }

                this.triangle_count += shape.faces.len();
                this.buffers.push(SharedBuffers {
                    _vertices: vertices,
                    _indices: indices,
                });
            }

            rtcCommitScene(scene);
            check(device, "scene commit")?;

            log::info!(
                "Embree scene committed: {} shapes, {} triangles",
                this.buffers.len(),
                this.triangle_count
            );

            Ok(this)
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    fn closest_hit(&self, ray: &Ray) -> HitRecord {
        if !ray.is_active() {
            return HitRecord::Miss;
        }

        let mut rayhit = RTCRayHit::from_ray(ray);
        unsafe {
            // Embree 4 API: scene, rayhit, args=NULL
            rtcIntersect1(self.scene, &mut rayhit, std::ptr::null());
        }

        if rayhit.hit.geom_id == RTC_INVALID_GEOMETRY_ID {
            return HitRecord::Miss;
        }

        HitRecord::Hit(Hit {
            shape: ShapeId(rayhit.hit.geom_id),
            primitive: PrimitiveId(rayhit.hit.prim_id),
            barycentric: Barycentric::new(rayhit.hit.u, rayhit.hit.v),
            t: rayhit.ray.tfar,
        })
    }

    fn occlusion(&self, ray: &Ray) -> Occlusion {
        if !ray.is_active() {
            return Occlusion::Inactive;
        }

        let mut rtc_ray = RTCRay::from_ray(ray);
        unsafe {
            rtcOccluded1(self.scene, &mut rtc_ray, std::ptr::null());
        }

        // Embree marks a blocked ray by setting tfar to -inf.
        Occlusion::from_blocked(rtc_ray.tfar == f32::NEG_INFINITY)
    }
}

impl Intersector for EmbreeScene {
    fn device(&self) -> DeviceKind {
        DeviceKind::Embree
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

impl Drop for EmbreeScene {
    fn drop(&mut self) {
        unsafe {
            rtcReleaseScene(self.scene);
            rtcReleaseDevice(self.device);
        }
    }
}

// SAFETY: a committed Embree scene is immutable and safe to query from many
// threads; the shared buffers are owned here and never mutated.
unsafe impl Send for EmbreeScene {}
unsafe impl Sync for EmbreeScene {}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_math::Vec3;

    fn quad(z: f32) -> ShapeGeometry {
        ShapeGeometry {
            positions: vec![
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, -1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(-1.0, 1.0, z),
            ],
            faces: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    #[test]
    fn test_embree_matches_shape_ids() {
        let scene = EmbreeScene::new(vec![quad(-1.0), quad(-3.0)]).unwrap();
        assert_eq!(scene.triangle_count(), 4);

        let hit = scene.closest_hit(&Ray::new(Vec3::new(0.5, -0.5, 0.0), -Vec3::Z));
        let hit = hit.hit().copied().unwrap();
        assert_eq!(hit.shape, ShapeId(0));
        assert_eq!(hit.primitive, PrimitiveId(0));
        assert!((hit.t - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_embree_occlusion() {
        let scene = EmbreeScene::new(vec![quad(-2.0)]).unwrap();
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);

        assert_eq!(scene.occlusion(&ray.with_max_t(3.0)), Occlusion::Occluded);
        assert_eq!(scene.occlusion(&ray.with_max_t(1.0)), Occlusion::Clear);
        assert_eq!(scene.occlusion(&Ray::inactive()), Occlusion::Inactive);
    }

    #[test]
    fn test_embree_blocker_at_ray_end_is_clear() {
        let scene = EmbreeScene::new(vec![quad(-2.0)]).unwrap();
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);

        // Same answer as the BVH backend for a surface sitting on the light
        assert_eq!(scene.occlusion(&ray.with_max_t(2.0)), Occlusion::Clear);
        assert!(scene.closest_hit(&ray.with_max_t(2.0)).hit().is_none());
    }

    #[test]
    fn test_open_bounds_step_inward() {
        assert!(open_near(0.0) > 0.0);
        assert!(open_near(1.0) > 1.0);
        assert!(open_far(2.0) < 2.0);
        assert_eq!(open_far(f32::INFINITY), f32::INFINITY);
        assert_eq!(open_far(0.0), 0.0);
    }
}
