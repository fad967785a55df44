//! Flat diffuse materials.

use umbra_math::Vec3;

/// A material with a single diffuse reflectance.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name (from the MTL file, or a built-in name)
    pub name: String,

    /// Diffuse reflectance (RGB, each channel in [0, 1])
    pub diffuse: Vec3,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            diffuse: Vec3::splat(0.5), // Grey default
        }
    }
}

impl Material {
    /// Create a material. The reflectance is clamped to [0, 1] per channel.
    pub fn new(name: impl Into<String>, diffuse: Vec3) -> Self {
        Self {
            name: name.into(),
            diffuse: diffuse.clamp(Vec3::ZERO, Vec3::ONE),
        }
    }
}
