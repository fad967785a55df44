//! Render configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use umbra_math::Vec3;

use crate::intersector::DeviceKind;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Render configuration.
///
/// Every field is optional in JSON; missing ones take the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    pub camera_origin: Vec3,
    pub light_position: Vec3,
    /// Offset of shadow ray origins along the ray, against self-intersection
    pub shadow_bias: f32,
    /// RGBA color of pixels that hit nothing
    pub background: [u8; 4],
    /// Intersection backend; `None` picks the best available
    pub device: Option<DeviceKind>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            camera_origin: Vec3::new(0.0, 1.0, 3.0),
            light_position: Vec3::new(-0.01, 1.85, 0.1),
            shadow_bias: 1e-4,
            background: [0, 0, 0, 0],
            device: None,
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded render config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        // A bias at or below f32 precision lets shadow rays re-hit their own surface
        if !self.shadow_bias.is_finite() || self.shadow_bias <= f32::EPSILON {
            return Err(ConfigError::Invalid(format!(
                "shadow_bias must be greater than {:e}, got {}",
                f32::EPSILON,
                self.shadow_bias
            )));
        }
        if !self.camera_origin.is_finite() || !self.light_position.is_finite() {
            return Err(ConfigError::Invalid(
                "camera and light positions must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.camera_origin, Vec3::new(0.0, 1.0, 3.0));
        assert_eq!(config.shadow_bias, 1e-4);
        assert_eq!(config.background, [0, 0, 0, 0]);
        assert_eq!(config.device, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(RenderConfig::from_json_str("{}").unwrap(), RenderConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = RenderConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(RenderConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_partial_json() {
        let config = RenderConfig::from_json_str(
            r#"{ "width": 32, "light_position": [0.0, 5.0, 0.0], "device": "cpu" }"#,
        )
        .unwrap();

        assert_eq!(config.width, 32);
        assert_eq!(config.height, 480);
        assert_eq!(config.light_position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(config.device, Some(DeviceKind::Cpu));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "height": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "shadow_bias": -1.0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "shadow_bias": 0.0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "shadow_bias": 1e-9 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "width": "wide" }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = RenderConfig::from_json_file("/nonexistent/umbra.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
