//! Pipeline configuration
//!
//! One immutable value built at startup (defaults, then an optional JSON
//! file, then caller overrides) and passed by reference to every stage.

use crate::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Objectness threshold; rows at or below it are dropped.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.45;
/// IoU above which a lower-scored same-class box is suppressed.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Compute backend handed to the inference session. The detection
/// stages never look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda { device_id: i32 },
}

/// Configuration for a detection pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Path to the ONNX model
    pub model_path: PathBuf,
    /// Minimum objectness (exclusive)
    pub confidence_threshold: f32,
    /// NMS overlap threshold (exclusive)
    pub iou_threshold: f32,
    /// Backend for the inference session
    pub execution_provider: ExecutionProvider,
    /// Intra-op thread count; `None` leaves the runtime default
    pub intra_threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/yolov5s.onnx"),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: None,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Thresholds must lie in `[0, 1]`, thread count must be positive.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("iou_threshold", self.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.intra_threads == Some(0) {
            return Err(ModelError::InvalidConfig("intra_threads must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.confidence_threshold, 0.45);
        assert_eq!(config.iou_threshold, 0.45);
        assert_eq!(config.execution_provider, ExecutionProvider::Cpu);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "iou_threshold": 0.6 }"#).unwrap();
        assert_eq!(config.iou_threshold, 0.6);
        assert_eq!(config.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn test_provider_json_shape() {
        let json = serde_json::to_string(&ExecutionProvider::Cuda { device_id: 1 }).unwrap();
        assert_eq!(json, r#"{"kind":"cuda","device_id":1}"#);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "confidence_threshold": 1.5 }"#).unwrap();

        let err = PipelineConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = PipelineConfig {
            intra_threads: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
