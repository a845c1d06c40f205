//! Integration tests for yolobox-model crate

use std::path::PathBuf;
use tempfile::tempdir;
use yolobox_model::{
    inspect_model, ExecutionProvider, InferenceEngine, ModelError, OrtEngine, PipelineConfig,
};

#[test]
fn test_config_file_roundtrip() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("pipeline.json");
    let config = PipelineConfig {
        model_path: PathBuf::from("/tmp/models/best.onnx"),
        confidence_threshold: 0.25,
        iou_threshold: 0.5,
        execution_provider: ExecutionProvider::Cuda { device_id: 0 },
        intra_threads: Some(4),
    };

    config.to_json_file(&path).unwrap();
    let loaded = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(config, loaded);
}

#[test]
fn test_missing_model_file_fails_to_load() {
    let temp_dir = tempdir().unwrap();
    let config = PipelineConfig {
        model_path: temp_dir.path().join("nope.onnx"),
        ..Default::default()
    };
    assert!(matches!(OrtEngine::load(&config), Err(ModelError::Runtime(_))));
}

#[cfg(not(feature = "cuda"))]
#[test]
fn test_cuda_needs_feature() {
    let config = PipelineConfig {
        execution_provider: ExecutionProvider::Cuda { device_id: 0 },
        ..Default::default()
    };
    assert!(matches!(
        OrtEngine::load(&config),
        Err(ModelError::ProviderUnavailable(_))
    ));
}

/// Runs only when `YOLO_MODEL` points at a fixed-shape YOLO export.
#[test]
fn test_real_model_blank_batch() -> anyhow::Result<()> {
    let Ok(model) = std::env::var("YOLO_MODEL") else {
        return Ok(());
    };
    let spec = inspect_model(std::path::Path::new(&model))?;
    println!("model spec: {spec:?}");

    let mut engine = OrtEngine::load(&PipelineConfig {
        model_path: PathBuf::from(&model),
        ..Default::default()
    })?;
    let input = ndarray::Array4::<f32>::zeros(spec.input_shape);
    let output = engine.run(&input)?;
    assert_eq!(output.view(spec.output_shape)?.shape(), &spec.output_shape);
    Ok(())
}
