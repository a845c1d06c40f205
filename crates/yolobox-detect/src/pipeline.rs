//! End-to-end batch detection over an [`InferenceEngine`].

use std::path::Path;
use std::time::Instant;

use tracing::info;
use yolobox_model::{InferenceEngine, ModelSpec, OrtEngine, PipelineConfig};
use yolobox_preprocess::{load_slots, Frame, TensorPacker};

use crate::{
    decode, map_detections, suppress_batch, DetectError, Detector, MappedDetection, Result,
};

/// Packs frames, runs the engine once per batch and post-processes the
/// output. Thresholds are fixed at construction.
pub struct BatchDetector<E: InferenceEngine> {
    engine: E,
    packer: TensorPacker,
    config: PipelineConfig,
}

impl BatchDetector<OrtEngine> {
    /// Load the ONNX model named by `config` and build a detector for it.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let engine = OrtEngine::load(&config)?;
        Self::new(engine, config)
    }
}

impl<E: InferenceEngine> BatchDetector<E> {
    /// Size the packer from the engine's declared input layout.
    pub fn new(engine: E, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let spec = engine.spec();
        let packer = TensorPacker::new(
            spec.batch_capacity(),
            spec.input_width() as u32,
            spec.input_height() as u32,
        )?;
        info!(
            capacity = packer.capacity(),
            width = packer.width(),
            height = packer.height(),
            classes = spec.num_classes(),
            confidence = config.confidence_threshold,
            iou = config.iou_threshold,
            "batch detector ready"
        );
        Ok(Self { engine, packer, config })
    }

    pub fn spec(&self) -> &ModelSpec {
        self.engine.spec()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Like [`Detector::detect_batch`], but gives up with
    /// [`DetectError::DeadlineExceeded`] once `deadline` has passed.
    /// Checked between stages; a running inference is not interrupted.
    pub fn detect_until(
        &mut self,
        slots: &[Option<Frame>],
        deadline: Instant,
    ) -> Result<Vec<Vec<MappedDetection>>> {
        self.run(slots, Some(deadline))
    }

    /// Decode the images at `paths` and detect on them as one batch.
    /// Files that fail to decode become empty slots.
    pub fn detect_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<Vec<MappedDetection>>> {
        let slots = load_slots(paths);
        self.run(&slots, None)
    }

    fn run(
        &mut self,
        slots: &[Option<Frame>],
        deadline: Option<Instant>,
    ) -> Result<Vec<Vec<MappedDetection>>> {
        let started = Instant::now();
        let packed = self.packer.pack(slots)?;
        check_deadline(deadline)?;

        let raw = self.engine.run(&packed.tensor)?;
        check_deadline(deadline)?;

        let output = raw.view(self.engine.spec().output_shape)?;
        let candidates = decode(output, self.config.confidence_threshold)?;
        let kept = suppress_batch(&candidates, self.config.iou_threshold);

        let mut results: Vec<Vec<MappedDetection>> = kept
            .iter()
            .zip(&packed.params)
            .map(|(dets, params)| match params {
                Some(params) => map_detections(dets, params),
                None => Vec::new(),
            })
            .collect();
        results.truncate(slots.len());

        info!(
            slots = slots.len(),
            detections = results.iter().map(Vec::len).sum::<usize>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch done"
        );
        Ok(results)
    }
}

impl<E: InferenceEngine> Detector for BatchDetector<E> {
    fn detect_batch(&mut self, slots: &[Option<Frame>]) -> Result<Vec<Vec<MappedDetection>>> {
        self.run(slots, None)
    }
}

fn check_deadline(deadline: Option<Instant>) -> Result<()> {
    match deadline {
        Some(deadline) => {
            let now = Instant::now();
            if now > deadline {
                Err(DetectError::DeadlineExceeded(now - deadline))
            } else {
                Ok(())
            }
        }
        None => Ok(()),
    }
}
