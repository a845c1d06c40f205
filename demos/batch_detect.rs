//! Batch detection demo
//!
//! Runs every image in a directory through a fixed-shape YOLO model,
//! `batch_capacity` images per inference call, then:
//! 1. draws the surviving boxes (and `class,confidence` labels when a
//!    font is given) onto each source image
//! 2. saves `<stem>_output.png` under `<output>/<yyyyMMdd>/`
//! 3. writes all detections to `detections.json` next to them
//!
//! Usage:
//!   cargo run -p demos --bin batch_detect -- --model yolov5s.onnx --images ./images

mod draw;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use yolobox_detect::{BatchDetector, Detector, MappedDetection};
use yolobox_model::{ExecutionProvider, PipelineConfig};
use yolobox_preprocess::load_slots;

/// Detect objects in a directory of images
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ONNX model file (overrides the config file)
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Directory holding *.png / *.jpg / *.jpeg
    #[arg(long, value_name = "DIR")]
    images: PathBuf,

    /// JSON pipeline config
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root directory for annotated images and the report
    #[arg(long, default_value = "./output", value_name = "DIR")]
    output: PathBuf,

    /// Objectness threshold (0.0 - 1.0)
    #[arg(long, value_name = "THRESHOLD")]
    confidence: Option<f32>,

    /// NMS IoU threshold (0.0 - 1.0)
    #[arg(long, value_name = "THRESHOLD")]
    iou: Option<f32>,

    /// Run on this CUDA device
    #[arg(long, value_name = "DEVICE")]
    cuda: Option<i32>,

    /// TrueType font for `class,confidence` labels; boxes only without it
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
}

#[derive(Serialize)]
struct ImageReport<'a> {
    image: &'a Path,
    output: Option<PathBuf>,
    detections: &'a [MappedDetection],
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if let Some(conf) = args.confidence {
        config.confidence_threshold = conf;
    }
    if let Some(iou) = args.iou {
        config.iou_threshold = iou;
    }
    if let Some(device_id) = args.cuda {
        config.execution_provider = ExecutionProvider::Cuda { device_id };
    }
    config.validate()?;
    Ok(config)
}

/// Image files directly under `dir`, sorted by path.
fn scan_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for ext in ["png", "jpg", "jpeg"] {
        let pattern = dir.join(format!("*.{ext}"));
        let pattern = pattern.to_str().context("image directory is not valid UTF-8")?;
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => warn!("unreadable entry: {e}"),
            }
        }
    }
    paths.sort();
    Ok(paths)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let images = scan_images(&args.images)?;
    if images.is_empty() {
        warn!(dir = %args.images.display(), "no images found");
        return Ok(());
    }

    let mut detector = BatchDetector::from_config(config)
        .context("loading model")?;
    let capacity = detector.spec().batch_capacity();
    let font = args.font.as_deref().map(draw::Draw::load_font).transpose()?;
    let drawer = draw::Draw::new(detector.spec().num_classes(), font);

    let out_dir = args.output.join(chrono::Local::now().format("%Y%m%d").to_string());
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    info!(images = images.len(), capacity, out = %out_dir.display(), "starting");

    let mut all: Vec<(PathBuf, Option<PathBuf>, Vec<MappedDetection>)> = Vec::with_capacity(images.len());
    for chunk in images.chunks(capacity) {
        let slots = load_slots(chunk);
        let results = detector.detect_batch(&slots)?;

        for ((path, slot), dets) in chunk.iter().zip(&slots).zip(results) {
            let saved = match slot.as_ref().and_then(|f| f.to_rgb_image()) {
                Some(mut image) => {
                    drawer.draw_detections(&mut image, &dets);
                    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
                    let target = out_dir.join(format!("{stem}_output.png"));
                    image
                        .save(&target)
                        .with_context(|| format!("writing {}", target.display()))?;
                    Some(target)
                }
                None => None,
            };
            info!(image = %path.display(), detections = dets.len(), "processed");
            all.push((path.clone(), saved, dets));
        }
    }

    let report: Vec<ImageReport> = all
        .iter()
        .map(|(image, output, dets)| ImageReport {
            image,
            output: output.clone(),
            detections: dets,
        })
        .collect();
    let report_path = out_dir.join("detections.json");
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", report_path.display()))?;

    info!(report = %report_path.display(), "done");
    Ok(())
}
