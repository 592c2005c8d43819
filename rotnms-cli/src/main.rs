use clap::Parser;
use rotnms::{
    BatchInputs, BatchOutputsMut, ExecutionContext, NmsConfig, RotatedNmsEngine, FLOATS_PER_BOX,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Rotated-box NMS CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
struct Config {
    /// JSON file with per-image candidate lists.
    candidates_path: String,
    /// Where to write kept detections; stdout when null.
    #[serde(default)]
    output_path: Option<String>,
    nms_thresh: f32,
    detections_per_im: usize,
    #[serde(default)]
    parallel: bool,
}

/// One candidate detection: score, packed rotated box, class id.
#[derive(Debug, Deserialize)]
struct CandidateJson {
    score: f32,
    /// [cx, cy, width, height, angle_rad, aux]
    box_params: [f32; FLOATS_PER_BOX],
    class: f32,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    score: f32,
    box_params: [f32; FLOATS_PER_BOX],
    class: f32,
}

#[derive(Debug, Serialize)]
struct Output {
    detections: Vec<Vec<DetectionRecord>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("rotnms=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;

    let candidates_text = fs::read_to_string(&config.candidates_path)?;
    let images: Vec<Vec<CandidateJson>> = serde_json::from_str(&candidates_text)?;
    if images.is_empty() {
        return Err("candidates file holds no images".into());
    }
    let count = images[0].len();
    if count == 0 {
        return Err("candidate count per image must be at least 1".into());
    }
    if images.iter().any(|image| image.len() != count) {
        return Err("all images must carry the same candidate count".into());
    }

    let batch_size = images.len();
    let mut scores = Vec::with_capacity(batch_size * count);
    let mut boxes = Vec::with_capacity(batch_size * count * FLOATS_PER_BOX);
    let mut classes = Vec::with_capacity(batch_size * count);
    for image in &images {
        for cand in image {
            scores.push(cand.score);
            boxes.extend_from_slice(&cand.box_params);
            classes.push(cand.class);
        }
    }

    let engine = RotatedNmsEngine::new(NmsConfig::new(
        config.nms_thresh,
        config.detections_per_im,
        count,
    )?)?;

    let det = config.detections_per_im;
    let mut out_boxes = vec![0.0f32; batch_size * det * FLOATS_PER_BOX];
    let mut out_scores = vec![0.0f32; batch_size * det];
    let mut out_classes = vec![0.0f32; batch_size * det];
    let mut workspace = vec![0u8; engine.required_workspace(batch_size)?];

    let inputs = BatchInputs::new(&scores, &boxes, &classes, batch_size, count)?;
    let mut outputs =
        BatchOutputsMut::new(&mut out_boxes, &mut out_scores, &mut out_classes, batch_size, det)?;
    let ctx = if config.parallel {
        ExecutionContext::parallel()
    } else {
        ExecutionContext::serial()
    };
    engine.enqueue(batch_size, &inputs, &mut outputs, &mut workspace, &ctx)?;

    let mut detections = Vec::with_capacity(batch_size);
    for image in 0..batch_size {
        let mut records = Vec::new();
        for slot in 0..det {
            let score = out_scores[image * det + slot];
            if score <= 0.0 {
                break;
            }
            let base = (image * det + slot) * FLOATS_PER_BOX;
            let mut box_params = [0.0f32; FLOATS_PER_BOX];
            box_params.copy_from_slice(&out_boxes[base..base + FLOATS_PER_BOX]);
            records.push(DetectionRecord {
                score,
                box_params,
                class: out_classes[image * det + slot],
            });
        }
        detections.push(records);
    }

    let rendered = serde_json::to_string_pretty(&Output { detections })?;
    match config.output_path {
        Some(path) => fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}
