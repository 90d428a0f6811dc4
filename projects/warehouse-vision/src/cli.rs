use crate::pipeline::orchestrator::DEFAULT_CONFIDENCE_THRESHOLD;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input video file
    #[arg(long, env = "WAREHOUSE_VISION_INPUT", default_value = "files/plyneer_sample.mp4")]
    pub input: String,

    /// Annotated output video file
    #[arg(
        long,
        env = "WAREHOUSE_VISION_OUTPUT",
        default_value = "files/output_plyneer_sample.mp4"
    )]
    pub output: String,

    /// Only report detections, do not write an output video
    #[arg(long)]
    pub no_output: bool,

    /// Minimum detection confidence to draw and report
    #[arg(long, env = "WAREHOUSE_VISION_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence: f32,

    /// RT-DETR ONNX model file
    #[arg(long, env = "WAREHOUSE_VISION_MODEL", default_value = "models/rtdetr.onnx")]
    pub model: String,

    /// Write a JSON report of all reported detections
    #[arg(long, env = "WAREHOUSE_VISION_REPORT")]
    pub report: Option<PathBuf>,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn output_path(&self) -> Option<&str> {
        (!self.no_output).then_some(self.output.as_str())
    }
}
