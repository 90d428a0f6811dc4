use anyhow::Result;
use tracing_subscriber::EnvFilter;
use warehouse_vision::cli::Args;
use warehouse_vision::pipeline::detection::{Detector, ObjectDetector};
use warehouse_vision::pipeline::orchestrator::WarehousePipeline;
use warehouse_vision::pipeline::types::ProgressRecord;
use warehouse_vision::report::RunReport;
use warehouse_vision::video::processor::VideoSession;

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse_args();
    let output_path = args.output_path();

    let detector = ObjectDetector::new(&args.model)?;

    println!("Processing video: {}", args.input);
    match output_path {
        Some(path) => println!("Output will be saved to: {}", path),
        None => println!("Output disabled"),
    }
    println!("Confidence threshold: {}", args.confidence);
    println!(
        "Using {} with warehouse-specific class mapping",
        detector.describe()
    );

    let mut pipeline = WarehousePipeline::new(detector, args.confidence);
    let mut records = Vec::new();
    let stats = pipeline.run(
        || VideoSession::open(&args.input, output_path),
        |record: &ProgressRecord| {
            if args.report.is_some() {
                records.push(record.clone());
            }
        },
    )?;

    if let Some(report_path) = &args.report {
        RunReport::new(&args.input, output_path, args.confidence, &stats, records)
            .write(report_path)?;
    }

    Ok(())
}
