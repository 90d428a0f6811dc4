// Run report
//
// Optional JSON summary of a finished run, written next to the annotated
// video when requested.

use crate::pipeline::types::{ProcessingStats, ProgressRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub input: String,
    pub output: Option<String>,
    pub confidence_threshold: f32,
    pub created_at: DateTime<Utc>,
    pub frames_processed: usize,
    pub detections: Vec<ProgressRecord>,
}

impl RunReport {
    pub fn new(
        input: &str,
        output: Option<&str>,
        confidence_threshold: f32,
        stats: &ProcessingStats,
        detections: Vec<ProgressRecord>,
    ) -> Self {
        Self {
            input: input.to_string(),
            output: output.map(str::to_string),
            confidence_threshold,
            created_at: Utc::now(),
            frames_processed: stats.processed_frames,
            detections,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::info!("Report written to {}", path.display());
        Ok(())
    }
}
