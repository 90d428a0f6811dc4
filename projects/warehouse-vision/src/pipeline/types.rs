use opencv::core::Point;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Axis-aligned box in pixel coordinates, top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoxXyxy {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoxXyxy {
    /// Builds a box from two corners in any order, keeping `x1 <= x2` and `y1 <= y2`.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x2, self.y2)
    }
}

/// A single object reported by the detector for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoxXyxy,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, confidence: f32, bbox: BoxXyxy) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }

    /// Inclusive threshold check shared by the annotator and progress reporting.
    pub fn meets(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// One retained detection, as reported while streaming
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressRecord {
    /// 1-based index of the frame within the stream
    pub frame_index: usize,
    pub label: String,
    pub original_label: String,
    pub confidence: f32,
}

impl fmt::Display for ProgressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame {}: Found {} (original: {}) with confidence {:.2}",
            self.frame_index, self.label, self.original_label, self.confidence
        )
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingStats {
    pub processed_frames: usize,
    pub retained_detections: usize,
    pub duration: Duration,
}
