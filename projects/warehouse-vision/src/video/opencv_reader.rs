use super::{VideoProperties, VideoReader};
use anyhow::{anyhow, Result};
use opencv::{
    prelude::*,
    videoio::{
        VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
        CAP_PROP_FRAME_WIDTH,
    },
};

pub struct OpencvReader {
    capture: VideoCapture,
    properties: VideoProperties,
}

impl OpencvReader {
    pub fn new(path: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(path, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open video file: {}", path));
        }

        let width = capture.get(CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(CAP_PROP_FRAME_HEIGHT)? as i32;
        let mut fps = capture.get(CAP_PROP_FPS)?;
        if fps <= 0.0 {
            tracing::warn!("OpencvReader: Failed to get FPS from metadata, falling back to 30.0");
            fps = 30.0;
        }
        let raw_count = capture.get(CAP_PROP_FRAME_COUNT)? as usize;

        tracing::info!(
            "OpencvReader: opened {}, {}x{}, fps={:.2}, stream_frames={}",
            path,
            width,
            height,
            fps,
            raw_count
        );

        Ok(Self {
            capture,
            properties: VideoProperties { width, height, fps },
        })
    }
}

impl VideoReader for OpencvReader {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let success = self.capture.read(&mut frame)?;
        if !success || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        self.capture.release()?;
        Ok(())
    }
}
