use super::{VideoProperties, VideoSink};
use anyhow::{anyhow, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::VideoWriter,
};

/// Codec tag for the annotated output
pub const OUTPUT_FOURCC: [char; 4] = ['m', 'p', '4', 'v'];

pub struct OpencvWriter {
    writer: VideoWriter,
}

impl OpencvWriter {
    /// Opens `path` for writing with the same size and frame rate as `properties`.
    pub fn new(path: &str, properties: VideoProperties) -> Result<Self> {
        let [c1, c2, c3, c4] = OUTPUT_FOURCC;
        let fourcc = VideoWriter::fourcc(c1, c2, c3, c4)?;
        let writer = VideoWriter::new(
            path,
            fourcc,
            properties.fps,
            Size::new(properties.width, properties.height),
            true,
        )?;
        if !writer.is_opened()? {
            return Err(anyhow!("Failed to open video writer: {}", path));
        }

        tracing::info!(
            "OpencvWriter: opened {}, {}x{}, fps={:.2}, codec={}",
            path,
            properties.width,
            properties.height,
            properties.fps,
            OUTPUT_FOURCC.iter().collect::<String>()
        );

        Ok(Self { writer })
    }
}

impl VideoSink for OpencvWriter {
    fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame)?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.writer.release()?;
        Ok(())
    }
}
