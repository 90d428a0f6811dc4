pub mod opencv_reader;
pub mod opencv_writer;
pub mod processor;

use anyhow::Result;
use opencv::core::Mat;

/// Spatial size and frame rate of a stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
}

/// Sequential, read-only frame source.
pub trait VideoReader {
    fn properties(&self) -> VideoProperties;
    /// Returns `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Mat>>;
    fn release(&mut self) -> Result<()>;
}

/// Sequential, write-only frame sink.
pub trait VideoSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}
