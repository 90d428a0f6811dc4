use crate::video::{
    opencv_reader::OpencvReader, opencv_writer::OpencvWriter, VideoProperties, VideoReader,
    VideoSink,
};
use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use opencv::core::Mat;
use std::time::Instant;

/// Exclusive owner of the input handle, the optional output handle and the
/// progress bar for one run.
///
/// Handles are released exactly once: by `close`, or on drop if the run bailed
/// out early.
pub struct VideoSession {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoSink>>,
    has_output: bool,
    properties: VideoProperties,
    pub pb: ProgressBar,
    pub start_time: Instant,
    pub processed_frames: usize,
}

impl VideoSession {
    /// Opens the file at `video_path` and, if given, an output file matching its
    /// size and frame rate.
    pub fn open(video_path: &str, output_path: Option<&str>) -> Result<Self> {
        let session = Self::open_with(
            || -> Result<Box<dyn VideoReader>> {
                let reader = OpencvReader::new(video_path)
                    .with_context(|| format!("Failed to open video at: '{}'", video_path))?;
                Ok(Box::new(reader))
            },
            output_path.map(|path| {
                move |properties: VideoProperties| -> Result<Box<dyn VideoSink>> {
                    let writer = OpencvWriter::new(path, properties)
                        .with_context(|| format!("Failed to open output at: '{}'", path))?;
                    Ok(Box::new(writer) as Box<dyn VideoSink>)
                }
            }),
        )?;
        Ok(session.with_progress_bar(progress_bar()?))
    }

    /// Acquires the input, then the output configured from the input's properties.
    /// If the output cannot be opened the input is released before returning.
    pub fn open_with<R, W>(open_reader: R, open_writer: Option<W>) -> Result<Self>
    where
        R: FnOnce() -> Result<Box<dyn VideoReader>>,
        W: FnOnce(VideoProperties) -> Result<Box<dyn VideoSink>>,
    {
        let mut reader = open_reader()?;
        let properties = reader.properties();

        let writer = match open_writer {
            Some(open) => match open(properties) {
                Ok(writer) => Some(writer),
                Err(e) => {
                    if let Err(release_err) = reader.release() {
                        tracing::warn!("VideoSession: failed to release input: {}", release_err);
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        Ok(Self {
            reader: Some(reader),
            has_output: writer.is_some(),
            writer,
            properties,
            pb: ProgressBar::hidden(),
            start_time: Instant::now(),
            processed_frames: 0,
        })
    }

    pub fn with_progress_bar(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    pub fn properties(&self) -> VideoProperties {
        self.properties
    }

    pub fn has_output(&self) -> bool {
        self.has_output
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    pub fn next_frame(&mut self) -> Result<Option<Mat>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| anyhow!("Video session already closed"))?;
        reader.next_frame()
    }

    /// Appends `frame` to the output, if there is one.
    pub fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        if self.is_closed() {
            return Err(anyhow!("Video session already closed"));
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write_frame(frame)?;
        }
        Ok(())
    }

    /// Prints a console line without tearing the progress bar.
    pub fn println(&self, line: &str) {
        self.pb.suspend(|| println!("{}", line));
    }

    /// Releases the input, then the output. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        let reader_result = match self.reader.take() {
            Some(mut reader) => reader.release(),
            None => Ok(()),
        };
        let writer_result = match self.writer.take() {
            Some(mut writer) => writer.release(),
            None => Ok(()),
        };
        self.pb.finish_and_clear();
        reader_result.and(writer_result)
    }
}

impl Drop for VideoSession {
    fn drop(&mut self) {
        if self.reader.is_some() || self.writer.is_some() {
            tracing::debug!("VideoSession: releasing handles on drop");
            if let Err(e) = self.close() {
                tracing::warn!("VideoSession: failed to release handles: {}", e);
            }
        }
    }
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg} ({per_sec:.1.yellow} fps)")?,
    );
    Ok(pb)
}
