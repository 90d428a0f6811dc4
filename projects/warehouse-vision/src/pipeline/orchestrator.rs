// Pipeline orchestrator: drives one annotation run
//
// Opening -> Streaming -> Closing -> Done, with Failed reachable when the
// input or output cannot be opened, or when a read, inference or write fails
// mid-stream. Handles are released on every path out of Streaming.

use crate::labels::resolve_label;
use crate::pipeline::annotate::annotate;
use crate::pipeline::detection::Detector;
use crate::pipeline::types::{ProcessingStats, ProgressRecord};
use crate::video::processor::VideoSession;
use anyhow::Result;
use opencv::prelude::*;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Opening,
    Streaming,
    Closing,
    Done,
    Failed,
}

/// Receives every retained detection as it is reported.
pub trait ProgressObserver {
    fn on_record(&mut self, record: &ProgressRecord);
}

/// Blanket implementation so any closure with the right signature
/// automatically implements ProgressObserver.
impl<F> ProgressObserver for F
where
    F: FnMut(&ProgressRecord),
{
    fn on_record(&mut self, record: &ProgressRecord) {
        self(record)
    }
}

pub struct WarehousePipeline<D: Detector> {
    detector: D,
    confidence_threshold: f32,
    state: PipelineState,
}

impl<D: Detector> WarehousePipeline<D> {
    pub fn new(detector: D, confidence_threshold: f32) -> Self {
        Self {
            detector,
            confidence_threshold,
            state: PipelineState::Opening,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Runs a full pass: `open` acquires the session, every frame is detected,
    /// annotated and written, then the session is closed.
    pub fn run<F, O>(&mut self, open: F, mut observer: O) -> Result<ProcessingStats>
    where
        F: FnOnce() -> Result<VideoSession>,
        O: ProgressObserver,
    {
        self.transition(PipelineState::Opening);
        let mut session = match open() {
            Ok(session) => session,
            Err(e) => {
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        self.transition(PipelineState::Streaming);
        let streamed = self.stream(&mut session, &mut observer);

        self.transition(PipelineState::Closing);
        let closed = session.close();

        match streamed.and_then(|stats| closed.map(|_| stats)) {
            Ok(stats) => {
                self.transition(PipelineState::Done);
                session.println("Processing complete!");
                tracing::info!(
                    "Processed {} frames ({} detections) in {:.2}s",
                    stats.processed_frames,
                    stats.retained_detections,
                    stats.duration.as_secs_f64()
                );
                Ok(stats)
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                Err(e)
            }
        }
    }

    fn stream<O: ProgressObserver>(
        &mut self,
        session: &mut VideoSession,
        observer: &mut O,
    ) -> Result<ProcessingStats> {
        let threshold = self.confidence_threshold;
        let mut retained_detections = 0;

        while let Some(frame) = session.next_frame()? {
            session.processed_frames += 1;
            let frame_index = session.processed_frames;
            session
                .pb
                .set_message(format!("Processing frame {}", frame_index));
            session.pb.inc(1);

            let detections = self.detector.predict(&frame, threshold)?;

            let mut annotated = frame.try_clone()?;
            annotate(&mut annotated, &detections, threshold)?;
            session.write_frame(&annotated)?;

            for detection in detections.iter().filter(|d| d.meets(threshold)) {
                let record = ProgressRecord {
                    frame_index,
                    label: resolve_label(&detection.class_name).to_string(),
                    original_label: detection.class_name.clone(),
                    confidence: detection.confidence,
                };
                session.println(&record.to_string());
                observer.on_record(&record);
                retained_detections += 1;
            }

            tracing::debug!(
                "Frame {}: {}x{}, {} raw detections",
                frame_index,
                frame.cols(),
                frame.rows(),
                detections.len()
            );
        }

        Ok(ProcessingStats {
            processed_frames: session.processed_frames,
            retained_detections,
            duration: session.start_time.elapsed(),
        })
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!("Pipeline: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{BoxXyxy, Detection};
    use crate::video::processor::tests::{memory_session, solid_frame, Probe, PROPS};
    use anyhow::anyhow;
    use opencv::core::{Mat, Vec3b};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Replays one scripted result per frame and remembers the thresholds it was given
    struct ScriptedDetector {
        script: VecDeque<Result<Vec<Detection>>>,
        thresholds: Vec<f32>,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Result<Vec<Detection>>>) -> Self {
            Self {
                script: script.into(),
                thresholds: Vec::new(),
            }
        }
    }

    impl Detector for ScriptedDetector {
        fn predict(&mut self, _frame: &Mat, min_confidence: f32) -> Result<Vec<Detection>> {
            self.thresholds.push(min_confidence);
            self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn pixel(frame: &Mat, x: i32, y: i32) -> [u8; 3] {
        frame.at_2d::<Vec3b>(y, x).unwrap().0
    }

    fn run_with(
        frames: Vec<Result<Mat>>,
        script: Vec<Result<Vec<Detection>>>,
        with_output: bool,
    ) -> (
        WarehousePipeline<ScriptedDetector>,
        Result<ProcessingStats>,
        Vec<ProgressRecord>,
        Rc<RefCell<Probe>>,
    ) {
        let (session, probe) = memory_session(frames, with_output);
        let mut pipeline =
            WarehousePipeline::new(ScriptedDetector::new(script), DEFAULT_CONFIDENCE_THRESHOLD);
        let mut records = Vec::new();
        let result = pipeline.run(|| Ok(session), |r: &ProgressRecord| records.push(r.clone()));
        (pipeline, result, records, probe)
    }

    #[test]
    fn test_worker_drawn_and_low_confidence_bicycle_dropped() {
        let script = vec![Ok(vec![
            Detection::new("person", 0.9, BoxXyxy::new(10, 10, 50, 50)),
            Detection::new("bicycle", 0.2, BoxXyxy::new(60, 60, 90, 90)),
        ])];
        let (pipeline, result, records, probe) =
            run_with(vec![Ok(solid_frame(100, 100, 0.0))], script, true);

        let stats = result.unwrap();
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(stats.processed_frames, 1);
        assert_eq!(stats.retained_detections, 1);
        assert_eq!(
            records,
            vec![ProgressRecord {
                frame_index: 1,
                label: "warehouse worker".to_string(),
                original_label: "person".to_string(),
                confidence: 0.9,
            }]
        );

        let probe = probe.borrow();
        assert_eq!(probe.written.len(), 1);
        let out = &probe.written[0];
        assert_eq!(pixel(out, 10, 30), [255, 255, 0]);
        assert_eq!(pixel(out, 75, 60), [0, 0, 0]);
        assert_eq!(pixel(out, 60, 75), [0, 0, 0]);
    }

    #[test]
    fn test_unmapped_class_above_threshold_reported_unknown() {
        let script = vec![Ok(vec![Detection::new(
            "bicycle",
            0.5,
            BoxXyxy::new(20, 40, 80, 90),
        )])];
        let (_pipeline, result, records, probe) =
            run_with(vec![Ok(solid_frame(100, 100, 0.0))], script, true);

        result.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "unknown");
        assert_eq!(records[0].original_label, "bicycle");
        assert_eq!(
            records[0].to_string(),
            "Frame 1: Found unknown (original: bicycle) with confidence 0.50"
        );
        assert_eq!(pixel(&probe.borrow().written[0], 20, 65), [128, 128, 128]);
    }

    #[test]
    fn test_empty_video_completes() {
        let (pipeline, result, records, probe) = run_with(vec![], vec![], true);
        let stats = result.unwrap();
        assert_eq!(stats.processed_frames, 0);
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert!(records.is_empty());
        let probe = probe.borrow();
        assert!(probe.written.is_empty());
        assert_eq!(probe.writer_properties, Some(PROPS));
        assert_eq!(probe.reader_releases, 1);
        assert_eq!(probe.writer_releases, 1);
    }

    #[test]
    fn test_one_output_frame_per_input_frame() {
        let frames = (0..3).map(|_| Ok(solid_frame(100, 100, 0.0))).collect();
        let script = vec![
            Ok(vec![Detection::new("truck", 0.8, BoxXyxy::new(5, 30, 40, 60))]),
            Ok(vec![]),
            Ok(vec![
                Detection::new("tv", 0.4, BoxXyxy::new(5, 30, 40, 60)),
                Detection::new("book", 0.35, BoxXyxy::new(50, 30, 90, 60)),
            ]),
        ];
        let (pipeline, result, records, probe) = run_with(frames, script, true);

        let stats = result.unwrap();
        assert_eq!(stats.processed_frames, 3);
        assert_eq!(probe.borrow().written.len(), 3);
        let indices: Vec<usize> = records.iter().map(|r| r.frame_index).collect();
        assert_eq!(indices, vec![1, 3, 3]);
        let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["forklift", "pallet rack", "cardboard box"]);
        // Threshold forwarded to the detector once per frame
        assert_eq!(pipeline.detector().thresholds, vec![0.3, 0.3, 0.3]);
    }

    #[test]
    fn test_without_output_nothing_written() {
        let script = vec![Ok(vec![Detection::new(
            "person",
            0.9,
            BoxXyxy::new(10, 10, 50, 50),
        )])];
        let (_pipeline, result, records, probe) =
            run_with(vec![Ok(solid_frame(100, 100, 0.0))], script, false);
        assert_eq!(result.unwrap().processed_frames, 1);
        assert_eq!(records.len(), 1);
        let probe = probe.borrow();
        assert!(probe.written.is_empty());
        assert_eq!(probe.writer_releases, 0);
        assert_eq!(probe.reader_releases, 1);
    }

    #[test]
    fn test_read_failure_aborts_and_releases() {
        let frames = vec![
            Ok(solid_frame(100, 100, 0.0)),
            Err(anyhow!("corrupt frame")),
            Ok(solid_frame(100, 100, 0.0)),
        ];
        let (pipeline, result, _records, probe) = run_with(frames, vec![], true);

        let err = result.err().unwrap();
        assert!(err.to_string().contains("corrupt frame"));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        let probe = probe.borrow();
        assert_eq!(probe.written.len(), 1);
        assert_eq!(probe.reader_releases, 1);
        assert_eq!(probe.writer_releases, 1);
    }

    #[test]
    fn test_detector_failure_propagates_and_releases() {
        let script = vec![Err(anyhow!("inference failed"))];
        let (pipeline, result, _records, probe) =
            run_with(vec![Ok(solid_frame(100, 100, 0.0))], script, true);

        assert_eq!(result.err().unwrap().to_string(), "inference failed");
        assert_eq!(pipeline.state(), PipelineState::Failed);
        let probe = probe.borrow();
        assert!(probe.written.is_empty());
        assert_eq!(probe.reader_releases, 1);
        assert_eq!(probe.writer_releases, 1);
    }

    #[test]
    fn test_open_failure_enters_failed() {
        let mut pipeline = WarehousePipeline::new(ScriptedDetector::new(vec![]), 0.3);
        let result = pipeline.run(
            || Err(anyhow!("Failed to open video file: missing.mp4")),
            |_: &ProgressRecord| {},
        );
        assert!(result.is_err());
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(pipeline.detector().thresholds.is_empty());
    }
}
