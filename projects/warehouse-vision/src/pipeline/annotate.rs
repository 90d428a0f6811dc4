use crate::labels::{resolve_color, resolve_label};
use crate::pipeline::types::Detection;
use anyhow::Result;
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8};

const BOX_THICKNESS: i32 = 2;
const FONT_SCALE: f64 = 0.5;
const TEXT_THICKNESS: i32 = 2;
/// Gap between the box top edge and the text baseline, room for descenders
const TEXT_PADDING: i32 = 10;

/// Draws every detection meeting `threshold` onto `frame`, in detector order.
///
/// Each retained detection gets a 2px outline in its label color, a filled
/// label background sitting on the box's top edge, and white
/// `"<label>: <confidence>"` text. The background is not clamped to the frame,
/// so boxes touching the top edge get a partially clipped label.
pub fn annotate(frame: &mut Mat, detections: &[Detection], threshold: f32) -> Result<()> {
    for detection in detections.iter().filter(|d| d.meets(threshold)) {
        draw_detection(frame, detection)?;
    }
    Ok(())
}

/// Text drawn above a retained detection.
pub fn label_text(detection: &Detection) -> String {
    format!(
        "{}: {:.2}",
        resolve_label(&detection.class_name),
        detection.confidence
    )
}

fn draw_detection(frame: &mut Mat, detection: &Detection) -> Result<()> {
    let label = resolve_label(&detection.class_name);
    let color = resolve_color(label).to_scalar();
    let top_left = detection.bbox.top_left();

    imgproc::rectangle_points(
        frame,
        top_left,
        detection.bbox.bottom_right(),
        color,
        BOX_THICKNESS,
        LINE_8,
        0,
    )?;

    let text = label_text(detection);
    let mut baseline = 0;
    let text_size = imgproc::get_text_size(
        &text,
        FONT_HERSHEY_SIMPLEX,
        FONT_SCALE,
        TEXT_THICKNESS,
        &mut baseline,
    )?;

    imgproc::rectangle_points(
        frame,
        Point::new(top_left.x, top_left.y - text_size.height - TEXT_PADDING),
        Point::new(top_left.x + text_size.width, top_left.y),
        color,
        imgproc::FILLED,
        LINE_8,
        0,
    )?;

    imgproc::put_text(
        frame,
        &text,
        Point::new(top_left.x, top_left.y - TEXT_PADDING),
        FONT_HERSHEY_SIMPLEX,
        FONT_SCALE,
        Scalar::new(255.0, 255.0, 255.0, 0.0),
        TEXT_THICKNESS,
        LINE_8,
        false,
    )?;

    Ok(())
}
