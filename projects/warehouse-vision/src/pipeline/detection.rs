use crate::pipeline::types::{BoxXyxy, Detection};
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageBuffer, Rgb};
use opencv::core::Mat;
use opencv::prelude::*;
use usls::models::RTDETR;
use usls::{Config, Image};

/// Anything that turns a frame into a sequence of detections.
///
/// Detections come back in detector order and already exclude anything
/// scoring below `min_confidence`.
pub trait Detector {
    fn predict(&mut self, frame: &Mat, min_confidence: f32) -> Result<Vec<Detection>>;

    /// Short human-readable description for the startup banner.
    fn describe(&self) -> String {
        "object detector".to_string()
    }
}

/// A wrapper around the USLS RT-DETR model that handles BGR-to-RGB conversion
/// and corrects for aspect-ratio padding bugs in the underlying model library.
pub struct ObjectDetector {
    model: RTDETR,
    model_path: String,
}

impl ObjectDetector {
    /// Create a new detector with the given model path.
    pub fn new(model_path: &str) -> Result<Self> {
        let config = Config::default()
            .with_model_file(model_path)
            .with_class_names(&usls::NAMES_COCO_80);

        #[cfg(target_os = "macos")]
        let config = config.with_model_device(usls::Device::CoreMl);

        let config = config.commit()?;
        let model = RTDETR::new(config)
            .with_context(|| format!("Failed to load model: {}", model_path))?;
        tracing::info!("ObjectDetector: loaded {}", model_path);
        Ok(Self {
            model,
            model_path: model_path.to_string(),
        })
    }
}

impl Detector for ObjectDetector {
    fn predict(&mut self, frame: &Mat, min_confidence: f32) -> Result<Vec<Detection>> {
        let dynamic_image = mat_to_dynamic_image(frame)?;

        let size = frame.size()?;
        let (x_correction, y_correction) =
            aspect_correction(size.width as f32, size.height as f32);

        let results = self.model.forward(&[Image::from(dynamic_image)])?;
        let hbbs = results
            .into_iter()
            .next()
            .map(|y| y.hbbs)
            .unwrap_or_default();

        let detections = hbbs
            .into_iter()
            .filter_map(|hbb| {
                let confidence = hbb.confidence().unwrap_or(0.0);
                if confidence < min_confidence {
                    return None;
                }
                let x1 = hbb.xmin() * x_correction;
                let y1 = hbb.ymin() * y_correction;
                let x2 = x1 + hbb.width() * x_correction;
                let y2 = y1 + hbb.height() * y_correction;
                let class_name = hbb.name().unwrap_or("").to_string();
                Some(Detection::new(
                    class_name,
                    confidence,
                    BoxXyxy::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32),
                ))
            })
            .collect::<Vec<_>>();

        tracing::debug!("ObjectDetector: {} detections", detections.len());
        Ok(detections)
    }

    fn describe(&self) -> String {
        format!("RT-DETR ({})", self.model_path)
    }
}

/// Scale factors that undo the square letterboxing applied by the model library.
fn aspect_correction(width: f32, height: f32) -> (f32, f32) {
    if width > height {
        (width / height, 1.0)
    } else if height > width {
        (1.0, height / width)
    } else {
        (1.0, 1.0)
    }
}

/// Convert an OpenCV Mat (BGR) to an image::DynamicImage (RGB)
fn mat_to_dynamic_image(mat: &Mat) -> Result<DynamicImage> {
    let mut rgb_mat = Mat::default();
    opencv::imgproc::cvt_color_def(mat, &mut rgb_mat, opencv::imgproc::COLOR_BGR2RGB)?;

    let size = rgb_mat.size()?;
    let width = size.width as u32;
    let height = size.height as u32;

    if !rgb_mat.is_continuous() {
        return Err(anyhow!("Mat is not continuous"));
    }

    let buffer = rgb_mat.data_bytes()?.to_vec();

    let img_buffer = ImageBuffer::<Rgb<u8>, _>::from_vec(width, height, buffer)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from Mat data"))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}
