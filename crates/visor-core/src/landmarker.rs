//! 68-point facial landmark regressor via ONNX Runtime.
//!
//! Crops a context-padded square around a detected face, resizes it to the
//! 112×112 model input and maps the normalized point outputs back to frame
//! pixels.

use crate::types::{FaceBox, LandmarkError, LandmarkSet, Point, LANDMARK_COUNT};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const LANDMARK_INPUT_SIZE: u32 = 112;
/// Crop side relative to the larger face box side.
const LANDMARK_CROP_EXPAND: f32 = 1.2;

#[derive(Error, Debug)]
pub enum LandmarkerError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face box {0:?} does not overlap the frame")]
    EmptyCrop(FaceBox),
    #[error(transparent)]
    Landmarks(#[from] LandmarkError),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Frame area fed to the regressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CropWindow {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

pub struct LandmarkPredictor {
    session: Session,
}

impl LandmarkPredictor {
    pub fn load(model_path: &Path) -> Result<Self, LandmarkerError> {
        if !model_path.exists() {
            return Err(LandmarkerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded 68-point landmark model"
        );

        Ok(Self { session })
    }

    pub fn predict(&mut self, image: &RgbImage, face: &FaceBox) -> Result<LandmarkSet, LandmarkerError> {
        let window = crop_window(face, image.width(), image.height())
            .ok_or(LandmarkerError::EmptyCrop(*face))?;
        let input = preprocess(image, window);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LandmarkerError::InferenceFailed(format!("landmark extraction: {e}")))?;

        if raw.len() < LANDMARK_COUNT * 2 {
            return Err(LandmarkerError::InferenceFailed(format!(
                "expected {} landmark coordinates, got {}",
                LANDMARK_COUNT * 2,
                raw.len()
            )));
        }

        Ok(decode_points(&raw[..LANDMARK_COUNT * 2], window)?)
    }
}

/// Square window centered on the face, expanded for context and clamped to the frame.
fn crop_window(face: &FaceBox, image_width: u32, image_height: u32) -> Option<CropWindow> {
    let side = face.width.max(face.height) * LANDMARK_CROP_EXPAND;
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;

    let x0 = (cx - side / 2.0).round().max(0.0);
    let y0 = (cy - side / 2.0).round().max(0.0);
    let x1 = (cx + side / 2.0).round().min(image_width as f32);
    let y1 = (cy + side / 2.0).round().min(image_height as f32);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(CropWindow {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

/// Resize the crop to the model input and scale pixels to [0, 1], NCHW.
fn preprocess(image: &RgbImage, window: CropWindow) -> Array4<f32> {
    let crop = imageops::crop_imm(image, window.x, window.y, window.width, window.height).to_image();
    let resized = imageops::resize(&crop, LANDMARK_INPUT_SIZE, LANDMARK_INPUT_SIZE, FilterType::Triangle);

    let size = LANDMARK_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, px) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = f32::from(px.0[c]) / 255.0;
        }
    }
    tensor
}

/// Normalized `[x0, y0, x1, y1, ...]` in crop space → frame pixels.
fn decode_points(raw: &[f32], window: CropWindow) -> Result<LandmarkSet, LandmarkError> {
    let points = raw
        .chunks_exact(2)
        .map(|xy| {
            Point::new(
                (window.x as f32 + xy[0] * window.width as f32).round() as i32,
                (window.y as f32 + xy[1] * window.height as f32).round() as i32,
            )
        })
        .collect();
    LandmarkSet::new(points)
}
