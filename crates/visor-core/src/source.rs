//! Landmark sources — where per-face 68-point landmarks come from.
//!
//! The geometry pipeline only sees [`LandmarkSource`]; any detector and
//! predictor pair can stand behind it.

use crate::detector::{DetectorError, FaceDetector};
use crate::landmarker::{LandmarkPredictor, LandmarkerError};
use crate::types::{DetectedFace, FaceBox, LandmarkSet};
use image::RgbImage;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Model file names expected inside a model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
pub const LANDMARK_MODEL_FILE: &str = "landmarks_68.onnx";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("landmark predictor: {0}")]
    Landmarker(#[from] LandmarkerError),
    #[error("failed to read landmark file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("malformed landmark JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no landmarks recorded for face {0:?}")]
    UnknownFace(FaceBox),
}

/// Face detection plus per-face landmark prediction.
pub trait LandmarkSource {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, SourceError>;

    fn predict_landmarks(&mut self, image: &RgbImage, face: &FaceBox) -> Result<LandmarkSet, SourceError>;

    /// Detect every face and predict its landmarks.
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, SourceError> {
        let boxes = self.detect(image)?;
        tracing::info!(count = boxes.len(), "faces detected");

        let mut faces = Vec::with_capacity(boxes.len());
        for face in boxes {
            let landmarks = self.predict_landmarks(image, &face)?;
            faces.push(DetectedFace { face, landmarks });
        }
        if let Some(first) = faces.first() {
            tracing::debug!(landmarks = first.landmarks.points().len(), "landmarks per face");
        }
        Ok(faces)
    }
}

/// Precomputed detections, usually produced by `visor detect`.
///
/// The JSON document is an array of `{ "face": {x, y, width, height,
/// confidence?}, "landmarks": [{x, y}; 68] }` objects in the coordinates of
/// the processed frame.
pub struct JsonLandmarkSource {
    faces: Vec<DetectedFace>,
}

impl JsonLandmarkSource {
    pub fn from_faces(faces: Vec<DetectedFace>) -> Self {
        Self { faces }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let faces: Vec<DetectedFace> = serde_json::from_reader(reader)?;
        Ok(Self { faces })
    }

    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let source = Self::from_reader(std::io::BufReader::new(file))?;
        tracing::info!(path = %path.display(), faces = source.faces.len(), "loaded landmark file");
        Ok(source)
    }
}

impl LandmarkSource for JsonLandmarkSource {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<FaceBox>, SourceError> {
        Ok(self.faces.iter().map(|f| f.face).collect())
    }

    /// Returns the recorded detections in file order. Faces sharing a box
    /// keep their own landmarks.
    fn detect_faces(&mut self, _image: &RgbImage) -> Result<Vec<DetectedFace>, SourceError> {
        tracing::info!(count = self.faces.len(), "faces loaded from landmark file");
        Ok(self.faces.clone())
    }

    /// First recorded face whose box equals `face`.
    fn predict_landmarks(&mut self, _image: &RgbImage, face: &FaceBox) -> Result<LandmarkSet, SourceError> {
        self.faces
            .iter()
            .find(|f| f.face == *face)
            .map(|f| f.landmarks.clone())
            .ok_or(SourceError::UnknownFace(*face))
    }
}

/// SCRFD face detector plus a 68-point landmark regressor, both on ONNX Runtime.
pub struct OnnxLandmarkSource {
    detector: FaceDetector,
    predictor: LandmarkPredictor,
}

impl OnnxLandmarkSource {
    pub fn load(model_dir: &Path) -> Result<Self, SourceError> {
        let detector = FaceDetector::load(&model_dir.join(DETECTOR_MODEL_FILE))?;
        let predictor = LandmarkPredictor::load(&model_dir.join(LANDMARK_MODEL_FILE))?;
        Ok(Self { detector, predictor })
    }
}

impl LandmarkSource for OnnxLandmarkSource {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, SourceError> {
        Ok(self.detector.detect(image)?)
    }

    fn predict_landmarks(&mut self, image: &RgbImage, face: &FaceBox) -> Result<LandmarkSet, SourceError> {
        Ok(self.predictor.predict(image, face)?)
    }
}
