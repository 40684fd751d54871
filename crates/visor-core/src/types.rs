use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of points in the 68-point facial landmark convention.
pub const LANDMARK_COUNT: usize = 68;

#[derive(Error, Debug, PartialEq)]
pub enum LandmarkError {
    #[error("expected {LANDMARK_COUNT} landmarks, got {0}")]
    WrongPointCount(usize),
}

#[derive(Error, Debug, PartialEq)]
pub enum OpacityError {
    #[error("opacity must be within [0, 1], got {0}")]
    OutOfRange(f32),
}

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Named positions in the 68-point facial landmark convention.
///
/// Only the indices the scaler and the placement resolver read are named.
/// Swapping in a detector with a different convention means remapping
/// these, not touching the scaler or resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum FacialLandmark {
    /// Leftmost jaw point in image space; left end of the face width.
    JawStart = 0,
    /// Rightmost jaw point in image space; right end of the face width.
    JawEnd = 16,
    /// Top of the nose bridge, between the eyes.
    NoseBridgeTop = 27,
    NoseBridgeUpper = 28,
}

/// Ordered 68-point landmark set for one face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Result<Self, LandmarkError> {
        if points.len() != LANDMARK_COUNT {
            return Err(LandmarkError::WrongPointCount(points.len()));
        }
        Ok(Self { points })
    }

    pub fn point(&self, landmark: FacialLandmark) -> Point {
        self.points[landmark as usize]
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Copy of this set moved by `(dx, dy)`.
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
        }
    }
}

impl TryFrom<Vec<Point>> for LandmarkSet {
    type Error = LandmarkError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<Point> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

/// Face rectangle reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// One detected face with its landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub face: FaceBox,
    pub landmarks: LandmarkSet,
}

/// Global blend strength in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Opacity(f32);

impl Opacity {
    pub const OPAQUE: Opacity = Opacity(1.0);
    pub const TRANSPARENT: Opacity = Opacity(0.0);

    pub fn new(value: f32) -> Result<Self, OpacityError> {
        if !(0.0..=1.0).contains(&value) {
            // NaN fails the range check too
            return Err(OpacityError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Opacity {
    type Error = OpacityError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
