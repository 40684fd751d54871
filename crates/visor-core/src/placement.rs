//! Placement — where a scaled overlay lands on the base image.

use crate::types::{FacialLandmark, LandmarkSet, Point};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PlacementError {
    #[error("placement {region:?} exceeds the {image_width}x{image_height} image")]
    OutOfBounds {
        region: PlacementRegion,
        image_width: u32,
        image_height: u32,
    },
}

/// What to do with a placement that does not fit inside the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
    /// Blend only the visible part of the overlay.
    #[default]
    Clip,
    /// Fail the run.
    Reject,
}

impl std::str::FromStr for BoundsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clip" => Ok(Self::Clip),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown bounds policy {other:?} (expected clip or reject)")),
        }
    }
}

/// Raw overlay rectangle in base-image coordinates. May extend past any edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRegion {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
}

/// The visible part of a [`PlacementRegion`].
///
/// `x`/`y` address the base image, `offset_x`/`offset_y` address the same
/// area inside the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl PlacementRegion {
    pub fn right(&self) -> i64 {
        self.left + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        self.top + i64::from(self.height)
    }

    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right() <= i64::from(image_width)
            && self.bottom() <= i64::from(image_height)
    }

    /// Intersect with a `image_width` x `image_height` image.
    ///
    /// Returns `None` when no pixel of the region is inside the image.
    pub fn clip(&self, image_width: u32, image_height: u32) -> Option<ClippedRegion> {
        let x0 = self.left.max(0);
        let y0 = self.top.max(0);
        let x1 = self.right().min(i64::from(image_width));
        let y1 = self.bottom().min(i64::from(image_height));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(ClippedRegion {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
            offset_x: (x0 - self.left) as u32,
            offset_y: (y0 - self.top) as u32,
        })
    }

    /// Apply `policy` against the image size.
    ///
    /// `Ok(None)` means the face is clipped away entirely.
    pub fn constrain(
        &self,
        policy: BoundsPolicy,
        image_width: u32,
        image_height: u32,
    ) -> Result<Option<ClippedRegion>, PlacementError> {
        match policy {
            BoundsPolicy::Reject if !self.fits_within(image_width, image_height) => {
                Err(PlacementError::OutOfBounds {
                    region: *self,
                    image_width,
                    image_height,
                })
            }
            _ => Ok(self.clip(image_width, image_height)),
        }
    }
}

/// Point between the eyes: floor midpoint of the two upper nose-bridge landmarks.
pub fn eye_center(landmarks: &LandmarkSet) -> Point {
    let top = landmarks.point(FacialLandmark::NoseBridgeTop);
    let upper = landmarks.point(FacialLandmark::NoseBridgeUpper);
    // Midpoint of two i32 values always fits back into i32.
    let mid = |a: i32, b: i32| (i64::from(a) + i64::from(b)).div_euclid(2) as i32;
    Point::new(mid(top.x, upper.x), mid(top.y, upper.y))
}

/// Center an overlay of `dims` on the eye center of `landmarks`. No clamping.
pub fn resolve_placement(dims: (u32, u32), landmarks: &LandmarkSet) -> PlacementRegion {
    let (width, height) = dims;
    let anchor = eye_center(landmarks);
    PlacementRegion {
        left: i64::from(anchor.x) - i64::from(width / 2),
        top: i64::from(anchor.y) - i64::from(height / 2),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::face_landmarks;

    fn sample_face() -> LandmarkSet {
        face_landmarks(
            Point::new(100, 200),
            Point::new(200, 200),
            (Point::new(140, 230), Point::new(160, 230)),
        )
    }

    fn region(left: i64, top: i64, width: u32, height: u32) -> PlacementRegion {
        PlacementRegion { left, top, width, height }
    }

    #[test]
    fn test_eye_center_midpoint() {
        assert_eq!(eye_center(&sample_face()), Point::new(150, 230));
    }

    #[test]
    fn test_eye_center_extreme_coordinates() {
        let high = face_landmarks(
            Point::new(0, 0),
            Point::new(10, 0),
            (Point::new(i32::MAX, i32::MAX), Point::new(i32::MAX, i32::MAX)),
        );
        assert_eq!(eye_center(&high), Point::new(i32::MAX, i32::MAX));

        let spread = face_landmarks(
            Point::new(0, 0),
            Point::new(10, 0),
            (Point::new(i32::MIN, i32::MAX), Point::new(i32::MIN, i32::MIN)),
        );
        assert_eq!(eye_center(&spread), Point::new(i32::MIN, -1));

        let region = resolve_placement((200, 100), &high);
        assert_eq!(region.left, i64::from(i32::MAX) - 100);
        assert_eq!(region.bottom(), i64::from(i32::MAX) + 50);
        assert!(region.clip(100, 100).is_none());
    }

    #[test]
    fn test_eye_center_floors_negative_odd_sums() {
        let face = face_landmarks(
            Point::new(0, 0),
            Point::new(10, 0),
            (Point::new(-3, -1), Point::new(0, 0)),
        );
        // floor(-3 / 2) = -2, floor(-1 / 2) = -1
        assert_eq!(eye_center(&face), Point::new(-2, -1));
    }

    #[test]
    fn test_resolve_placement_centers_on_eyes() {
        let placed = resolve_placement((110, 44), &sample_face());
        assert_eq!(placed, region(95, 208, 110, 44));
    }

    #[test]
    fn test_resolve_placement_odd_dims_use_integer_halves() {
        let placed = resolve_placement((11, 5), &sample_face());
        assert_eq!(placed, region(145, 228, 11, 5));
    }

    #[test]
    fn test_translation_equivariance() {
        let base = sample_face();
        let origin = resolve_placement((110, 44), &base);
        for (dx, dy) in [(1, 0), (0, 1), (-37, 12), (250, -300), (-1, -1)] {
            let moved = resolve_placement((110, 44), &base.translated(dx, dy));
            assert_eq!(moved.left, origin.left + i64::from(dx));
            assert_eq!(moved.top, origin.top + i64::from(dy));
            assert_eq!((moved.width, moved.height), (110, 44));
        }
    }

    #[test]
    fn test_clip_inside_is_identity() {
        let clipped = region(10, 20, 30, 40).clip(100, 100).unwrap();
        assert_eq!(
            clipped,
            ClippedRegion { x: 10, y: 20, width: 30, height: 40, offset_x: 0, offset_y: 0 }
        );
    }

    #[test]
    fn test_clip_top_left_edge() {
        let clipped = region(-5, -8, 20, 20).clip(100, 100).unwrap();
        assert_eq!(
            clipped,
            ClippedRegion { x: 0, y: 0, width: 15, height: 12, offset_x: 5, offset_y: 8 }
        );
    }

    #[test]
    fn test_clip_bottom_right_edge() {
        let clipped = region(90, 95, 20, 20).clip(100, 100).unwrap();
        assert_eq!(
            clipped,
            ClippedRegion { x: 90, y: 95, width: 10, height: 5, offset_x: 0, offset_y: 0 }
        );
    }

    #[test]
    fn test_clip_fully_outside() {
        assert!(region(100, 0, 10, 10).clip(100, 100).is_none());
        assert!(region(-10, 0, 10, 10).clip(100, 100).is_none());
        assert!(region(0, -50, 10, 10).clip(100, 100).is_none());
    }

    #[test]
    fn test_constrain_policies() {
        let spill = region(-1, 0, 10, 10);
        assert!(spill.constrain(BoundsPolicy::Clip, 100, 100).unwrap().is_some());
        assert!(matches!(
            spill.constrain(BoundsPolicy::Reject, 100, 100),
            Err(PlacementError::OutOfBounds { image_width: 100, .. })
        ));

        let inside = region(0, 0, 100, 100);
        assert!(inside.constrain(BoundsPolicy::Reject, 100, 100).unwrap().is_some());
    }

    #[test]
    fn test_bounds_policy_from_str() {
        assert_eq!("clip".parse::<BoundsPolicy>(), Ok(BoundsPolicy::Clip));
        assert_eq!("REJECT".parse::<BoundsPolicy>(), Ok(BoundsPolicy::Reject));
        assert!("pad".parse::<BoundsPolicy>().is_err());
    }
}
